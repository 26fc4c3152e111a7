//! Sequential pipeline driver.
//!
//! The topology is static — five stages in a line with an error shortcut —
//! so the driver is a plain finite-state machine: an enum of stages, a
//! transition function keyed on the routing predicate, and a loop.

use tracing::info;

use crate::models::Report;
use crate::pipeline::stages::{DigestPipeline, build_error_report};
use crate::pipeline::state::PipelineState;

/// The pipeline's execution states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Analyze,
    Classify,
    Summarize,
    Report,
    ErrorTerminal,
    Done,
}

impl Stage {
    /// Transition to the next stage after this one has produced `state`.
    ///
    /// The routing predicate is checked after collect, analyze, classify,
    /// and summarize. The reporter is terminal on success; if it failed to
    /// set a report it hands over to the error terminal so the run still
    /// ends with a well-formed result.
    pub fn next(self, state: &PipelineState) -> Stage {
        match self {
            Stage::Collect if state.has_errors() => Stage::ErrorTerminal,
            Stage::Collect => Stage::Analyze,
            Stage::Analyze if state.has_errors() => Stage::ErrorTerminal,
            Stage::Analyze => Stage::Classify,
            Stage::Classify if state.has_errors() => Stage::ErrorTerminal,
            Stage::Classify => Stage::Summarize,
            Stage::Summarize if state.has_errors() => Stage::ErrorTerminal,
            Stage::Summarize => Stage::Report,
            Stage::Report if state.report.is_none() => Stage::ErrorTerminal,
            Stage::Report => Stage::Done,
            Stage::ErrorTerminal => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }
}

impl DigestPipeline {
    /// Run the full pipeline over `channels` and return the digest.
    ///
    /// Never fails at the signature level: the result is either a genuine
    /// digest or the error terminal's degraded report. Each invocation
    /// owns a fresh state, so concurrent runs are independent.
    pub async fn run(&self, channels: Vec<String>, limit_per_channel: usize) -> Report {
        info!(channels = channels.len(), "Starting digest pipeline");

        let mut state = PipelineState::new(channels, limit_per_channel);
        let mut stage = Stage::Collect;

        loop {
            state = match stage {
                Stage::Collect => self.collect(state).await,
                Stage::Analyze => self.analyze(state).await,
                Stage::Classify => self.classify(state).await,
                Stage::Summarize => self.summarize(state).await,
                Stage::Report => self.report(state).await,
                Stage::ErrorTerminal => self.error_report(state),
                Stage::Done => break,
            };
            stage = stage.next(&state);
        }

        info!(errors = state.errors.len(), "Digest pipeline finished");

        match state.report.take() {
            Some(report) => report,
            // Unreachable with the transitions above, but the contract is
            // a Report no matter what.
            None => build_error_report(&state.errors),
        }
    }
}
