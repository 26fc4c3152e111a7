//! Markdown rendering of a report for Telegram delivery.

use crate::models::Report;

/// Render a report as a Telegram Markdown message.
pub fn format_report(report: &Report) -> String {
    let mut text = String::with_capacity(1024);

    text.push_str(&format!("📊 *{}*\n\n", report.title));
    text.push_str(&format!(
        "📅 Date: {}\n\n",
        report.date.format("%d.%m.%Y %H:%M")
    ));
    text.push_str(&format!("📝 *Overall summary:*\n{}\n\n", report.overall_summary));

    if !report.categories.is_empty() {
        text.push_str("📌 *Category summaries:*\n\n");
        for section in &report.categories {
            text.push_str(&format!(
                "*{}* ({} posts):\n{}\n\n",
                section.category, section.news_count, section.summary
            ));
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ReportSection};
    use chrono::Utc;

    fn sample_report() -> Report {
        Report {
            id: "r-1".into(),
            title: "News digest".into(),
            date: Utc::now(),
            period: "day".into(),
            categories: vec![ReportSection {
                category: Category::Technology,
                summary: "Two releases shipped.".into(),
                news_count: 2,
                items: vec![],
            }],
            overall_summary: "A busy day in tech.".into(),
        }
    }

    #[test]
    fn format_includes_title_and_sections() {
        let text = format_report(&sample_report());
        assert!(text.contains("*News digest*"));
        assert!(text.contains("A busy day in tech."));
        assert!(text.contains("*Technology* (2 posts):"));
        assert!(text.contains("Two releases shipped."));
    }

    #[test]
    fn format_omits_section_header_when_empty() {
        let mut report = sample_report();
        report.categories.clear();
        let text = format_report(&report);
        assert!(!text.contains("Category summaries"));
        assert!(text.contains("Overall summary"));
    }
}
