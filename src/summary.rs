use std::fmt::Write;

use crate::types::Report;
use crate::utils::{NumberFormatOptions, format_date_for_display, format_minutes, format_number};

const LABEL_WIDTH: usize = 28;

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_WIDTH {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(LABEL_WIDTH - 1).collect();
        short.push('…');
        short
    }
}

/// Render a folded report as a plain-text table.
pub fn render_summary(report: &Report, options: &NumberFormatOptions) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(
        out,
        "Messages: {} total ({} sent, {} received)",
        format_number(summary.totals.total, options),
        format_number(summary.totals.sent, options),
        format_number(summary.totals.received, options),
    );
    let _ = writeln!(
        out,
        "Left on read: you {} / them {}",
        format_number(summary.left_on_read.you_left_them, options),
        format_number(summary.left_on_read.they_left_you, options),
    );
    let _ = writeln!(
        out,
        "Reply time (avg min): you {} / them {}",
        format_minutes(summary.response_times.you_reply.avg_minutes, options),
        format_minutes(summary.response_times.they_reply.avg_minutes, options),
    );
    if let Some(generated_at) = report.generated_at.as_deref() {
        let _ = writeln!(out, "Generated: {}", format_date_for_display(Some(generated_at)));
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "{:<width$}  {:>10}  {:>10}  {:>10}  {:>9}  {:>12}  {:>6}",
        "Chat",
        "Total",
        "Sent",
        "Received",
        "You reply",
        "Last message",
        "Merged",
        width = LABEL_WIDTH,
    );
    for chat in &report.chats {
        let merged = if chat.merged_from.is_empty() {
            "-".to_string()
        } else {
            chat.merged_from.len().to_string()
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:>10}  {:>10}  {:>10}  {:>9}  {:>12}  {:>6}",
            truncate_label(&chat.label),
            format_number(chat.totals.total, options),
            format_number(chat.totals.sent, options),
            format_number(chat.totals.received, options),
            format_minutes(chat.response_times.you_reply.avg_minutes, options),
            format_date_for_display(chat.last_message_date.as_deref()),
            merged,
            width = LABEL_WIDTH,
        );
    }

    if report.chats.is_empty() {
        out.push_str("No chats in report.\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatStats, Summary, Totals};

    fn options() -> NumberFormatOptions {
        NumberFormatOptions {
            use_comma: true,
            use_human: false,
            locale: "en".to_string(),
            decimal_places: 1,
        }
    }

    #[test]
    fn renders_summary_and_rows() {
        let report = Report {
            summary: Summary {
                totals: Totals {
                    sent: 1200,
                    received: 34,
                    total: 1234,
                },
                ..Default::default()
            },
            chats: vec![ChatStats {
                chat_id: -42,
                label: "A very long contact label that will not fit".into(),
                totals: Totals {
                    sent: 1200,
                    received: 34,
                    total: 1234,
                },
                last_message_date: Some("2024-03-05".into()),
                merged_from: vec![1, 2],
                ..Default::default()
            }],
            generated_at: Some("2024-03-06T10:00:00Z".into()),
            filters: None,
        };

        let text = render_summary(&report, &options());
        assert!(text.contains("Messages: 1,234 total (1,200 sent, 34 received)"));
        assert!(text.contains("Generated: 3/6/2024"));
        assert!(text.contains("3/5/2024"));
        assert!(text.contains('…'));
        assert!(!text.contains("No chats in report."));
        assert!(text.contains("you - / them -"));
    }

    #[test]
    fn empty_report_says_so() {
        let text = render_summary(&Report::default(), &options());
        assert!(text.contains("No chats in report."));
        assert!(text.contains("Messages: 0 total"));
    }
}
