//! Text rendering for status, report and reload replies.

use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::engine::{analytics::Stats, reload::ReloadReport};

/// Maximum characters of recent log text quoted in a status reply.
const STATUS_LOG_CHARS: usize = 1000;

/// A rendered report meant to be attached as a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub title: String,
    pub filename: String,
    /// Markdown body.
    pub body: String,
    /// One-paragraph summary posted next to the document.
    pub summary: String,
}

/// One-line counter summary, e.g. `✅ OK: 3 / ❌ ERR: 2 / ⚠️ WARN: 1`.
pub fn counter_line(stats: &Stats) -> String {
    let totals = stats.totals();
    format!("✅ OK: {} / ❌ ERR: {} / ⚠️ WARN: {}", totals.ok, totals.err, totals.warn)
}

/// Status reply: window counters plus the most recent activity lines.
pub fn status_message(stats: &Stats, recent: &[String]) -> String {
    let totals = stats.totals();

    let mut log_text = if recent.is_empty() { "No log entries.".to_string() } else { recent.join("\n") };
    if log_text.chars().count() > STATUS_LOG_CHARS {
        log_text = log_text.chars().take(STATUS_LOG_CHARS).collect();
    }

    let mut out = String::new();
    let _ = writeln!(out, "*📊 Bot Status Report*");
    let _ = writeln!(out, "*Status:* 🟢 Online");
    let _ = writeln!(out, "*Log statistics ({} to {}):* {}", stats.from, stats.to, counter_line(stats));
    let _ = writeln!(out, "*Requests:* {} / *Responses:* {}", totals.requests, totals.responses);
    let _ = writeln!(out, "*Last {} log lines:*", recent.len());
    let _ = write!(out, "```\n{log_text}\n```");

    out
}

/// Detailed report over the whole window.
pub fn detailed_report(stats: &Stats, variation_count: usize, generated_at: NaiveDateTime) -> ReportDocument {
    let totals = stats.totals();
    let ranked = stats.ranked_triggers();

    let mut body = String::new();
    let _ = writeln!(body, "# Activity report: {} to {}", stats.from, stats.to);
    let _ = writeln!(body);
    let _ = writeln!(body, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(body, "Window: {} days", stats.window_days());
    let _ = writeln!(body, "Response variations: {variation_count}");
    let _ = writeln!(body, "Totals: {}", counter_line(stats));
    let _ = writeln!(body, "Requests: {} / Responses: {}", totals.requests, totals.responses);
    let _ = writeln!(body);

    let _ = writeln!(body, "## Trigger ranking");
    let _ = writeln!(body);
    if ranked.is_empty() {
        let _ = writeln!(body, "No triggers matched in this window.");
    }
    for (rank, (trigger, count)) in ranked.iter().enumerate() {
        let _ = writeln!(body, "{}. `{}`: {}", rank + 1, trigger, count);
    }
    let _ = writeln!(body);

    let _ = writeln!(body, "## Daily activity");
    let _ = writeln!(body);
    let _ = write!(body, "| Date | OK | ERR | WARN | Requests | Responses |\n|---|---|---|---|---|---|");
    for (date, counts) in stats.daily_table() {
        let _ = write!(
            body,
            "\n| {} | {} | {} | {} | {} | {} |",
            date, counts.ok, counts.err, counts.warn, counts.requests, counts.responses
        );
    }
    body.push('\n');

    let top = match ranked.first() {
        Some((trigger, count)) => format!("top trigger `{trigger}` ({count})"),
        None => "no matches".to_string(),
    };

    ReportDocument {
        title: format!("Activity report ({} days)", stats.window_days()),
        filename: format!("activity-report-{}.md", stats.to),
        summary: format!(
            "*📈 Detailed report, {} to {}:* {} / {} responses, {} requests, {} distinct triggers, {}. {} response variations loaded.",
            stats.from,
            stats.to,
            counter_line(stats),
            totals.responses,
            totals.requests,
            ranked.len(),
            top,
            variation_count
        ),
        body,
    }
}

/// Reload reply, one line per half.
pub fn reload_message(report: &ReloadReport) -> String {
    let config = match &report.config {
        Ok(()) => "✅ config reloaded".to_string(),
        Err(err) => format!("❌ config kept: {}", err.user_message()),
    };

    let responses = match &report.responses {
        Ok(count) => format!("✅ {count} triggers reloaded"),
        Err(err) => format!("❌ responses kept: {}", err.user_message()),
    };

    let title = if report.is_complete() { "🔄 *System Reloaded*" } else { "⚠️ *Reload partially failed*" };

    format!("{title}\n{config}\n{responses}")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{base::error::EngineError, engine::analytics::aggregate};

    fn stats() -> Stats {
        let lines = [
            "2024-05-12 11:00:00,000 [INFO] Match: 'hello' by Ann (U1)",
            "2024-05-12 11:00:01,000 [ERROR] boom",
        ];
        aggregate(lines, NaiveDate::from_ymd_opt(2024, 5, 11).unwrap(), NaiveDate::from_ymd_opt(2024, 5, 12).unwrap())
    }

    #[test]
    fn status_quotes_recent_lines() {
        let message = status_message(&stats(), &["line a".to_string(), "line b".to_string()]);
        assert!(message.contains("✅ OK: 1 / ❌ ERR: 1 / ⚠️ WARN: 0"));
        assert!(message.contains("line a\nline b"));
    }

    #[test]
    fn status_without_lines_says_so() {
        let message = status_message(&stats(), &[]);
        assert!(message.contains("No log entries."));
    }

    #[test]
    fn status_truncates_long_logs() {
        let long = vec!["x".repeat(5000)];
        let message = status_message(&stats(), &long);
        assert!(message.len() < 1500);
    }

    #[test]
    fn detailed_report_lists_triggers_and_days() {
        let generated_at = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let report = detailed_report(&stats(), 4, generated_at);

        assert_eq!(report.filename, "activity-report-2024-05-12.md");
        assert!(report.body.contains("1. `hello`: 1"));
        assert!(report.body.contains("| 2024-05-11 | 0 | 0 | 0 | 0 | 0 |"));
        assert!(report.body.contains("| 2024-05-12 | 1 | 1 | 0 | 0 | 1 |"));
        assert!(report.summary.contains("top trigger `hello` (1)"));
        assert!(report.summary.contains("4 response variations"));
    }

    #[test]
    fn reload_message_reports_each_half() {
        let report = ReloadReport {
            config: Err(EngineError::SourceNotFound("config.json".into())),
            responses: Ok(12),
        };

        let message = reload_message(&report);
        assert!(message.starts_with("⚠️"));
        assert!(message.contains("❌ config kept: `config.json` was not found"));
        assert!(message.contains("✅ 12 triggers reloaded"));
    }
}
