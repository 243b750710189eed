//! Terminal rendering of RPC results

use colored::{ColoredString, Colorize};
use serde_json::Value;
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub struct CheckLine {
    check: String,
    status: String,
    severity: String,
    updated: String,
}

#[derive(Tabled)]
pub struct BulkLine {
    id: String,
    imo: String,
    status: String,
    screening: String,
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Epoch ms as UTC, `-` when absent
pub fn timestamp(value: &Value) -> String {
    value
        .as_i64()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn severity(value: &Value) -> ColoredString {
    let label = text(value);
    match label.as_str() {
        "OK" => label.green(),
        "WARNING" => label.yellow(),
        "CRITICAL" => label.red().bold(),
        "UNKNOWN" => label.magenta(),
        _ => label.normal(),
    }
}

pub fn check_lines(screening: &Value) -> Vec<CheckLine> {
    screening["checks"]
        .as_object()
        .map(|checks| {
            checks
                .iter()
                .map(|(kind, state)| CheckLine {
                    check: kind.clone(),
                    status: text(&state["status"]),
                    severity: text(&state["severity"]),
                    updated: timestamp(&state["updated_at"]),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn print_screening(screening: &Value) {
    println!("{} {}", "Screening".cyan().bold(), text(&screening["id"]));
    println!("  {} {}", "Account:".bold(), text(&screening["account_id"]));
    println!("  {} {}", "IMO:".bold(), text(&screening["imo"]));
    println!("  {} {}", "Status:".bold(), text(&screening["status"]));
    println!(
        "  {} {} (previous {}, {})",
        "Severity:".bold(),
        severity(&screening["severity"]),
        text(&screening["previous_severity"]),
        text(&screening["severity_change"]),
    );
    println!("  {} {}", "Scheduled:".bold(), timestamp(&screening["scheduled_at"]));
    println!("  {} {}", "Completed:".bold(), timestamp(&screening["completed_at"]));
    println!();
    println!("{}", Table::new(check_lines(screening)));
}

pub fn print_history(history: &Value) {
    let entries = history["entries"].as_array().cloned().unwrap_or_default();
    if entries.is_empty() {
        println!("{}", "No history yet".yellow());
        return;
    }
    for entry in entries {
        println!(
            "{} {} {}",
            timestamp(&entry["completed_at"]).bold(),
            severity(&entry["severity"]),
            text(&entry["severity_change"]),
        );
    }
}

pub fn bulk_line(row: &Value) -> BulkLine {
    BulkLine {
        id: text(&row["id"]),
        imo: text(&row["imo"]),
        status: text(&row["status"]),
        screening: text(&row["screening_id"]),
    }
}

pub fn print_bulk(rows: &[Value]) {
    println!("{}", Table::new(rows.iter().map(bulk_line)));
}

pub fn megabytes(value: &Value) -> f64 {
    value.as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_lines() {
        let screening = json!({
            "checks": {
                "SHIP_FLAG": {"status": "DONE", "severity": "WARNING", "result": null, "updated_at": 0},
                "ZONE_VISITS": {"status": "SCHEDULED", "severity": null, "result": null, "updated_at": 0}
            }
        });
        let lines = check_lines(&screening);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].check, "SHIP_FLAG");
        assert_eq!(lines[0].severity, "WARNING");
        assert_eq!(lines[1].severity, "-");
        assert_eq!(lines[1].updated, "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_timestamp_absent() {
        assert_eq!(timestamp(&Value::Null), "-");
    }

    #[test]
    fn test_bulk_line_without_screening() {
        let line = bulk_line(&json!({"id": "b-1", "imo": "123", "status": "INVALID_IMO", "screening_id": null}));
        assert_eq!(line.status, "INVALID_IMO");
        assert_eq!(line.screening, "-");
    }
}
