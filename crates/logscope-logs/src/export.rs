use std::fmt::Write;

use logscope_types::LogRecord;

/// Header row for [`to_csv`] output
const HEADER: &str =
    "ID,Timestamp,Level,Channel,Event ID,Provider,Message,Alert,Trigger,Classification";

/// Serialize a record set to CSV
///
/// Pure string building; writing the result anywhere is the caller's
/// concern. The message column joins all lines with a single space, doubles
/// any embedded quotes, and is always quoted. Timestamps are RFC 3339.
pub fn to_csv(records: &[LogRecord]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + records.len() * 128);
    out.push_str(HEADER);
    out.push('\n');

    for record in records {
        let message = record.message.join(" ").replace('"', "\"\"");
        let classification = record
            .classification
            .map(|c| c.as_str())
            .unwrap_or("Unclassified");

        let _ = writeln!(
            out,
            "{},{},{},{},{},{},\"{}\",{},{},{}",
            record.id,
            record.timestamp.to_rfc3339(),
            record.level,
            record.channel,
            record.event_id,
            record.provider,
            message,
            yes_no(record.alert),
            yes_no(record.trigger),
            classification,
        );
    }

    out
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use logscope_types::{Classification, LogLevel};

    fn record(id: &str) -> LogRecord {
        LogRecord {
            id: id.to_string(),
            record_id: 7,
            agent_id: "agent-1".to_string(),
            event_id: 4625,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            channel: "Security".to_string(),
            provider: "TestProvider".to_string(),
            event_host: "HOST-A".to_string(),
            user_sid: None,
            level: LogLevel::Error,
            message: vec!["logon failed".to_string()],
            alert: true,
            trigger: false,
            classification: Some(Classification::Suspicious),
        }
    }

    /// Count commas that sit outside quoted fields
    fn column_count(line: &str) -> usize {
        let mut in_quotes = false;
        let mut commas = 0;
        for c in line.chars() {
            match c {
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => commas += 1,
                _ => {}
            }
        }
        commas + 1
    }

    #[test]
    fn test_header_and_row_shape() {
        let csv = to_csv(&[record("a")]);
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "ID,Timestamp,Level,Channel,Event ID,Provider,Message,Alert,Trigger,Classification"
        );

        let row = lines.next().unwrap();
        assert_eq!(column_count(row), column_count(header));
        assert!(row.starts_with("a,2024-06-01T12:00:00+00:00,Error,Security,4625,"));
        assert!(row.ends_with(",Yes,No,suspicious"));
        assert!(lines.next().is_none());
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_message_quoting_doubles_embedded_quotes() {
        let mut r = record("a");
        r.message = vec![
            "user \"admin\" rejected".to_string(),
            "try again, later".to_string(),
        ];
        let csv = to_csv(&[r]);
        let row = csv.lines().nth(1).unwrap();

        assert!(row.contains("\"user \"\"admin\"\" rejected try again, later\""));
        // The embedded comma must not create an extra column
        assert_eq!(column_count(row), 10);
    }

    #[test]
    fn test_unclassified_and_flag_rendering() {
        let mut r = record("a");
        r.classification = None;
        r.alert = false;
        r.trigger = true;
        let csv = to_csv(&[r]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",No,Yes,Unclassified"));
    }

    #[test]
    fn test_empty_set_is_header_only() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_one_row_per_record() {
        let records: Vec<LogRecord> = (0..4).map(|i| record(&format!("r-{i}"))).collect();
        let csv = to_csv(&records);
        assert_eq!(csv.lines().count(), 5);
    }
}
