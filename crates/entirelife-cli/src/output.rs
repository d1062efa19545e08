use entirelife_core::domain::Entry;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// One-line rendering of an entry: `date  emoji title  [created]`
pub fn entry_line(entry: &Entry) -> String {
    let emoji = entry
        .emoji
        .as_deref()
        .map(|e| format!("{e} "))
        .unwrap_or_default();
    format!(
        "{}  {}{}  [{}]",
        entry.date.format("%Y-%m-%d"),
        emoji,
        entry.title,
        entry.created
    )
}

#[cfg(test)]
mod tests {
    use entirelife_core::domain::EntryContent;

    use super::*;

    #[test]
    fn test_entry_line() {
        let date = EntryContent::parse_date("1990-01-01").unwrap();
        let entry = Entry::welcome(date, 42);
        assert_eq!(entry_line(&entry), "1990-01-01  \u{1f423} Hello World!  [42]");

        let plain = Entry::from_content(EntryContent::new(date, "Born"), 7, 7);
        assert_eq!(entry_line(&plain), "1990-01-01  Born  [7]");
    }

    #[test]
    fn test_format_from_flag() {
        assert!(OutputFormat::from_flag(true).is_json());
        assert!(!OutputFormat::from_flag(false).is_json());
    }
}
