// Output formatting for CLI

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    /// Serialize a value for files and structured output
    ///
    /// Text has no structured form of its own and falls back to pretty JSON.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Yaml => serde_yaml::to_string(value).context("failed to encode YAML"),
            OutputFormat::Json | OutputFormat::Text => {
                serde_json::to_string_pretty(value).context("failed to encode JSON")
            }
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Print a simple key-value pair for text output
pub fn print_field(label: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", label), value);
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header);
}

/// Print a table row, truncating cells wider than their column
pub fn print_table_row(values: &[(&str, usize)]) {
    let row: String = values
        .iter()
        .map(|(val, width)| format!("{:<width$}", truncate(val, *width), width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row);
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut cut: String = value.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_str_defaults_to_text() {
        assert_eq!(OutputFormat::from_str("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("yaml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str("table"), OutputFormat::Text);
    }

    #[test]
    fn test_text_renders_as_json() {
        let value = json!({ "final_state": { "ticket": {} } });
        let text = OutputFormat::Text.render(&value).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), value);
    }

    #[test]
    fn test_yaml_render() {
        let rendered = OutputFormat::Yaml.render(&json!({ "owner": "ops" })).unwrap();
        assert_eq!(rendered.trim(), "owner: ops");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("escalation_decision", 10), "escalat...");
    }
}
