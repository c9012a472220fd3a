//! Output formatting for dealercall (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use dealercall_core::{phone, CallRecord, CallState};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No calls");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => print!("{}", to_csv(data)),
        }
    }

    /// Print a single item in the configured format
    pub fn print_one<T: Tabled + Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Table => println!("{}", Table::new([data])),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => print!("{}", to_csv(&[data])),
        }
    }

    /// Print key-value pairs (for status and call details)
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone().into()))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => {
                let keys: Vec<String> = pairs.iter().map(|(k, _)| escape_csv(k)).collect();
                let values: Vec<String> = pairs.iter().map(|(_, v)| escape_csv(v)).collect();
                println!("{}", keys.join(","));
                println!("{}", values.join(","));
            }
        }
    }
}

/// Render rows as CSV, header first; columns follow the first row's fields
fn to_csv<T: Serialize>(data: &[T]) -> String {
    let Some(first) = data.first() else {
        return String::new();
    };
    let serde_json::Value::Object(first) = serde_json::to_value(first).unwrap_or_default() else {
        return String::new();
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut out = headers.join(",");
    out.push('\n');

    for item in data {
        if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
            let values: Vec<String> = headers
                .iter()
                .map(|h| match row.get(*h) {
                    Some(serde_json::Value::String(s)) => escape_csv(s),
                    Some(serde_json::Value::Null) | None => String::new(),
                    Some(other) => escape_csv(&other.to_string()),
                })
                .collect();
            out.push_str(&values.join(","));
            out.push('\n');
        }
    }
    out
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Status with a color matching its lifecycle stage
pub fn colored_state(state: CallState) -> String {
    let text = state.to_string();
    match state {
        CallState::Completed => text.green().to_string(),
        CallState::Failed => text.red().to_string(),
        CallState::Cancelled => text.yellow().to_string(),
        _ => text.cyan().to_string(),
    }
}

// =============================================================================
// Display types
// =============================================================================

/// One call, for call/get/history
#[derive(Debug, Tabled, Serialize)]
pub struct CallRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Phone")]
    pub phone: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "Started")]
    pub started: String,
    #[tabled(rename = "Ended Reason")]
    pub ended_reason: String,
}

impl From<&CallRecord> for CallRow {
    fn from(record: &CallRecord) -> Self {
        Self {
            id: record.id.clone(),
            status: record.status.to_string(),
            phone: record
                .phone_number
                .as_deref()
                .map(phone::format)
                .unwrap_or_else(|| "-".to_string()),
            duration: record
                .duration_seconds
                .map(format_duration)
                .unwrap_or_else(|| "-".to_string()),
            cost: record
                .cost_usd
                .map(|c| format!("${:.2}", c))
                .unwrap_or_else(|| "-".to_string()),
            started: record
                .started_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            ended_reason: record.ended_reason.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// `95.5` -> `1m 36s`
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    if total >= 60 {
        format!("{}m {:02}s", total / 60, total % 60)
    } else {
        format!("{}s", total)
    }
}
