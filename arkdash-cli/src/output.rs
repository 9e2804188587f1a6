///! Output formatting for CLI
///!
///! Every command prints through these helpers so table, JSON and YAML
///! output look the same everywhere.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Table,
        }
    }
}

/// Print rows as a table, or the raw documents as JSON or YAML
pub fn print_output<T: Tabled, D: Serialize>(rows: Vec<T>, raw: &D, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Json => print_json(raw)?,
        OutputFormat::Yaml => print_yaml(raw)?,
    }
    Ok(())
}

/// Print a single document; tables fall back to pretty JSON
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => print_json(data)?,
        OutputFormat::Yaml => print_yaml(data)?,
    }
    Ok(())
}

pub fn print_table<T: Tabled>(data: Vec<T>) {
    if data.is_empty() {
        println!("{}", "No resources found".yellow());
        return;
    }

    let table = Table::new(data);
    println!("{}", table);
}

pub fn print_json<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{}", json);
    Ok(())
}

pub fn print_yaml<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    println!("{}", yaml);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_deleted(kind: &str, name: &str) {
    println!("{} {} '{}' deleted", "✓".green().bold(), kind.green(), name.green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Colour a phase or status string by how healthy it reads
pub fn colorize_status(status: &str) -> String {
    match status {
        "Running" | "Active" | "Ready" | "Succeeded" | "Bound" => status.green().to_string(),
        "Pending" | "Terminating" | "Unknown" => status.yellow().to_string(),
        "Failed" | "NotReady" | "Error" | "CrashLoopBackOff" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Age of an object in the largest whole unit, as listed by the console
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "-".to_string();
    };
    let secs = (now - created).num_seconds().max(0);

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::parse("wide"), OutputFormat::Table);
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(None, now), "-");
        assert_eq!(format_age(Some(now - Duration::seconds(42)), now), "42s");
        assert_eq!(format_age(Some(now - Duration::minutes(5)), now), "5m");
        assert_eq!(format_age(Some(now - Duration::hours(3)), now), "3h");
        assert_eq!(format_age(Some(now - Duration::days(12)), now), "12d");
        assert_eq!(format_age(Some(now + Duration::seconds(30)), now), "0s");
    }
}
