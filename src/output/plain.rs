//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::pipeline::{RunSummary, StatusEvent};
use crate::types::NOT_AVAILABLE;
use console::{style, Style};
use std::io::{self, Write};

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────────────────────";

/// Print a run header before scanning begins.
pub fn print_run_header(domains: usize, ports: &[u16], report: &str) {
    let ports = if ports.is_empty() {
        "all (0-65535)".to_string()
    } else {
        ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("domscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Domains: {}",
        style("•").dim(),
        style(domains).white().bold()
    );
    println!("{} Ports: {}", style("•").dim(), style(ports).yellow());
    println!("{} Report: {}", style("•").dim(), report);
    println!();
}

/// Print the records of a finished run as a table.
pub fn print_records(summary: &RunSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("domscan").cyan().bold()
    )?;
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(out)?;
    writeln!(
        out,
        "  {} {}",
        style("Run ID:").bold(),
        style(summary.run_id.short()).dim()
    )?;
    writeln!(
        out,
        "  {} {}",
        style("Records:").bold(),
        summary.records.len()
    )?;
    writeln!(out)?;

    if summary.records.is_empty() {
        writeln!(out, "  {}", style("No domains to display.").dim())?;
    } else {
        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;
        writeln!(
            out,
            "  {:<28}  {:<15}  {:<12}  {}",
            style("DOMAIN").bold(),
            style("IP").bold(),
            style("OPEN PORTS").bold(),
            style("HTTP").bold()
        )?;
        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;

        for record in &summary.records {
            let open = record.port_status.open_ports();
            let open = if record.port_status.is_empty() {
                NOT_AVAILABLE.to_string()
            } else if open.is_empty() {
                "none".to_string()
            } else {
                open.iter().map(u16::to_string).collect::<Vec<_>>().join(",")
            };

            let http = &record.http_result;
            let http_style = match http.status_code {
                Some(code) if code < 400 => Style::new().green(),
                Some(_) => Style::new().yellow(),
                None => Style::new().red(),
            };

            writeln!(
                out,
                "  {:<28}  {:<15}  {:<12}  {}",
                truncate_string(record.domain.as_str(), 28),
                record.ip_label(),
                open,
                http_style.apply_to(format!("{} {}", http.code_label(), http.description))
            )?;
        }

        writeln!(out, "  {}", style(LIGHT_RULE).dim())?;
    }

    writeln!(out)?;
    if let Some(path) = &summary.report_path {
        writeln!(out, "  {} {}", style("Report:").bold(), path.display())?;
    }
    if let Some(path) = &summary.store_path {
        writeln!(out, "  {} {}", style("Results:").bold(), path.display())?;
    }
    if summary.cancelled {
        writeln!(out, "  {}", style("Run was cancelled; results are partial.").yellow())?;
    }
    writeln!(out, "{}", style(HEAVY_RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// One styled line for a status event.
pub fn status_line(event: &StatusEvent) -> String {
    let marker = if event.is_failure() {
        style("!").yellow().bold()
    } else {
        match event {
            StatusEvent::ScanStarting { .. } => style("→").cyan().bold(),
            StatusEvent::DomainComplete { .. }
            | StatusEvent::ReportWritten { .. }
            | StatusEvent::ResultsStored { .. } => style("✓").green().bold(),
            _ => style("•").dim(),
        }
    };

    format!("{} {}", marker, event)
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
