//! Report content and the plain-text rendering.

use super::{LineStyle, ReportLine};
use crate::types::{Domain, ScanRecord, NOT_AVAILABLE};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::net::IpAddr;

const RULE: &str = "========================================";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render a full text report.
///
/// The output depends only on the arguments, so identical records and
/// timestamp always give identical text.
pub fn render_text(records: &[ScanRecord], generated_at: DateTime<Utc>) -> String {
    lines_to_text(&report_lines(records, generated_at))
}

pub(crate) fn lines_to_text(lines: &[ReportLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.text);
        out.push('\n');
    }
    out
}

/// Build the report content shared by every format.
pub fn report_lines(records: &[ScanRecord], generated_at: DateTime<Utc>) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::new("Scan Report", LineStyle::Title),
        ReportLine::body(RULE),
        ReportLine::body(format!("Generated on: {}", generated_at.format(DATE_FORMAT))),
        ReportLine::body(format!("Domains scanned: {}", records.len())),
        ReportLine::blank(),
    ];

    for record in records {
        domain_section(record, &mut lines);
        lines.push(ReportLine::blank());
    }

    summary_section(records, &mut lines);
    lines
}

fn domain_section(record: &ScanRecord, lines: &mut Vec<ReportLine>) {
    let http = &record.http_result;

    lines.push(ReportLine::new(
        format!("Domain: {}", record.domain),
        LineStyle::Heading,
    ));
    lines.push(ReportLine::body(format!("  IP Address: {}", record.ip_label())));
    lines.push(ReportLine::body(format!(
        "  Scan Date: {}",
        record.scan_timestamp.format(DATE_FORMAT)
    )));

    lines.push(ReportLine::body("  Port Status:"));
    if record.port_status.is_empty() {
        lines.push(ReportLine::body(format!("    {}", NOT_AVAILABLE)));
    }
    for (port, state) in record.port_status.iter() {
        let style = if state.is_open() {
            LineStyle::PortOpen
        } else {
            LineStyle::PortClosed
        };
        lines.push(ReportLine::new(format!("    {}: {}", port, state), style));
    }

    lines.push(ReportLine::body(format!("  HTTP Status Code: {}", http.code_label())));
    lines.push(ReportLine::body(format!(
        "  HTTP Status Description: {}",
        http.description
    )));
    lines.push(ReportLine::body(format!(
        "  Final URL: {}",
        http.final_url.as_deref().unwrap_or(NOT_AVAILABLE)
    )));
    lines.push(ReportLine::body(format!(
        "  Redirected URL: {}",
        record.redirected_label()
    )));
    lines.push(ReportLine::body(format!(
        "  Screenshot: {}",
        record.screenshot_label()
    )));
}

fn summary_section(records: &[ScanRecord], lines: &mut Vec<ReportLine>) {
    lines.push(ReportLine::new("Summary", LineStyle::Heading));
    lines.push(ReportLine::body(RULE));

    // Failed probes sort after every real status code.
    let mut by_status: BTreeMap<(bool, u16), (String, Vec<&Domain>)> = BTreeMap::new();
    for record in records {
        let http = &record.http_result;
        let key = (http.status_code.is_none(), http.status_code.unwrap_or(0));
        let label = match http.status_code {
            Some(code) => format!("{} {}", code, http.description),
            None => NOT_AVAILABLE.to_string(),
        };
        by_status
            .entry(key)
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push(&record.domain);
    }

    lines.push(ReportLine::body("HTTP status:"));
    for (label, domains) in by_status.values() {
        lines.push(ReportLine::body(format!(
            "  {}: {} ({})",
            label,
            domains.len(),
            join(domains)
        )));
    }

    let mut by_ip: BTreeMap<IpAddr, Vec<&Domain>> = BTreeMap::new();
    let mut unresolved = Vec::new();
    for record in records {
        match record.ip_address {
            Some(ip) => by_ip.entry(ip).or_default().push(&record.domain),
            None => unresolved.push(&record.domain),
        }
    }

    let unique = by_ip.values().filter(|domains| domains.len() == 1).count();
    let repeated: Vec<_> = by_ip
        .iter()
        .filter(|(_, domains)| domains.len() > 1)
        .collect();

    lines.push(ReportLine::body("IP addresses:"));
    lines.push(ReportLine::body(format!("  Unique: {}", unique)));
    lines.push(ReportLine::body(format!("  Repeated: {}", repeated.len())));
    for (ip, domains) in repeated {
        lines.push(ReportLine::body(format!("    {} shared by: {}", ip, join(domains))));
    }
    if !unresolved.is_empty() {
        lines.push(ReportLine::body(format!("  Unresolved: {}", join(&unresolved))));
    }
}

fn join(domains: &[&Domain]) -> String {
    domains
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
