//! Minimal PDF writer.
//!
//! Emits a PDF 1.4 document using the base-14 Helvetica fonts, so nothing is
//! embedded. Text is drawn line by line on A4 pages; characters outside
//! printable ASCII are replaced with `?`.

use super::{LineStyle, ReportLine};
use std::fmt::Write as _;

/// Lines drawn on one page.
pub const LINES_PER_PAGE: usize = 54;

/// Longer lines are wrapped.
const MAX_LINE_CHARS: usize = 95;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN_LEFT: u32 = 50;
const FIRST_BASELINE: u32 = 800;
const LEADING: u32 = 14;

// Fixed object numbers; page objects follow.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_REGULAR_ID: usize = 3;
const FONT_BOLD_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

/// Render `lines` into a complete PDF file.
pub fn render_pdf(lines: &[ReportLine]) -> Vec<u8> {
    let wrapped = wrap_lines(lines);
    let pages: Vec<&[ReportLine]> = if wrapped.is_empty() {
        vec![&wrapped[..]]
    } else {
        wrapped.chunks(LINES_PER_PAGE).collect()
    };

    let mut writer = PdfWriter::new();

    writer.object(
        CATALOG_ID,
        &format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID),
    );

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");
    writer.object(
        PAGES_ID,
        &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
    );

    writer.object(FONT_REGULAR_ID, &font_dict("Helvetica"));
    writer.object(FONT_BOLD_ID, &font_dict("Helvetica-Bold"));

    for (i, page) in pages.iter().enumerate() {
        writer.object(
            page_id(i),
            &format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES_ID,
                PAGE_WIDTH,
                PAGE_HEIGHT,
                FONT_REGULAR_ID,
                FONT_BOLD_ID,
                page_id(i) + 1
            ),
        );
        writer.stream(page_id(i) + 1, &content_stream(page));
    }

    writer.finish(CATALOG_ID)
}

fn page_id(index: usize) -> usize {
    FIRST_PAGE_ID + index * 2
}

fn font_dict(base: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
}

fn wrap_lines(lines: &[ReportLine]) -> Vec<ReportLine> {
    let mut wrapped = Vec::with_capacity(lines.len());

    for line in lines {
        let chars: Vec<char> = line.text.chars().collect();
        if chars.len() <= MAX_LINE_CHARS {
            wrapped.push(line.clone());
            continue;
        }
        for chunk in chars.chunks(MAX_LINE_CHARS) {
            wrapped.push(ReportLine::new(chunk.iter().collect::<String>(), line.style));
        }
    }

    wrapped
}

fn content_stream(lines: &[ReportLine]) -> String {
    let mut content = String::new();
    let _ = writeln!(content, "BT");
    let _ = writeln!(content, "{} TL", LEADING);
    let _ = writeln!(content, "{} {} Td", MARGIN_LEFT, FIRST_BASELINE);

    for line in lines {
        let (font, size, color) = match line.style {
            LineStyle::Title => ("F2", 16, "0 0 0"),
            LineStyle::Heading => ("F2", 11, "0 0 0"),
            LineStyle::Body => ("F1", 10, "0 0 0"),
            LineStyle::PortOpen => ("F1", 10, "0 0.5 0"),
            LineStyle::PortClosed => ("F1", 10, "0.8 0 0"),
        };
        let _ = writeln!(content, "/{} {} Tf", font, size);
        let _ = writeln!(content, "{} rg", color);
        let _ = writeln!(content, "({}) Tj T*", escape_text(&line.text));
    }

    let _ = writeln!(content, "ET");
    content
}

/// Escape a string for use inside a PDF literal string.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            '\t' => escaped.push(' '),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Tracks object offsets while the file body is written.
struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buffer = b"%PDF-1.4\n".to_vec();
        // Binary marker so transfer tools treat the file as binary.
        buffer.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets.push((id, self.buffer.len()));
        self.buffer
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, id: usize, content: &str) {
        self.offsets.push((id, self.buffer.len()));
        self.buffer.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                id,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let size = self.offsets.len() + 1;
        let xref_offset = self.buffer.len();

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for (_, offset) in &self.offsets {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, xref_offset
        );

        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_lines(n: usize) -> Vec<ReportLine> {
        (0..n).map(|i| ReportLine::body(format!("line {}", i))).collect()
    }

    fn as_text(pdf: &[u8]) -> String {
        String::from_utf8_lossy(pdf).into_owned()
    }

    #[test]
    fn test_document_structure() {
        let pdf = render_pdf(&body_lines(3));
        let text = as_text(&pdf);

        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("(line 2) Tj T*"));
    }

    #[test]
    fn test_pagination() {
        let text = as_text(&render_pdf(&body_lines(LINES_PER_PAGE + 1)));
        assert!(text.contains("/Count 2"));
        assert!(text.contains(&format!("/Kids [{} 0 R {} 0 R]", page_id(0), page_id(1))));

        let text = as_text(&render_pdf(&body_lines(LINES_PER_PAGE)));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_empty_content_still_has_a_page() {
        let text = as_text(&render_pdf(&[]));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_port_lines_are_colored() {
        let lines = vec![
            ReportLine::new("    80: open", LineStyle::PortOpen),
            ReportLine::new("    443: closed_or_filtered", LineStyle::PortClosed),
        ];
        let text = as_text(&render_pdf(&lines));

        assert!(text.contains("0 0.5 0 rg\n(    80: open) Tj T*"));
        assert!(text.contains("0.8 0 0 rg\n(    443: closed_or_filtered) Tj T*"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text(r"a(b)c\d"), r"a\(b\)c\\d");
        assert_eq!(escape_text("caf\u{e9}"), "caf?");
    }

    #[test]
    fn test_long_lines_wrap() {
        let long = ReportLine::body("x".repeat(MAX_LINE_CHARS * 2 + 1));
        assert_eq!(wrap_lines(&[long]).len(), 3);
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pdf = render_pdf(&body_lines(60));
        let text = as_text(&pdf);

        let xref_start: usize = text
            .split("startxref\n")
            .nth(1)
            .and_then(|s| s.lines().next())
            .and_then(|s| s.parse().ok())
            .unwrap();

        // Everything from the xref table on is ASCII.
        let table = std::str::from_utf8(&pdf[xref_start..]).unwrap();
        assert!(table.starts_with("xref\n"));

        let entries: Vec<usize> = table
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();

        assert_eq!(entries.len(), 4 + 2 * 2);
        for (i, offset) in entries.iter().enumerate() {
            assert!(pdf[*offset..].starts_with(format!("{} 0 obj", i + 1).as_bytes()));
        }
    }
}
