//! PDF export of a `ReportData`.
//!
//! Walks the report structure in fixed section order: executive
//! summary, threat overview, asset status, top events, vulnerable
//! assets, recommendations, compliance. The page decorator repeats the
//! branded header (client + period + generation stamp) on every page;
//! page breaks are evaluated per element and table row by the layout
//! engine, so long tables span pages with the header redrawn.
//!
//! Rendering strategy: `genpdf` (pure Rust, no external dependencies)

use chrono::{DateTime, Utc};
use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, Paragraph, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{fonts, Document, Element, SimplePageDecorator};

use soc_core::{ReportData, ReportWindow, Severity};

/// Font directories to search on different platforms
const FONT_DIRS: &[&str] = &[
    "./fonts",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/dejavu",
    "/System/Library/Fonts",
    "/Library/Fonts",
    "/System/Library/Fonts/Supplemental",
];

/// Font family base names tried in each directory.
const FONT_FAMILIES: &[&str] = &["LiberationSans", "DejaVuSans"];

/// Alert names longer than this are cut with a trailing ellipsis.
const ALERT_NAME_MAX: usize = 30;

/// Get the fonts directory relative to the crate root
fn crate_fonts_dir() -> Option<std::path::PathBuf> {
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let fonts_dir = std::path::PathBuf::from(manifest_dir).join("fonts");
        if fonts_dir.exists() {
            return Some(fonts_dir);
        }
    }

    // Relative to the test/bin executable: target/debug/deps -> crate root
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(target_dir) = exe_path.ancestors().nth(4) {
            let fonts_dir = target_dir.join("crates/server/fonts");
            if fonts_dir.exists() {
                return Some(fonts_dir);
            }
        }
    }

    None
}

/// `security-report-<slug>-<yyyy-MM-dd>.pdf`
pub fn report_filename(client_name: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "security-report-{}-{}.pdf",
        slugify(client_name),
        generated_at.format("%Y-%m-%d")
    )
}

/// Lowercase, non-alphanumerics collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn truncate_label(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// Pure Rust PDF renderer over the report structure.
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the report to PDF bytes. The generation timestamp is the
    /// only clock read; aggregation stays pure.
    pub fn render(&self, report: &ReportData, client_name: &str) -> Result<Vec<u8>, String> {
        let generated_at = Utc::now();
        self.render_at(report, client_name, generated_at)
    }

    /// Render with an explicit generation timestamp (deterministic in tests).
    pub fn render_at(
        &self,
        report: &ReportData,
        client_name: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, String> {
        let font_family = load_font_family()?;

        let mut doc = Document::new(font_family);
        doc.set_title(format!("Security Report - {client_name}"));
        doc.set_minimal_conformance();
        doc.set_line_spacing(1.25);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(15);
        decorator.set_header(page_header(
            client_name.to_string(),
            report.window,
            generated_at,
        ));
        doc.set_page_decorator(decorator);

        self.push_executive_summary(&mut doc, report);
        self.push_threat_overview(&mut doc, report)?;
        self.push_asset_summary(&mut doc, report);
        self.push_top_events(&mut doc, report)?;
        self.push_vulnerable_assets(&mut doc, report)?;
        self.push_recommendations(&mut doc, report);
        self.push_compliance(&mut doc, report);

        doc.push(Break::new(1.0));
        doc.push(
            Paragraph::new("--- END OF REPORT ---").styled(
                Style::new()
                    .italic()
                    .with_font_size(9)
                    .with_color(Color::Rgb(128, 128, 128)),
            ),
        );

        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| format!("PDF render failed: {e}"))?;
        Ok(buffer)
    }

    fn push_section_heading(&self, doc: &mut Document, title: &str) {
        doc.push(Paragraph::new(title).styled(Style::new().bold().with_font_size(14)));
        doc.push(Break::new(0.3));
    }

    fn push_executive_summary(&self, doc: &mut Document, report: &ReportData) {
        self.push_section_heading(doc, "EXECUTIVE SUMMARY");

        let s = &report.summary;
        for line in [
            format!("Total security events: {}", s.total_events),
            format!("Critical events: {}", s.critical_count),
            format!("High severity events: {}", s.high_count),
            format!("Assets monitored: {}", s.assets_monitored),
            format!("Risk score: {} / 100", s.risk_score),
        ] {
            doc.push(Paragraph::new(line).styled(Style::new().with_font_size(11)));
        }
        doc.push(Break::new(1.0));
    }

    fn push_threat_overview(&self, doc: &mut Document, report: &ReportData) -> Result<(), String> {
        self.push_section_heading(doc, "THREAT OVERVIEW");

        let total = report.histogram.total();
        let mut table = TableLayout::new(vec![2, 1, 1]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        push_table_header(&mut table, &["Severity", "Count", "Percentage"])?;

        for severity in Severity::NAMED {
            let count = report.histogram.get(severity);
            let pct = (count as f64 / total.max(1) as f64 * 100.0).round() as u64;
            push_table_row(
                &mut table,
                &[
                    severity.as_str().to_uppercase(),
                    count.to_string(),
                    format!("{pct}%"),
                ],
            )?;
        }

        doc.push(table);
        doc.push(Break::new(1.0));
        Ok(())
    }

    fn push_asset_summary(&self, doc: &mut Document, report: &ReportData) {
        self.push_section_heading(doc, "ASSET STATUS SUMMARY");

        let a = &report.asset_summary;
        for line in [
            format!("Total assets: {}", a.total),
            format!("Online: {}", a.online),
            format!("Offline: {}", a.offline),
            format!("With known vulnerabilities: {}", a.vulnerable),
        ] {
            doc.push(Paragraph::new(line).styled(Style::new().with_font_size(11)));
        }
        doc.push(Break::new(1.0));
    }

    fn push_top_events(&self, doc: &mut Document, report: &ReportData) -> Result<(), String> {
        self.push_section_heading(doc, "TOP SECURITY EVENTS");

        if report.top_events.is_empty() {
            doc.push(
                Paragraph::new("No critical or high severity events in this period.")
                    .styled(Style::new().italic().with_font_size(10)),
            );
            doc.push(Break::new(1.0));
            return Ok(());
        }

        let mut table = TableLayout::new(vec![2, 1, 3, 2]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        push_table_header(&mut table, &["Date", "Severity", "Alert", "Host"])?;

        for event in &report.top_events {
            push_table_row(
                &mut table,
                &[
                    event.timestamp.format("%b %d, %Y").to_string(),
                    event.severity.as_str().to_uppercase(),
                    truncate_label(&event.alert_name, ALERT_NAME_MAX),
                    event.host.clone(),
                ],
            )?;
        }

        doc.push(table);
        doc.push(Break::new(1.0));
        Ok(())
    }

    fn push_vulnerable_assets(
        &self,
        doc: &mut Document,
        report: &ReportData,
    ) -> Result<(), String> {
        self.push_section_heading(doc, "VULNERABLE ASSETS SUMMARY");

        if report.vulnerable_assets.is_empty() {
            doc.push(
                Paragraph::new("No assets with known vulnerabilities.")
                    .styled(Style::new().italic().with_font_size(10)),
            );
            doc.push(Break::new(1.0));
            return Ok(());
        }

        let mut table = TableLayout::new(vec![3, 2, 1, 1]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        push_table_header(&mut table, &["Asset", "IP Address", "Critical", "Total"])?;

        for asset in &report.vulnerable_assets {
            push_table_row(
                &mut table,
                &[
                    asset.name.clone(),
                    asset.ip_address.clone(),
                    asset.critical_vulns.to_string(),
                    asset.total_vulns.to_string(),
                ],
            )?;
        }

        doc.push(table);
        doc.push(Break::new(1.0));
        Ok(())
    }

    fn push_recommendations(&self, doc: &mut Document, report: &ReportData) {
        self.push_section_heading(doc, "RECOMMENDATIONS");

        for (idx, rec) in report.recommendations.iter().enumerate() {
            doc.push(
                Paragraph::new(format!("{}. {rec}", idx + 1))
                    .styled(Style::new().with_font_size(10)),
            );
        }
        doc.push(Break::new(1.0));
    }

    fn push_compliance(&self, doc: &mut Document, report: &ReportData) {
        self.push_section_heading(doc, "COMPLIANCE");

        let c = &report.compliance;
        for line in [
            format!("Events processed: {}", c.events_processed),
            format!("Average response time: {:.0} ms", c.avg_response_time_ms),
            format!("System uptime: {:.2}%", c.system_uptime_pct),
        ] {
            doc.push(Paragraph::new(line).styled(Style::new().with_font_size(11)));
        }
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font_family() -> Result<fonts::FontFamily<fonts::FontData>, String> {
    let mut font_dirs: Vec<std::path::PathBuf> =
        FONT_DIRS.iter().map(std::path::PathBuf::from).collect();
    if let Some(crate_fonts) = crate_fonts_dir() {
        font_dirs.insert(0, crate_fonts);
    }

    // Fonts must be embedded (no builtin) for unicode support.
    font_dirs
        .iter()
        .filter(|path| path.exists())
        .find_map(|dir| {
            let dir_str = dir.to_str().unwrap_or(".");
            FONT_FAMILIES
                .iter()
                .find_map(|family| fonts::from_files(dir_str, family, None).ok())
        })
        .ok_or_else(|| {
            format!(
                "No suitable fonts found. Searched: {:?}. Please install Liberation or DejaVu fonts.",
                font_dirs
            )
        })
}

/// Branded header drawn by the page decorator on every page.
fn page_header(
    client_name: String,
    window: ReportWindow,
    generated_at: DateTime<Utc>,
) -> impl Fn(usize) -> genpdf::elements::StyledElement<LinearLayout> {
    move |_page| {
        let mut layout = LinearLayout::vertical();
        layout.push(
            Paragraph::new(format!("SECURITY OPERATIONS REPORT - {client_name}"))
                .styled(Style::new().bold().with_font_size(12)),
        );
        layout.push(
            Paragraph::new(format!(
                "Period: {} to {}",
                window.from.format("%b %d, %Y"),
                window.to.format("%b %d, %Y")
            ))
            .styled(Style::new().with_font_size(9)),
        );
        layout.push(
            Paragraph::new(format!(
                "Generated: {}",
                generated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ))
            .styled(
                Style::new()
                    .with_font_size(8)
                    .with_color(Color::Rgb(128, 128, 128)),
            ),
        );
        layout.push(Break::new(0.8));
        layout.styled(Style::new())
    }
}

fn push_table_header(table: &mut TableLayout, cells: &[&str]) -> Result<(), String> {
    let mut row = table.row();
    for cell in cells {
        row = row.element(
            Paragraph::new(*cell)
                .styled(Style::new().bold().with_font_size(10))
                .padded(1),
        );
    }
    row.push().map_err(|e| format!("table header row: {e}"))
}

fn push_table_row(table: &mut TableLayout, cells: &[String]) -> Result<(), String> {
    let mut row = table.row();
    for cell in cells {
        row = row.element(
            Paragraph::new(cell.as_str())
                .styled(Style::new().with_font_size(10))
                .padded(1),
        );
    }
    row.push().map_err(|e| format!("table row: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  Acme   / Corp!"), "acme-corp");
        assert_eq!(slugify("ACME"), "acme");
    }

    #[test]
    fn filename_pattern() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap();
        assert_eq!(
            report_filename("Acme Corp", ts),
            "security-report-acme-corp-2025-06-15.pdf"
        );
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate_label("short", 30), "short");
        let long = "a".repeat(40);
        let cut = truncate_label(&long, 30);
        assert_eq!(cut.chars().count(), 33);
        assert!(cut.ends_with("..."));
    }
}
