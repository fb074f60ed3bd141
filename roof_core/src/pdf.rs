//! # PDF Rendering
//!
//! Turns a [`ReportDocument`] into PDF bytes using Typst.
//!
//! ## Architecture
//!
//! - Each [`Section`] is translated into a snippet of Typst markup
//! - Captured images are served to the compiler from memory through a
//!   minimal [`World`]
//! - Fonts come from `typst-assets` and are loaded once per process
//! - Output is raw PDF bytes (`Vec<u8>`)
//!
//! Rendering is behind the [`ReportRenderer`] trait so callers that hand the
//! JSON document to some other renderer do not depend on Typst.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roof_core::geometry::{measure, Point};
//! use roof_core::pdf::{ReportRenderer, TypstRenderer};
//! use roof_core::report::{ReportAssembler, ReportInput};
//!
//! let outline = vec![
//!     Point::new(-97.74310, 30.26720),
//!     Point::new(-97.74291, 30.26720),
//!     Point::new(-97.74291, 30.26736),
//! ];
//! let measurement = measure(&outline).unwrap();
//! let input = ReportInput::for_measurement("100 Congress Ave", measurement.centroid, measurement).unwrap();
//! let report = ReportAssembler::default().assemble(input).unwrap();
//!
//! let pdf_bytes = TypstRenderer::default().render(&report).unwrap();
//! std::fs::write("roof_report.pdf", pdf_bytes).unwrap();
//! ```

use std::collections::HashMap;

use chrono::Utc;
use log::info;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::errors::{RoofError, RoofResult};
use crate::report::{
    ImageSection, LineLengths, LineTotal, PitchRow, ReportDocument, Section, StructureTotals, SummaryEntry,
};
use crate::waste::WasteRow;

/// Page margin; section placements are measured from the page corner
const MARGIN_PT: f64 = 50.0;

/// Brand blue used for page titles
const TITLE_COLOR: &str = "rgb(40, 116, 166)";

/// Fonts bundled with typst-assets, parsed once
static FONTS: Lazy<Vec<Font>> = Lazy::new(|| {
    typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data)))
        .collect()
});

/// Anything that can serialize a report document to bytes.
pub trait ReportRenderer {
    fn render(&self, document: &ReportDocument) -> RoofResult<Vec<u8>>;
}

/// JSON rendering, for consumers with their own layout engine
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, document: &ReportDocument) -> RoofResult<Vec<u8>> {
        Ok(document.to_json()?.into_bytes())
    }
}

/// PDF rendering through Typst.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypstRenderer;

impl ReportRenderer for TypstRenderer {
    fn render(&self, document: &ReportDocument) -> RoofResult<Vec<u8>> {
        let (source, files) = report_markup(document);
        let world = PdfWorld::new(source, files);

        let warned = typst::compile::<PagedDocument>(&world);
        let compiled = warned.output.map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            RoofError::render("typst compile", error_msgs.join("; "))
        })?;

        let pdf_bytes = typst_pdf::pdf(&compiled, &PdfOptions::default()).map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            RoofError::render("pdf export", error_msgs.join("; "))
        })?;

        info!("rendered report {} ({} bytes)", document.report_id, pdf_bytes.len());
        Ok(pdf_bytes)
    }
}

/// Render a report to PDF with the default renderer.
pub fn render_report_pdf(document: &ReportDocument) -> RoofResult<Vec<u8>> {
    TypstRenderer.render(document)
}

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A minimal Typst world: one in-memory source plus in-memory image files.
struct PdfWorld {
    main: Source,
    book: LazyHash<FontBook>,
    library: LazyHash<Library>,
    /// Image bytes keyed by rootless virtual path
    files: HashMap<String, Bytes>,
}

impl PdfWorld {
    fn new(source: String, files: HashMap<String, Vec<u8>>) -> Self {
        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(FontBook::from_fonts(FONTS.iter())),
            library: LazyHash::new(Library::default()),
            files: files.into_iter().map(|(path, data)| (path, Bytes::new(data))).collect(),
        }
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        let path = id.vpath().as_rootless_path();
        path.to_str()
            .and_then(|p| self.files.get(p))
            .cloned()
            .ok_or_else(|| FileError::NotFound(path.into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// Markup Generation
// ============================================================================

const PREAMBLE: &str = r##"
#set page(
  paper: "us-letter",
  margin: (x: 50pt, top: 50pt, bottom: 70pt),
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr),
      align(left)[#text(size: 9pt)[{{REPORT_ID}}]],
      align(right)[#text(size: 9pt)[Page #counter(page).display()]],
    )
  ]
)

#set text(font: "DejaVu Sans Mono", size: 10pt)
#set smartquote(enabled: false)
"##;

/// Build the Typst source for a report along with the image files it
/// references.
pub fn report_markup(document: &ReportDocument) -> (String, HashMap<String, Vec<u8>>) {
    let mut source = PREAMBLE.replace("{{REPORT_ID}}", &escape_typst(&document.report_id));
    let mut files = HashMap::new();

    for (page_index, page) in document.pages.iter().enumerate() {
        if page_index > 0 {
            source.push_str("\n#pagebreak()\n");
        }
        source.push_str(&format!("\n// Page {}\n", page.number));
        for section in &page.sections {
            let markup = match section {
                Section::Header { title, date } => header_markup(title, date),
                Section::Summary { heading, entries } => summary_markup(heading.as_deref(), entries),
                Section::PitchTable { rows } => pitch_table_markup(rows),
                Section::Complexity { options, selected } => complexity_markup(options, selected),
                Section::WasteTable { rows } => waste_table_markup(rows),
                Section::Totals(totals) => totals_markup(totals),
                Section::Label { text } => format!("#text(size: 18pt)[{}]\n#v(12pt)\n", escape_typst(text)),
                Section::LineLengths(lines) => line_lengths_markup(lines),
                Section::Image(image) => {
                    let path = format!("capture-{}.{}", files.len(), image.image.format.extension());
                    let markup = image_markup(image, &path);
                    files.insert(path, image.image.data.clone());
                    markup
                }
                Section::Note { text } => format!(
                    "#place(bottom + left)[#text(size: 8pt)[{}]]\n",
                    escape_typst(text)
                ),
            };
            source.push_str(&markup);
        }
    }

    (source, files)
}

fn heading(text: &str) -> String {
    format!("#text(size: 14pt, weight: \"bold\")[{}]\n#v(4pt)\n", escape_typst(text))
}

fn header_markup(title: &str, date: &str) -> String {
    format!(
        r##"#grid(
  columns: (1fr, auto),
  [#text(size: 24pt, fill: {color})[{title}]],
  align(right + horizon)[#text(size: 12pt)[Date: {date}]],
)
#v(12pt)
"##,
        color = TITLE_COLOR,
        title = escape_typst(title),
        date = escape_typst(date),
    )
}

fn summary_markup(title: Option<&str>, entries: &[SummaryEntry]) -> String {
    let mut out = String::new();
    if let Some(title) = title {
        out.push_str(&heading(title));
    }
    let cells: Vec<String> = entries
        .iter()
        .map(|e| format!("  [{}:], [{}],", escape_typst(&e.label), escape_typst(&e.value)))
        .collect();
    out.push_str(&format!(
        "#table(\n  columns: (auto, 1fr),\n  stroke: none,\n  inset: 3pt,\n{}\n)\n#v(12pt)\n",
        cells.join("\n")
    ));
    out
}

fn pitch_table_markup(rows: &[PitchRow]) -> String {
    let cells: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "  [{}], [{}], [{}%],",
                escape_typst(&r.pitch),
                format_whole(r.area_sq_ft),
                format_whole(r.percent_of_roof)
            )
        })
        .collect();
    format!(
        "{}#table(\n  columns: (auto, auto, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  table.header([*Roof Pitches*], [*Area (sq ft)*], [*% of Roof*]),\n{}\n)\n#v(12pt)\n",
        heading("Areas per Pitch"),
        cells.join("\n")
    )
}

fn complexity_markup(options: &[String], selected: &str) -> String {
    let choices: Vec<String> = options
        .iter()
        .map(|o| {
            if o == selected {
                format!("*● {}*", escape_typst(o))
            } else {
                format!("○ {}", escape_typst(o))
            }
        })
        .collect();
    format!("{}{}\n#v(12pt)\n", heading("Structure Complexity"), choices.join(" #h(2em) "))
}

fn waste_cell(row: &WasteRow, content: String) -> String {
    if row.is_suggested {
        format!("[#text(fill: red, weight: \"bold\")[{}]]", content)
    } else {
        format!("[{}]", content)
    }
}

fn waste_table_markup(rows: &[WasteRow]) -> String {
    let percents: Vec<String> = rows.iter().map(|r| waste_cell(r, format!("{}%", r.waste_percent))).collect();
    let areas: Vec<String> = rows.iter().map(|r| waste_cell(r, format_whole(r.adjusted_area_sq_ft))).collect();
    let squares: Vec<String> = rows.iter().map(|r| waste_cell(r, r.squares_label())).collect();

    format!(
        "{}#table(\n  columns: (auto,{}),\n  inset: 4pt,\n  stroke: 0.5pt,\n  align: right,\n  [*Waste %*], {},\n  [*Area (Sq ft)*], {},\n  [*Squares*], {},\n)\n#v(12pt)\n",
        heading("Waste Calculation"),
        " 1fr,".repeat(rows.len()),
        percents.join(", "),
        areas.join(", "),
        squares.join(", "),
    )
}

fn plural(total: &LineTotal, singular: &str) -> String {
    if total.count == 1 {
        format!("{} {}", total.count, singular)
    } else {
        format!("{} {}s", total.count, singular)
    }
}

fn totals_markup(totals: &StructureTotals) -> String {
    let lines = [
        format!("Total Roof Facets = {}", totals.total_facets),
        format!("Ridges = {} ft ({})", format_whole(totals.ridges.length_ft), plural(&totals.ridges, "Ridge")),
        format!("Hips = {} ft ({})", format_whole(totals.hips.length_ft), plural(&totals.hips, "Hip")),
        format!("Valleys = {} ft ({})", format_whole(totals.valleys.length_ft), plural(&totals.valleys, "Valley")),
        format!("Rakes = {} ft ({})", format_whole(totals.rakes.length_ft), plural(&totals.rakes, "Rake")),
        format!("Eaves/Starter = {} ft ({})", format_whole(totals.eaves.length_ft), plural(&totals.eaves, "Eave")),
        format!("Predominant Pitch = {}", totals.predominant_pitch),
        format!("Total Area (All Pitches) = {} sq ft", format_whole(totals.total_area_sq_ft)),
    ];
    let body: Vec<String> = lines.iter().map(|l| format!("{} \\", escape_typst(l))).collect();
    format!("{}{}\n#v(12pt)\n", heading("All Structures Totals"), body.join("\n"))
}

fn line_lengths_markup(lines: &LineLengths) -> String {
    format!(
        r##"#text(size: 12pt, weight: "bold")[Total Line Lengths:]
#v(4pt)
#text(fill: rgb(255, 0, 0))[Ridges = {ridge} ft] \
#text(fill: rgb(0, 0, 255))[Valleys = {valley} ft] \
#text(fill: rgb(0, 128, 0))[Rakes = {rake} ft] \
#text(fill: black)[Eaves = {eave} ft]
"##,
        ridge = format_whole(lines.ridge_ft),
        valley = format_whole(lines.valley_ft),
        rake = format_whole(lines.rake_ft),
        eave = format_whole(lines.eave_ft),
    )
}

fn image_markup(section: &ImageSection, path: &str) -> String {
    let p = &section.placement;
    let mut out = format!(
        "#place(top + left, dx: {:.1}pt, dy: {:.1}pt)[#image(\"/{}\", width: {:.1}pt, height: {:.1}pt, fit: \"contain\")]\n",
        p.x_pt - MARGIN_PT,
        p.y_pt - MARGIN_PT,
        path,
        p.width_pt,
        p.height_pt
    );
    for label in &section.labels {
        out.push_str(&format!(
            "#place(top + left, dx: {:.1}pt, dy: {:.1}pt)[#text(size: 8pt, fill: white)[{}]]\n",
            label.x_pt - MARGIN_PT,
            label.y_pt - MARGIN_PT,
            escape_typst(&label.text)
        ));
    }
    out
}

/// Whole number with thousands separators, e.g. 3500.0 -> "3,500"
fn format_whole(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    let body = s.trim_start();
    let indent = &s[..s.len() - body.len()];
    let (marker, rest) = split_list_marker(body);
    format!("{}{}{}", indent, marker, escape_inline(rest))
}

/// A leading `- `, `+ ` or `12. ` would start a list item in markup mode
fn split_list_marker(s: &str) -> (String, &str) {
    let starts_item = |len: usize| s[len..].is_empty() || s[len..].starts_with(char::is_whitespace);

    if (s.starts_with('-') || s.starts_with('+')) && starts_item(1) {
        return (format!("\\{}", &s[..1]), &s[1..]);
    }

    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && s[digits..].starts_with('.') && starts_item(digits + 1) {
        return (format!("{}\\.", &s[..digits]), &s[digits + 1..]);
    }

    (String::new(), s)
}

fn escape_inline(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '[' => "\\[".to_string(),
            ']' => "\\]".to_string(),
            '/' => "\\/".to_string(),
            '~' => "\\~".to_string(),
            '=' => "\\=".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}
