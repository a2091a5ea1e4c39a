use crate::date::{fmt_compact, fmt_display};
use crate::error::CliError;
use crate::model::{Db, DeadlineKind};
use chrono::NaiveDate;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb};
use std::fs;
use std::path::Path;

pub const TITLE: &str = "Vehicle Fleet Summary";
pub const COLUMNS: [&str; 5] = ["Vehicle", "Plate", "Insurance", "Inspection", "Tax"];

// A4 portrait, millimetres.
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const ROW_H: f32 = 7.0;
const FIRST_ROW_Y: f32 = 244.0;
const FOOTER_Y: f32 = 12.0;
pub const ROWS_PER_PAGE: usize = 31;

// Relative widths 3:2:3:3:3 over the printable width.
const COLUMN_X: [f32; 5] = [20.0, 56.4, 80.7, 117.1, 153.6];
const COLUMN_CHARS: [usize; 5] = [20, 13, 20, 20, 20];

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryRow {
    pub name: String,
    pub license_plate: String,
    pub insurance: String,
    pub inspection: String,
    pub tax: String,
}

impl SummaryRow {
    pub fn cells(&self) -> [&str; 5] {
        [
            &self.name,
            &self.license_plate,
            &self.insurance,
            &self.inspection,
            &self.tax,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Pdf,
    Csv,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Csv => "csv",
        }
    }
}

pub fn default_export_name(today: NaiveDate, kind: ExportKind) -> String {
    format!("vehicle_summary_{}.{}", fmt_compact(today), kind.extension())
}

pub fn summary_rows(db: &Db) -> Vec<SummaryRow> {
    db.vehicles
        .iter()
        .map(|v| {
            let text = |k: DeadlineKind| v.status().get(k).days_text.clone();
            SummaryRow {
                name: v.name.clone(),
                license_plate: v.license_plate.clone(),
                insurance: text(DeadlineKind::Insurance),
                inspection: text(DeadlineKind::Inspection),
                tax: text(DeadlineKind::Tax),
            }
        })
        .collect()
}

fn write_file(out: &Path, data: &[u8]) -> Result<(), CliError> {
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| CliError::io(format!("Cannot create {}: {}", dir.display(), e)))?;
    }
    fs::write(out, data).map_err(|e| CliError::io(format!("Cannot write {}: {}", out.display(), e)))
}

fn csv_escape(value: &str) -> String {
    if value.contains(['\n', '\r', '"', ',']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_csv(rows: &[SummaryRow]) -> String {
    let mut lines: Vec<String> = vec![COLUMNS.map(str::to_lowercase).join(",")];
    for r in rows.iter() {
        lines.push(
            r.cells()
                .iter()
                .map(|c| csv_escape(c))
                .collect::<Vec<String>>()
                .join(","),
        );
    }
    lines.join("\n") + "\n"
}

pub fn export_csv(out: &Path, rows: &[SummaryRow]) -> Result<(), CliError> {
    write_file(out, render_csv(rows).as_bytes())?;
    log::info!("exported {} vehicle(s) to {}", rows.len(), out.display());
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Splits rows into pages; an empty list still yields one (empty) page.
pub fn paginate<T>(rows: &[T], per_page: usize) -> Vec<&[T]> {
    if rows.is_empty() {
        return vec![rows];
    }
    rows.chunks(per_page.max(1)).collect()
}

fn pdf_error(e: impl std::fmt::Display) -> CliError {
    CliError::io(format!("PDF generation failed: {}", e))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw_page(
    layer: &PdfLayerReference,
    rows: &[SummaryRow],
    page: usize,
    pages: usize,
    fonts: &Fonts,
    today: NaiveDate,
) {
    layer.set_fill_color(Color::Rgb(Rgb::new(0.27, 0.40, 1.0, None)));
    layer.use_text(TITLE, 16.0, Mm(MARGIN), Mm(PAGE_H - MARGIN - 6.0), &fonts.bold);

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    layer.use_text(
        format!("Generated on {}", fmt_display(today)),
        9.0,
        Mm(MARGIN),
        Mm(PAGE_H - MARGIN - 13.0),
        &fonts.regular,
    );

    let header_y = FIRST_ROW_Y + ROW_H + 2.0;
    for (i, col) in COLUMNS.iter().enumerate() {
        layer.use_text(*col, 10.0, Mm(COLUMN_X[i]), Mm(header_y), &fonts.bold);
    }

    for (n, row) in rows.iter().enumerate() {
        let y = FIRST_ROW_Y - ROW_H * n as f32;
        for (i, cell) in row.cells().iter().enumerate() {
            layer.use_text(
                truncate(cell, COLUMN_CHARS[i]),
                10.0,
                Mm(COLUMN_X[i]),
                Mm(y),
                &fonts.regular,
            );
        }
    }

    layer.use_text(
        format!("Page {} of {}", page, pages),
        9.0,
        Mm(PAGE_W / 2.0 - 10.0),
        Mm(FOOTER_Y),
        &fonts.regular,
    );
}

/// Writes the fixed-layout summary: title header, five-column table,
/// numbered footer. Returns the page count.
pub fn export_pdf(out: &Path, rows: &[SummaryRow], today: NaiveDate) -> Result<usize, CliError> {
    let pages = paginate(rows, ROWS_PER_PAGE);
    let total = pages.len();

    let (doc, first_page, first_layer) = PdfDocument::new(TITLE, Mm(PAGE_W), Mm(PAGE_H), "Page 1");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
    };

    for (n, chunk) in pages.iter().enumerate() {
        let layer = if n == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", n + 1));
            doc.get_page(page).get_layer(layer)
        };
        draw_page(&layer, chunk, n + 1, total, &fonts, today);
    }

    let bytes = doc.save_to_bytes().map_err(pdf_error)?;
    write_file(out, &bytes)?;

    log::info!(
        "exported {} vehicle(s) on {} page(s) to {}",
        rows.len(),
        total,
        out.display()
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{add_days, parse_date};
    use crate::model::Vehicle;

    fn today() -> NaiveDate {
        parse_date("2026-10-19", "today").unwrap()
    }

    fn db(n: usize) -> Db {
        let t = today();
        let vehicles = (0..n)
            .map(|i| {
                Vehicle::new(
                    format!("Car {}", i),
                    format!("PL{:03}", i),
                    [add_days(t, 1), add_days(t, 0), add_days(t, -3)],
                    t,
                )
            })
            .collect();
        Db { vehicles }
    }

    #[test]
    fn rows_use_status_display_text() {
        let rows = summary_rows(&db(1));
        assert_eq!(
            rows[0],
            SummaryRow {
                name: "Car 0".to_string(),
                license_plate: "PL000".to_string(),
                insurance: "1 day remaining".to_string(),
                inspection: "due today".to_string(),
                tax: "overdue by 3 days".to_string(),
            }
        );
    }

    #[test]
    fn csv_escapes_cells() {
        let mut rows = summary_rows(&db(1));
        rows[0].name = "Van, \"big\"".to_string();
        let csv = render_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "vehicle,plate,insurance,inspection,tax");
        assert!(lines[1].starts_with("\"Van, \"\"big\"\"\",PL000,"));
    }

    #[test]
    fn pagination() {
        let rows: Vec<u32> = (0..70).collect();
        let pages = paginate(&rows, ROWS_PER_PAGE);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].len(), 70 - 2 * ROWS_PER_PAGE);
        assert_eq!(paginate::<u32>(&[], ROWS_PER_PAGE).len(), 1);
    }

    #[test]
    fn long_cells_are_truncated() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn pdf_file_is_written() {
        let td = tempfile::tempdir().unwrap();
        let out = td.path().join("out").join("summary.pdf");
        let rows = summary_rows(&db(40));

        let pages = export_pdf(&out, &rows, today()).unwrap();
        assert_eq!(pages, 2);
        let bytes = fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn default_name_has_date_and_extension() {
        assert_eq!(
            default_export_name(today(), ExportKind::Pdf),
            "vehicle_summary_20261019.pdf"
        );
    }
}
