use super::super::aggregate::{CompanyAggregate, OfferHolder, PlacementAggregate};
use super::super::domain::{Company, Student};
use super::ReportError;
use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fmt::Display;

// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 42.0;
const FOOTER_SPACE: f32 = 14.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const ROW_HEIGHT: f32 = 16.0;
const LINE_HEIGHT: f32 = 11.0;
const ROW_PADDING: f32 = 5.0;
const CELL_PADDING: f32 = 4.0;
// Average Helvetica advance as a fraction of the font size.
const GLYPH_RATIO: f32 = 0.55;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";
const HEADER_FILL: [f32; 3] = [0.84, 0.88, 0.95];
const OFFER_FILL: [f32; 3] = [0.78, 0.94, 0.81];

pub fn build_document(
    companies: &[Company],
    students: &[Student],
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ReportError> {
    render(&PlacementAggregate::build(companies, students), generated_at)
}

pub(super) fn render(
    aggregate: &PlacementAggregate<'_>,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, ReportError> {
    let mut layout = PageLayout::new();

    layout.text_line(BOLD, TITLE_SIZE, "Placement Report");
    layout.text_line(
        REGULAR,
        BODY_SIZE,
        &format!("Generated on {}", generated_at.format("%d %B %Y, %H:%M:%S")),
    );
    layout.gap(8.0);

    layout.heading("Overall Summary");
    layout.table(&summary_table(aggregate));

    for entry in &aggregate.companies {
        layout.heading(&entry.company.name);
        layout.table(&company_table(entry));
        if entry.students.is_empty() {
            layout.text_line(REGULAR, BODY_SIZE, "No students recorded for this company.");
            layout.gap(8.0);
        } else {
            layout.table(&student_table(entry));
        }
    }

    layout.page_break();
    layout.heading("Students with Offers (All Records)");
    offer_section(&mut layout, &aggregate.offer_holders);
    layout.heading("Students with Offers (Unique)");
    offer_section(&mut layout, &aggregate.unique_offer_holders);

    assemble(layout.finish())
}

fn offer_section(layout: &mut PageLayout, holders: &[OfferHolder<'_>]) {
    if holders.is_empty() {
        layout.text_line(REGULAR, BODY_SIZE, "No offers recorded.");
        layout.gap(8.0);
    } else {
        layout.table(&offer_table(holders));
    }
}

fn summary_table(aggregate: &PlacementAggregate<'_>) -> Table {
    let mut table = Table::new(&[("Metric", 0.35), ("Value", 0.65)]);
    table.push(["Total Companies".to_string(), aggregate.company_count().to_string()]);
    table.push(["Companies".to_string(), aggregate.company_names()]);
    table.push(["Unique Students".to_string(), aggregate.unique_students.to_string()]);
    table.push(["Total Offers".to_string(), aggregate.total_offers.to_string()]);
    table.push([
        "Unique Students with Offers".to_string(),
        aggregate.unique_offers().to_string(),
    ]);
    table
}

fn company_table(entry: &CompanyAggregate<'_>) -> Table {
    let company = entry.company;
    let mut table = Table::new(&[("Detail", 0.3), ("Value", 0.7)]);
    table.push(["CTC Offer".to_string(), company.ctc_offer.clone()]);
    table.push(["Bond (Years)".to_string(), company.agreement_years.to_string()]);
    table.push(["Hiring Rounds".to_string(), company.hiring_flow()]);
    table.push(["Total Students".to_string(), entry.total_students().to_string()]);
    table.push(["Offers".to_string(), entry.offer_count.to_string()]);
    table.push(["Round Breakdown".to_string(), entry.round_summary()]);
    table
}

fn student_table(entry: &CompanyAggregate<'_>) -> Table {
    let mut table = Table::new(&[
        ("Name", 0.27),
        ("Student Number", 0.18),
        ("Email", 0.33),
        ("Round Reached", 0.22),
    ]);
    for student in &entry.students {
        let row = [
            student.name.clone(),
            student.student_number.clone(),
            student.email_or_placeholder().to_string(),
            entry.company.progress_label(&student.max_round_reached),
        ];
        if student.has_offer() {
            table.push_highlighted(row, 3);
        } else {
            table.push(row);
        }
    }
    table
}

fn offer_table(holders: &[OfferHolder<'_>]) -> Table {
    let mut table = Table::new(&[
        ("Name", 0.26),
        ("Student Number", 0.18),
        ("Email", 0.32),
        ("Company", 0.24),
    ]);
    for holder in holders {
        table.push([
            holder.student.name.clone(),
            holder.student.student_number.clone(),
            holder.student.email_or_placeholder().to_string(),
            holder.company_name.to_string(),
        ]);
    }
    table
}

struct Table {
    headers: Vec<String>,
    widths: Vec<f32>,
    rows: Vec<TableRow>,
}

struct TableRow {
    cells: Vec<String>,
    highlight: Option<usize>,
}

impl Table {
    /// Column widths are fractions of the printable width.
    fn new(columns: &[(&str, f32)]) -> Self {
        Self {
            headers: columns.iter().map(|(header, _)| header.to_string()).collect(),
            widths: columns
                .iter()
                .map(|(_, fraction)| fraction * CONTENT_WIDTH)
                .collect(),
            rows: Vec::new(),
        }
    }

    fn push<const N: usize>(&mut self, cells: [String; N]) {
        self.rows.push(TableRow {
            cells: cells.into(),
            highlight: None,
        });
    }

    fn push_highlighted<const N: usize>(&mut self, cells: [String; N], column: usize) {
        self.rows.push(TableRow {
            cells: cells.into(),
            highlight: Some(column),
        });
    }
}

/// Top-down cursor over A4 pages, collecting content stream operations.
struct PageLayout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn remaining(&self) -> f32 {
        self.cursor - MARGIN - FOOTER_SPACE
    }

    fn page_break(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn ensure(&mut self, height: f32) {
        if self.remaining() < height {
            self.page_break();
        }
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn text_line(&mut self, font: &str, size: f32, text: &str) {
        let height = size * 1.6;
        for line in wrap_text(text, CONTENT_WIDTH, size) {
            self.ensure(height);
            let baseline = self.cursor - size;
            self.current
                .extend(text_operations(font, size, MARGIN, baseline, &line));
            self.cursor -= height;
        }
    }

    /// Keeps a heading on the same page as the first rows beneath it.
    fn heading(&mut self, text: &str) {
        self.ensure(HEADING_SIZE * 1.6 + ROW_HEIGHT * 3.0);
        self.text_line(BOLD, HEADING_SIZE, text);
    }

    /// Lines of body text that fit in a row starting at `top`.
    fn lines_fitting_at(top: f32) -> usize {
        let usable = top - MARGIN - FOOTER_SPACE - ROW_PADDING;
        if usable < LINE_HEIGHT {
            0
        } else {
            (usable / LINE_HEIGHT).floor() as usize
        }
    }

    /// Draws a table, repeating its header on every page it spans. Rows grow
    /// to hold wrapped cell text; a row taller than a page continues on the next.
    fn table(&mut self, table: &Table) {
        let header = wrap_cells(&table.widths, &table.headers);
        let header_lines = line_count(&header);
        let fresh_page_lines =
            Self::lines_fitting_at(PAGE_HEIGHT - MARGIN - row_height(header_lines)).max(1);

        self.ensure(row_height(header_lines) + ROW_HEIGHT);
        self.row_segment(&table.widths, &header, 0, header_lines, BOLD, |_| Some(HEADER_FILL));

        for row in &table.rows {
            let cells = wrap_cells(&table.widths, &row.cells);
            let total = line_count(&cells);
            let mut start = 0;

            while start < total {
                let pending = total - start;
                let here = Self::lines_fitting_at(self.cursor);
                if here < pending.min(fresh_page_lines) {
                    self.page_break();
                    self.row_segment(&table.widths, &header, 0, header_lines, BOLD, |_| {
                        Some(HEADER_FILL)
                    });
                    continue;
                }

                let take = pending.min(here.max(1));
                self.row_segment(&table.widths, &cells, start, take, REGULAR, |column| {
                    (row.highlight == Some(column)).then_some(OFFER_FILL)
                });
                start += take;
            }
        }

        self.gap(10.0);
    }

    /// Draws lines `start..start + count` of every cell as one bordered row.
    fn row_segment<F>(
        &mut self,
        widths: &[f32],
        cells: &[Vec<String>],
        start: usize,
        count: usize,
        font: &str,
        fill: F,
    ) where
        F: Fn(usize) -> Option<[f32; 3]>,
    {
        let height = row_height(count);
        let top = self.cursor;
        let bottom = top - height;
        let mut x = MARGIN;

        for (column, (width, lines)) in widths.iter().zip(cells).enumerate() {
            if let Some(color) = fill(column) {
                self.current.extend(fill_operations(x, bottom, *width, height, color));
            }
            self.current.extend(stroke_operations(x, bottom, *width, height));

            for (offset, line) in lines.iter().skip(start).take(count).enumerate() {
                let baseline = top - (ROW_HEIGHT - ROW_PADDING) - LINE_HEIGHT * offset as f32;
                self.current.extend(text_operations(
                    font,
                    BODY_SIZE,
                    x + CELL_PADDING,
                    baseline,
                    line,
                ));
            }
            x += width;
        }

        self.cursor = bottom;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
        }
        self.pages
    }
}

fn text_operations(font: &str, size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_text(text))]),
        Operation::new("ET", vec![]),
    ]
}

fn fill_operations(x: f32, y: f32, width: f32, height: f32, [r, g, b]: [f32; 3]) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn stroke_operations(x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("w", vec![0.5f32.into()]),
        Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

fn row_height(lines: usize) -> f32 {
    (ROW_PADDING + LINE_HEIGHT * lines as f32).max(ROW_HEIGHT)
}

fn wrap_cells(widths: &[f32], cells: &[String]) -> Vec<Vec<String>> {
    widths
        .iter()
        .zip(cells)
        .map(|(width, text)| wrap_text(text, width - 2.0 * CELL_PADDING, BODY_SIZE))
        .collect()
}

fn line_count(cells: &[Vec<String>]) -> usize {
    cells.iter().map(Vec::len).max().unwrap_or(0).max(1)
}

/// Greedy word wrap by estimated width. Words longer than a line are split,
/// so no text is ever dropped.
fn wrap_text(text: &str, available: f32, size: f32) -> Vec<String> {
    let max_chars = ((available / (size * GLYPH_RATIO)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            lines.push(chars.drain(..max_chars).collect());
        }
        if chars.is_empty() {
            continue;
        }

        if current_len > 0 && current_len + 1 + chars.len() > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += chars.len();
        current.extend(chars);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Maps text onto the single-byte WinAnsi range of the standard fonts.
fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{20B9}' => bytes.extend_from_slice(b"Rs."),
            '\u{2192}' => bytes.extend_from_slice(b"->"),
            '\u{2013}' | '\u{2014}' => bytes.push(b'-'),
            '\u{2018}' | '\u{2019}' => bytes.push(b'\''),
            '\u{201C}' | '\u{201D}' => bytes.push(b'"'),
            other => bytes.push(match u32::from(other) {
                code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
                _ => b'?',
            }),
        }
    }
    bytes
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn render_error(err: impl Display) -> ReportError {
    ReportError::Document(err.to_string())
}

fn assemble(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font_dictionary("Helvetica"));
    let bold_id = doc.add_object(font_dictionary("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let total = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (index, mut operations) in pages.into_iter().enumerate() {
        let footer = format!("Page {} of {}", index + 1, total);
        operations.extend(text_operations(
            REGULAR,
            FOOTER_SIZE,
            PAGE_WIDTH / 2.0 - 24.0,
            MARGIN / 2.0,
            &footer,
        ));

        let encoded = Content { operations }.encode().map_err(render_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let media_box: Vec<Object> = vec![
        Object::Integer(0),
        Object::Integer(0),
        PAGE_WIDTH.into(),
        PAGE_HEIGHT.into(),
    ];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Placement Report"),
        "Producer" => Object::string_literal("placement-tracker"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(render_error)?;
    Ok(buffer)
}
