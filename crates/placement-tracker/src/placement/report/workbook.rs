use super::super::aggregate::{CompanyAggregate, OfferHolder, PlacementAggregate};
use super::super::domain::{Company, Student};
use super::ReportError;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;

const SHEET_NAME_LIMIT: usize = 31;
const SUMMARY_SHEET: &str = "Summary";
const COMPANY_DETAILS_SHEET: &str = "Company Details";
const ALL_OFFERS_SHEET: &str = "All Offers";
const UNIQUE_OFFERS_SHEET: &str = "Unique Offers";

const STUDENT_HEADERS: [&str; 4] = ["Name", "Student Number", "Email", "Round Reached"];
const OFFER_HEADERS: [&str; 4] = ["Name", "Student Number", "Email", "Company"];

pub fn build_workbook(companies: &[Company], students: &[Student]) -> Result<Vec<u8>, ReportError> {
    render(&PlacementAggregate::build(companies, students))
}

pub(super) fn render(aggregate: &PlacementAggregate<'_>) -> Result<Vec<u8>, ReportError> {
    let styles = Styles::new();
    let mut names = SheetNames::default();
    for fixed in [
        SUMMARY_SHEET,
        COMPANY_DETAILS_SHEET,
        ALL_OFFERS_SHEET,
        UNIQUE_OFFERS_SHEET,
    ] {
        names.claim(fixed);
    }

    let mut workbook = Workbook::new();

    write_summary(workbook.add_worksheet(), aggregate, &styles)?;
    write_company_details(workbook.add_worksheet(), aggregate, &styles)?;
    for entry in &aggregate.companies {
        let sheet_name = names.for_company(entry.company);
        write_company_students(workbook.add_worksheet(), &sheet_name, entry, &styles)?;
    }
    write_offer_holders(
        workbook.add_worksheet(),
        ALL_OFFERS_SHEET,
        &aggregate.offer_holders,
        &styles,
    )?;
    write_offer_holders(
        workbook.add_worksheet(),
        UNIQUE_OFFERS_SHEET,
        &aggregate.unique_offer_holders,
        &styles,
    )?;

    Ok(workbook.save_to_buffer()?)
}

struct Styles {
    header: Format,
    offer: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x1F4E78))
                .set_border(FormatBorder::Thin),
            offer: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(0x006100))
                .set_background_color(Color::RGB(0xC6EFCE)),
        }
    }
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], styles: &Styles) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &styles.header)?;
    }
    Ok(())
}

fn write_summary(
    sheet: &mut Worksheet,
    aggregate: &PlacementAggregate<'_>,
    styles: &Styles,
) -> Result<(), XlsxError> {
    sheet.set_name(SUMMARY_SHEET)?;
    write_header(sheet, &["Metric", "Value"], styles)?;

    let counts = [
        ("Total Companies", aggregate.company_count()),
        ("Unique Students", aggregate.unique_students),
        ("Total Offers", aggregate.total_offers),
        ("Unique Students with Offers", aggregate.unique_offers()),
    ];

    sheet.write_string(1, 0, counts[0].0)?;
    sheet.write_number(1, 1, counts[0].1 as f64)?;
    sheet.write_string(2, 0, "Companies")?;
    sheet.write_string(2, 1, aggregate.company_names())?;
    for (offset, (label, value)) in counts.iter().skip(1).enumerate() {
        let row = 3 + offset as u32;
        sheet.write_string(row, 0, *label)?;
        sheet.write_number(row, 1, *value as f64)?;
    }

    sheet.autofit();
    Ok(())
}

fn write_company_details(
    sheet: &mut Worksheet,
    aggregate: &PlacementAggregate<'_>,
    styles: &Styles,
) -> Result<(), XlsxError> {
    sheet.set_name(COMPANY_DETAILS_SHEET)?;
    write_header(
        sheet,
        &["Company", "CTC Offer", "Bond (Years)", "Round Breakdown", "Offers"],
        styles,
    )?;

    for (index, entry) in aggregate.companies.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &entry.company.name)?;
        sheet.write_string(row, 1, &entry.company.ctc_offer)?;
        sheet.write_number(row, 2, entry.company.agreement_years)?;
        sheet.write_string(row, 3, entry.round_summary())?;
        sheet.write_number(row, 4, entry.offer_count as f64)?;
    }

    sheet.autofit();
    Ok(())
}

fn write_company_students(
    sheet: &mut Worksheet,
    sheet_name: &str,
    entry: &CompanyAggregate<'_>,
    styles: &Styles,
) -> Result<(), XlsxError> {
    sheet.set_name(sheet_name)?;
    write_header(sheet, &STUDENT_HEADERS, styles)?;

    if entry.students.is_empty() {
        sheet.write_string(1, 0, "No students recorded")?;
    }

    for (index, student) in entry.students.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &student.name)?;
        sheet.write_string(row, 1, &student.student_number)?;
        sheet.write_string(row, 2, student.email_or_placeholder())?;

        let progress = entry.company.progress_label(&student.max_round_reached);
        if student.has_offer() {
            sheet.write_string_with_format(row, 3, progress, &styles.offer)?;
        } else {
            sheet.write_string(row, 3, progress)?;
        }
    }

    sheet.autofit();
    Ok(())
}

fn write_offer_holders(
    sheet: &mut Worksheet,
    sheet_name: &str,
    holders: &[OfferHolder<'_>],
    styles: &Styles,
) -> Result<(), XlsxError> {
    sheet.set_name(sheet_name)?;
    write_header(sheet, &OFFER_HEADERS, styles)?;

    for (index, holder) in holders.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &holder.student.name)?;
        sheet.write_string(row, 1, &holder.student.student_number)?;
        sheet.write_string(row, 2, holder.student.email_or_placeholder())?;
        sheet.write_string(row, 3, holder.company_name)?;
    }

    sheet.autofit();
    Ok(())
}

/// Excel sheet names: at most 31 chars, no `[]:*?/\`, unique ignoring case.
#[derive(Debug, Default)]
struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    fn claim(&mut self, name: &str) {
        self.used.insert(name.to_lowercase());
    }

    fn for_company(&mut self, company: &Company) -> String {
        let sanitized = sanitize_sheet_name(&company.name);
        let base = if sanitized.is_empty() {
            format!("Company {}", company.id)
        } else {
            sanitized
        };

        let mut candidate = truncate_chars(&base, SHEET_NAME_LIMIT);
        if candidate.is_empty() {
            candidate = format!("Company {}", company.id);
        }
        let mut suffix = 2;
        while self.used.contains(&candidate.to_lowercase()) {
            let tag = format!(" ({suffix})");
            candidate = format!(
                "{}{}",
                truncate_chars(&base, SHEET_NAME_LIMIT - tag.len()),
                tag
            );
            suffix += 1;
        }

        self.claim(&candidate);
        candidate
    }
}

fn sanitize_sheet_name(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect::<String>()
        .trim_matches(is_sheet_edge)
        .to_string()
}

/// Excel rejects names that start or end with an apostrophe.
fn is_sheet_edge(ch: char) -> bool {
    ch == '\'' || ch.is_whitespace()
}

/// Cuts to `limit` chars, then drops any apostrophe or space the cut exposed.
fn truncate_chars(value: &str, limit: usize) -> String {
    value
        .chars()
        .take(limit)
        .collect::<String>()
        .trim_end_matches(is_sheet_edge)
        .to_string()
}
