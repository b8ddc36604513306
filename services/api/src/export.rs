use chrono::{Local, NaiveDateTime};
use clap::Args;
use placement_tracker::error::AppError;
use placement_tracker::placement::{
    build_report, PlacementAggregate, PlacementSnapshot, ReportFormat, SnapshotImporter,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Companies CSV export
    #[arg(long)]
    pub(crate) companies: PathBuf,
    /// Students CSV export
    #[arg(long)]
    pub(crate) students: PathBuf,
    /// Output encoding: `excel` or `pdf`
    #[arg(long, value_parser = parse_format)]
    pub(crate) format: ReportFormat,
    /// Directory the report is written to
    #[arg(long, default_value = ".")]
    pub(crate) out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    /// Companies CSV export
    #[arg(long)]
    pub(crate) companies: PathBuf,
    /// Students CSV export
    #[arg(long)]
    pub(crate) students: PathBuf,
}

fn parse_format(raw: &str) -> Result<ReportFormat, String> {
    raw.parse::<ReportFormat>().map_err(|err| err.to_string())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let snapshot = SnapshotImporter::from_paths(&args.companies, &args.students)?;
    let path = write_report(
        &snapshot,
        args.format,
        &args.out_dir,
        Local::now().naive_local(),
    )?;
    println!("Report written to {}", path.display());
    Ok(())
}

pub(crate) fn write_report(
    snapshot: &PlacementSnapshot,
    format: ReportFormat,
    out_dir: &Path,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, AppError> {
    let artifact = build_report(format, &snapshot.companies, &snapshot.students, generated_at)?;

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&artifact.file_name);
    std::fs::write(&path, &artifact.bytes)?;

    info!(path = %path.display(), bytes = artifact.bytes.len(), "report saved");
    Ok(path)
}

pub(crate) fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let snapshot = SnapshotImporter::from_paths(&args.companies, &args.students)?;
    print!("{}", render_summary(&snapshot));
    Ok(())
}

pub(crate) fn render_summary(snapshot: &PlacementSnapshot) -> String {
    let aggregate = PlacementAggregate::build(&snapshot.companies, &snapshot.students);
    let mut out = String::new();

    out.push_str("Placement summary\n");
    out.push_str(&format!("  Companies: {}\n", aggregate.company_count()));
    out.push_str(&format!("  Unique students: {}\n", aggregate.unique_students));
    out.push_str(&format!("  Total offers: {}\n", aggregate.total_offers));
    out.push_str(&format!(
        "  Unique students with offers: {}\n",
        aggregate.unique_offers()
    ));

    for entry in &aggregate.companies {
        out.push_str(&format!(
            "\n{} ({}, bond {} years)\n",
            entry.company.name, entry.company.ctc_offer, entry.company.agreement_years
        ));
        out.push_str(&format!(
            "  Students: {}, offers: {}\n",
            entry.total_students(),
            entry.offer_count
        ));
        out.push_str(&format!("  Rounds: {}\n", entry.round_summary()));
        for student in &entry.students {
            out.push_str(&format!(
                "  - {} [{}] {}\n",
                student.name,
                student.student_number,
                entry.company.progress_label(&student.max_round_reached)
            ));
        }
    }

    if !aggregate.unique_offer_holders.is_empty() {
        out.push_str("\nOffer holders\n");
        for holder in &aggregate.unique_offer_holders {
            out.push_str(&format!(
                "- {} [{}] {}\n",
                holder.student.name, holder.student.student_number, holder.company_name
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn snapshot() -> PlacementSnapshot {
        SnapshotImporter::from_readers(
            Cursor::new("id,name,hiring_flow,ctc_offer,agreement_years\n1,Acme,\"Test,Interview\",8 LPA,2\n"),
            Cursor::new(
                "id,company_id,name,student_number,max_round_reached\n1,1,Bob,S1,Round 1\n2,1,Amy,S2,Got Offer\n",
            ),
        )
        .expect("snapshot parses")
    }

    #[test]
    fn summary_lists_ranked_students() {
        let text = render_summary(&snapshot());
        assert!(text.contains("Unique students: 2"));
        assert!(text.contains("Rounds: Test: 1"));

        let amy = text.find("- Amy [S2] Got Offer").expect("Amy listed");
        let bob = text.find("- Bob [S1] Test").expect("Bob listed");
        assert!(amy < bob);
    }

    #[test]
    fn report_is_written_under_generated_name() {
        let out_dir = std::env::temp_dir().join(format!("placement-report-{}", std::process::id()));
        let generated_at = NaiveDate::from_ymd_opt(2026, 2, 3)
            .and_then(|date| date.and_hms_opt(4, 5, 6))
            .expect("valid timestamp");

        let path = write_report(&snapshot(), ReportFormat::Pdf, &out_dir, generated_at)
            .expect("report written");
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("placement_report_20260203_040506.pdf")
        );
        let bytes = std::fs::read(&path).expect("read report");
        assert!(bytes.starts_with(b"%PDF"));

        let _ = std::fs::remove_dir_all(out_dir);
    }

    #[test]
    fn format_flag_accepts_exact_literals() {
        assert_eq!(parse_format("excel"), Ok(ReportFormat::Excel));
        assert!(parse_format("Excel").is_err());
    }
}
