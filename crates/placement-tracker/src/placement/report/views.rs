use super::super::aggregate::{CompanyAggregate, OfferHolder, PlacementAggregate, RoundCount};
use super::super::domain::{CompanyId, Student, StudentId};
use super::super::ranking;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RoundCountView {
    pub round: u32,
    pub label: String,
    pub count: usize,
}

impl From<&RoundCount> for RoundCountView {
    fn from(entry: &RoundCount) -> Self {
        Self {
            round: entry.round,
            label: entry.label.clone(),
            count: entry.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedStudentView {
    pub id: StudentId,
    pub name: String,
    pub student_number: String,
    pub email: String,
    pub linkedin_id: String,
    pub max_round_reached: String,
    pub progress_label: String,
    pub priority: u8,
    pub got_offer: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyMetricsView {
    pub company_id: CompanyId,
    pub name: String,
    pub ctc_offer: String,
    pub agreement_years: u32,
    pub total_students: usize,
    pub offer_count: usize,
    pub round_summary: String,
    pub round_counts: Vec<RoundCountView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferHolderView {
    pub name: String,
    pub student_number: String,
    pub email: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementSummaryView {
    pub company_count: usize,
    pub company_names: Vec<String>,
    pub unique_students: usize,
    pub total_offers: usize,
    pub unique_offers: usize,
    pub companies: Vec<CompanyMetricsView>,
    pub offer_holders: Vec<OfferHolderView>,
    pub unique_offer_holders: Vec<OfferHolderView>,
}

impl CompanyAggregate<'_> {
    pub fn ranked_views(&self) -> Vec<RankedStudentView> {
        self.students
            .iter()
            .map(|student| ranked_view(self, student))
            .collect()
    }

    pub fn metrics_view(&self) -> CompanyMetricsView {
        CompanyMetricsView {
            company_id: self.company.id,
            name: self.company.name.clone(),
            ctc_offer: self.company.ctc_offer.clone(),
            agreement_years: self.company.agreement_years,
            total_students: self.total_students(),
            offer_count: self.offer_count,
            round_summary: self.round_summary(),
            round_counts: self.round_counts.iter().map(RoundCountView::from).collect(),
        }
    }
}

fn ranked_view(aggregate: &CompanyAggregate<'_>, student: &Student) -> RankedStudentView {
    RankedStudentView {
        id: student.id,
        name: student.name.clone(),
        student_number: student.student_number.clone(),
        email: student.email_or_placeholder().to_string(),
        linkedin_id: student.profile_or_placeholder().to_string(),
        max_round_reached: student.max_round_reached.to_string(),
        progress_label: aggregate.company.progress_label(&student.max_round_reached),
        priority: ranking::priority(&student.max_round_reached),
        got_offer: student.has_offer(),
    }
}

impl OfferHolder<'_> {
    pub fn to_view(&self) -> OfferHolderView {
        OfferHolderView {
            name: self.student.name.clone(),
            student_number: self.student.student_number.clone(),
            email: self.student.email_or_placeholder().to_string(),
            company_name: self.company_name.to_string(),
        }
    }
}

impl PlacementAggregate<'_> {
    pub fn summary(&self) -> PlacementSummaryView {
        PlacementSummaryView {
            company_count: self.company_count(),
            company_names: self
                .companies
                .iter()
                .map(|entry| entry.company.name.clone())
                .collect(),
            unique_students: self.unique_students,
            total_offers: self.total_offers,
            unique_offers: self.unique_offers(),
            companies: self
                .companies
                .iter()
                .map(CompanyAggregate::metrics_view)
                .collect(),
            offer_holders: self.offer_holders.iter().map(OfferHolder::to_view).collect(),
            unique_offer_holders: self
                .unique_offer_holders
                .iter()
                .map(OfferHolder::to_view)
                .collect(),
        }
    }
}
