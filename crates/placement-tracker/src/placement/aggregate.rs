use super::domain::{Company, CompanyId, RoundReached, Student};
use super::ranking;
use std::collections::{HashMap, HashSet};

pub const NO_ROUND_DATA: &str = "No round data";
pub const UNKNOWN_COMPANY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundCount {
    pub round: u32,
    pub label: String,
    pub count: usize,
}

/// One company with its students ranked and per-round counts derived.
#[derive(Debug, Clone)]
pub struct CompanyAggregate<'a> {
    pub company: &'a Company,
    pub students: Vec<&'a Student>,
    pub offer_count: usize,
    /// Declared rounds with at least one student, in declaration order.
    pub round_counts: Vec<RoundCount>,
}

impl<'a> CompanyAggregate<'a> {
    pub fn build(company: &'a Company, students: Vec<&'a Student>) -> Self {
        let offer_count = students.iter().filter(|student| student.has_offer()).count();

        let round_counts = company
            .rounds()
            .filter_map(|(round, label)| {
                let reached = RoundReached::Round(round);
                let count = students
                    .iter()
                    .filter(|student| student.max_round_reached == reached)
                    .count();
                (count > 0).then(|| RoundCount {
                    round,
                    label: label.to_string(),
                    count,
                })
            })
            .collect();

        let mut students = students;
        ranking::rank_students(&mut students);

        Self {
            company,
            students,
            offer_count,
            round_counts,
        }
    }

    pub fn total_students(&self) -> usize {
        self.students.len()
    }

    /// `"Aptitude: 2; Coding: 1"`, or [`NO_ROUND_DATA`] when no round has students.
    pub fn round_summary(&self) -> String {
        if self.round_counts.is_empty() {
            return NO_ROUND_DATA.to_string();
        }

        self.round_counts
            .iter()
            .map(|entry| format!("{}: {}", entry.label, entry.count))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OfferHolder<'a> {
    pub student: &'a Student,
    pub company_name: &'a str,
}

/// Everything both report encodings need, computed once per snapshot.
#[derive(Debug, Clone)]
pub struct PlacementAggregate<'a> {
    pub companies: Vec<CompanyAggregate<'a>>,
    pub unique_students: usize,
    pub total_offers: usize,
    /// Every offer-holding record, ranked by name.
    pub offer_holders: Vec<OfferHolder<'a>>,
    /// First offer record per student number, sorted by name.
    pub unique_offer_holders: Vec<OfferHolder<'a>>,
}

impl<'a> PlacementAggregate<'a> {
    pub fn build(companies: &'a [Company], students: &'a [Student]) -> Self {
        let mut by_company: HashMap<CompanyId, Vec<&'a Student>> = HashMap::new();
        for student in students {
            by_company.entry(student.company_id).or_default().push(student);
        }

        let company_aggregates = companies
            .iter()
            .map(|company| {
                let members = by_company.remove(&company.id).unwrap_or_default();
                CompanyAggregate::build(company, members)
            })
            .collect();

        let names: HashMap<CompanyId, &'a str> = companies
            .iter()
            .map(|company| (company.id, company.name.as_str()))
            .collect();
        let holder = |student: &'a Student| OfferHolder {
            student,
            company_name: names
                .get(&student.company_id)
                .copied()
                .unwrap_or(UNKNOWN_COMPANY),
        };

        let unique_students = students
            .iter()
            .map(|student| student.student_number.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut offer_holders: Vec<OfferHolder<'a>> = students
            .iter()
            .filter(|student| student.has_offer())
            .map(holder)
            .collect();

        let mut seen = HashSet::new();
        let mut unique_offer_holders: Vec<OfferHolder<'a>> = offer_holders
            .iter()
            .copied()
            .filter(|entry| seen.insert(entry.student.student_number.as_str()))
            .collect();

        let total_offers = offer_holders.len();
        offer_holders.sort_by(|left, right| left.student.name.cmp(&right.student.name));
        unique_offer_holders.sort_by(|left, right| left.student.name.cmp(&right.student.name));

        Self {
            companies: company_aggregates,
            unique_students,
            total_offers,
            offer_holders,
            unique_offer_holders,
        }
    }

    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    pub fn unique_offers(&self) -> usize {
        self.unique_offer_holders.len()
    }

    pub fn company_names(&self) -> String {
        self.companies
            .iter()
            .map(|entry| entry.company.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::domain::StudentId;
    use chrono::Utc;

    fn company(id: i64, name: &str, rounds: &[&str]) -> Company {
        Company {
            id: CompanyId(id),
            name: name.to_string(),
            hiring_rounds: rounds.iter().map(|round| round.to_string()).collect(),
            ctc_offer: "6 LPA".to_string(),
            agreement_years: 1,
            logo_url: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn student(id: i64, company: i64, number: &str, name: &str, reached: &str) -> Student {
        Student {
            id: StudentId(id),
            company_id: CompanyId(company),
            name: name.to_string(),
            student_number: number.to_string(),
            email: None,
            linkedin_id: None,
            max_round_reached: RoundReached::parse(reached),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn round_counts_skip_empty_rounds() {
        let companies = vec![company(1, "Initech", &["Aptitude", "Coding", "HR"])];
        let students = vec![
            student(1, 1, "S1", "A", "Round 1"),
            student(2, 1, "S2", "B", "Round 1"),
            student(3, 1, "S3", "C", "Round 2"),
            student(4, 1, "S4", "D", "Got Offer"),
        ];

        let aggregate = PlacementAggregate::build(&companies, &students);
        let initech = &aggregate.companies[0];
        assert_eq!(initech.round_summary(), "Aptitude: 2; Coding: 1");
        assert_eq!(initech.offer_count, 1);
        assert_eq!(initech.total_students(), 4);
        assert!(initech.round_counts.iter().all(|entry| entry.label != "HR"));
    }

    #[test]
    fn company_without_round_matches_reports_no_round_data() {
        let companies = vec![company(1, "Hooli", &["Test"])];
        let students = vec![
            student(1, 1, "S1", "A", "Others"),
            student(2, 1, "S2", "B", "Round 4"),
        ];

        let aggregate = PlacementAggregate::build(&companies, &students);
        assert_eq!(aggregate.companies[0].round_summary(), NO_ROUND_DATA);
    }

    #[test]
    fn offers_deduplicate_by_student_number_keeping_first_record() {
        let companies = vec![
            company(1, "Acme", &["Test"]),
            company(2, "Globex", &["Test"]),
            company(3, "Umbrella", &["Test"]),
        ];
        let students = vec![
            student(1, 2, "S9", "Zed", "Got Offer"),
            student(2, 1, "S9", "Zed", "Got Offer"),
            student(3, 3, "S9", "Zed", "Got Offer"),
            student(4, 1, "S1", "Amy", "Got Offer"),
            student(5, 3, "S2", "Bo", "Round 1"),
        ];

        let aggregate = PlacementAggregate::build(&companies, &students);
        assert_eq!(aggregate.total_offers, 4);
        assert_eq!(aggregate.unique_offers(), 2);
        assert_eq!(aggregate.unique_students, 3);

        let zed: Vec<_> = aggregate
            .unique_offer_holders
            .iter()
            .filter(|entry| entry.student.student_number == "S9")
            .collect();
        assert_eq!(zed.len(), 1);
        assert_eq!(zed[0].company_name, "Globex");
        assert_eq!(aggregate.unique_offer_holders[0].student.name, "Amy");
    }

    #[test]
    fn scenario_single_company_ranks_offer_first() {
        let companies = vec![company(1, "Acme", &["Test", "Interview"])];
        let students = vec![
            student(1, 1, "S1", "Bob", "Round 1"),
            student(2, 1, "S2", "Amy", "Got Offer"),
        ];

        let aggregate = PlacementAggregate::build(&companies, &students);
        let ranked: Vec<&str> = aggregate.companies[0]
            .students
            .iter()
            .map(|student| student.name.as_str())
            .collect();
        assert_eq!(ranked, vec!["Amy", "Bob"]);
        assert_eq!(aggregate.unique_students, 2);
        assert_eq!(aggregate.total_offers, 1);
        assert_eq!(aggregate.company_names(), "Acme");
    }

    #[test]
    fn orphaned_offer_is_attributed_to_unknown_company() {
        let companies = vec![company(1, "Acme", &["Test"])];
        let students = vec![student(1, 42, "S1", "Amy", "Got Offer")];

        let aggregate = PlacementAggregate::build(&companies, &students);
        assert_eq!(aggregate.companies[0].total_students(), 0);
        assert_eq!(aggregate.offer_holders[0].company_name, UNKNOWN_COMPANY);
    }
}
