use super::domain::{RoundReached, Student};
use std::cmp::{Ordering, Reverse};

/// Ordering bucket for a student's progress. Variant order is the rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankBucket {
    Offer,
    Round(Reverse<u32>),
    Other,
}

impl RankBucket {
    pub fn of(reached: &RoundReached) -> Self {
        match reached {
            RoundReached::GotOffer => Self::Offer,
            RoundReached::Round(round) => Self::Round(Reverse(*round)),
            RoundReached::Others | RoundReached::Unrecognized(_) => Self::Other,
        }
    }

    pub const fn priority(self) -> u8 {
        match self {
            Self::Offer => 0,
            Self::Round(_) => 1,
            Self::Other => 2,
        }
    }
}

pub fn priority(reached: &RoundReached) -> u8 {
    RankBucket::of(reached).priority()
}

pub fn compare_students(left: &Student, right: &Student) -> Ordering {
    RankBucket::of(&left.max_round_reached)
        .cmp(&RankBucket::of(&right.max_round_reached))
        .then_with(|| left.name.cmp(&right.name))
}

/// Stable sort, so equal students keep their input order.
pub fn rank_students(students: &mut [&Student]) {
    students.sort_by(|left, right| compare_students(left, right));
}

pub fn ranked<'a, I>(students: I) -> Vec<&'a Student>
where
    I: IntoIterator<Item = &'a Student>,
{
    let mut ranked: Vec<&Student> = students.into_iter().collect();
    rank_students(&mut ranked);
    ranked
}
