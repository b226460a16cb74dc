//! Activity totals
//!
//! Pure aggregation over loaded rows, shared by the member dashboard and the
//! council-wide admin report. Quantity-only labels contribute to their own
//! label total but never to volunteer-hour totals.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{self, Section};
use crate::models::activity::Activity;
use crate::models::member::Member;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub hours: f64,
    pub amount: f64,
}

impl Totals {
    /// Nothing reported: no positive hours and no positive amount
    pub fn is_empty(&self) -> bool {
        self.hours <= 0.0 && self.amount <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelTotal {
    pub label: &'static str,
    pub quantity_only: bool,
    pub hours: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionTotals {
    pub section: Section,
    pub labels: Vec<LabelTotal>,
}

/// Sums activities per label and lays them out in catalog order
///
/// Every catalog label is present, zero when no row exists. Rows with
/// labels outside the catalog are ignored.
pub fn label_totals(activities: &[Activity]) -> Vec<SectionTotals> {
    let mut sums: HashMap<&str, Totals> = HashMap::new();
    for activity in activities {
        let entry = sums.entry(activity.category.as_str()).or_default();
        entry.hours += activity.hours;
        entry.amount += activity.amount;
    }

    Section::ALL
        .into_iter()
        .map(|section| SectionTotals {
            section,
            labels: section
                .labels()
                .iter()
                .map(|&label| {
                    let totals = sums.get(label).copied().unwrap_or_default();
                    LabelTotal {
                        label,
                        quantity_only: catalog::is_quantity_only(label),
                        hours: totals.hours,
                        amount: totals.amount,
                    }
                })
                .collect(),
        })
        .collect()
}

/// Volunteer hours (quantity-only labels excluded) and donated amount
pub fn volunteer_totals<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> Totals {
    activities
        .into_iter()
        .fold(Totals::default(), |mut totals, activity| {
            if !catalog::is_quantity_only(&activity.category) {
                totals.hours += activity.hours;
            }
            totals.amount += activity.amount;
            totals
        })
}

/// A member's own dashboard
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub member: Member,
    pub total_hours: f64,
    pub total_amount: f64,
    pub sections: Vec<SectionTotals>,
}

impl Dashboard {
    pub fn build(member: Member, activities: &[Activity]) -> Self {
        let totals = volunteer_totals(activities);
        Self {
            member,
            total_hours: totals.hours,
            total_amount: totals.amount,
            sections: label_totals(activities),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    pub id: i64,
    pub member_number: String,
    pub name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub hours: f64,
    pub amount: f64,
    pub reported: bool,
}

/// Council-wide admin report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouncilReport {
    pub sections: Vec<SectionTotals>,
    /// In the order the members were given
    pub members: Vec<MemberSummary>,
    /// Member numbers of members with nothing reported
    pub not_reported: Vec<String>,
    pub total_hours: f64,
    pub total_amount: f64,
}

impl CouncilReport {
    /// Builds the report from every member and every activity row
    ///
    /// `members` should already be ordered (last name, then first name).
    /// Activities of members missing from `members` count towards label
    /// totals only.
    pub fn build(members: &[Member], activities: &[Activity]) -> Self {
        let mut by_member: HashMap<i64, Vec<&Activity>> = HashMap::new();
        for activity in activities {
            by_member.entry(activity.member_id).or_default().push(activity);
        }

        let summaries: Vec<MemberSummary> = members
            .iter()
            .map(|member| {
                let totals = by_member
                    .get(&member.id)
                    .map(|rows| volunteer_totals(rows.iter().copied()))
                    .unwrap_or_default();

                MemberSummary {
                    id: member.id,
                    member_number: member.member_number.clone(),
                    name: member.display_name(),
                    email: member.email.clone(),
                    is_admin: member.is_admin,
                    hours: totals.hours,
                    amount: totals.amount,
                    reported: !totals.is_empty(),
                }
            })
            .collect();

        let not_reported = summaries
            .iter()
            .filter(|summary| !summary.reported)
            .map(|summary| summary.member_number.clone())
            .collect();

        Self {
            sections: label_totals(activities),
            total_hours: summaries.iter().map(|s| s.hours).sum(),
            total_amount: summaries.iter().map(|s| s.amount).sum(),
            members: summaries,
            not_reported,
        }
    }
}
