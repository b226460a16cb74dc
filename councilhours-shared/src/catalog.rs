//! Activity catalog
//!
//! The fixed list of reportable programs from the council's annual service
//! report, grouped into five sections. Activities are stored against the exact
//! label text, so labels here must never be reworded once data exists.
//!
//! Four labels in the `Other` section record counts (visits, donations,
//! masses) rather than hours. Their value still lives in the activity's
//! `hours` column but is excluded from volunteer-hour totals.

use serde::{Deserialize, Serialize};

/// Catalog section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Faith,
    Family,
    Community,
    Life,
    Other,
}

impl Section {
    /// Sections in display order
    pub const ALL: [Section; 5] = [
        Section::Faith,
        Section::Family,
        Section::Community,
        Section::Life,
        Section::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Faith => "Faith",
            Section::Family => "Family",
            Section::Community => "Community",
            Section::Life => "Life",
            Section::Other => "Other",
        }
    }

    /// Labels belonging to this section, in form order
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Section::Faith => FAITH_ACTIVITIES,
            Section::Family => FAMILY_ACTIVITIES,
            Section::Community => COMMUNITY_ACTIVITIES,
            Section::Life => LIFE_ACTIVITIES,
            Section::Other => OTHER_QUANTITATIVE,
        }
    }
}

pub const FAITH_ACTIVITIES: &[&str] = &[
    "Refund Support Vocations Program",
    "Church Facilities",
    "Catholic Schools/Seminaries",
    "Religious/Vocations Education",
    "Prayer & Study Programs",
    "Sacramental Gifts",
    "Miscellaneous Faith Activities",
];

pub const FAMILY_ACTIVITIES: &[&str] = &[
    "Food for Families",
    "Family Formation Programs",
    "Keep Christ in Christmas",
    "Family Week",
    "Family Prayer Night",
    "Miscellaneous Family Programs",
];

pub const COMMUNITY_ACTIVITIES: &[&str] = &[
    "Coats For Kids",
    "Global Wheelchair Mission",
    "Habitat for Humanity",
    "Disaster Preparedness/Relief",
    "Physically Disabled/Intellectual Disabilities",
    "Elderly/Widow(er) Care",
    "Hospitals/Health Organizations",
    "Columbian Squires",
    "Scouting/Youth Groups",
    "Athletics",
    "Youth Welfare/Service",
    "Scholarships/Education",
    "Veteran Military/VAVS",
    "Miscellaneous Community/Youth Activities",
];

pub const LIFE_ACTIVITIES: &[&str] = &[
    "Special Olympics",
    "Marches for Life",
    "Ultrasound Initiative",
    "Pregnancy Center Support",
    "Christian Refugee Relief",
    "Memorials to Unborn Children",
    "Miscellaneous Life Activities",
];

pub const OTHER_QUANTITATIVE: &[&str] = &[
    "Visits to the Sick",
    "Visits to the Bereaved",
    "Number of Blood Donations",
    "Masses Held for Members",
    "Hours of Fraternal Service to Sick/Disabled Members and their Families",
];

/// Labels whose value is a count, not volunteer hours
pub const QUANTITY_ONLY: &[&str] = &[
    "Visits to the Sick",
    "Visits to the Bereaved",
    "Number of Blood Donations",
    "Masses Held for Members",
];

/// True for labels whose `hours` value is a count
pub fn is_quantity_only(label: &str) -> bool {
    QUANTITY_ONLY.contains(&label)
}

/// Section a label belongs to, if it is in the catalog
pub fn section_of(label: &str) -> Option<Section> {
    Section::ALL
        .into_iter()
        .find(|section| section.labels().contains(&label))
}

/// True when `label` is an exact catalog label
pub fn is_known(label: &str) -> bool {
    section_of(label).is_some()
}

/// Every label, section by section
pub fn all_labels() -> impl Iterator<Item = &'static str> {
    Section::ALL
        .into_iter()
        .flat_map(|section| section.labels().iter().copied())
}

/// Serializable view of the catalog for clients
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSection {
    pub section: Section,
    pub labels: Vec<CatalogLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogLabel {
    pub label: &'static str,
    pub quantity_only: bool,
}

pub fn describe() -> Vec<CatalogSection> {
    Section::ALL
        .into_iter()
        .map(|section| CatalogSection {
            section,
            labels: section
                .labels()
                .iter()
                .map(|&label| CatalogLabel {
                    label,
                    quantity_only: is_quantity_only(label),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_section_sizes() {
        assert_eq!(FAITH_ACTIVITIES.len(), 7);
        assert_eq!(FAMILY_ACTIVITIES.len(), 6);
        assert_eq!(COMMUNITY_ACTIVITIES.len(), 14);
        assert_eq!(LIFE_ACTIVITIES.len(), 7);
        assert_eq!(OTHER_QUANTITATIVE.len(), 5);
        assert_eq!(all_labels().count(), 39);
    }

    #[test]
    fn test_labels_are_unique() {
        let labels: HashSet<_> = all_labels().collect();
        assert_eq!(labels.len(), all_labels().count());
    }

    #[test]
    fn test_quantity_only_labels_live_in_other() {
        for label in QUANTITY_ONLY {
            assert_eq!(section_of(label), Some(Section::Other));
        }
        assert!(!is_quantity_only(
            "Hours of Fraternal Service to Sick/Disabled Members and their Families"
        ));
        assert!(!is_quantity_only("Coats For Kids"));
    }

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("Coats For Kids"), Some(Section::Community));
        assert_eq!(section_of("Family Week"), Some(Section::Family));
        assert_eq!(section_of("coats for kids"), None);
        assert!(!is_known("Bake Sale"));
    }

    #[test]
    fn test_describe_marks_quantity_labels() {
        let sections = describe();
        assert_eq!(sections.len(), 5);

        let other = sections.last().unwrap();
        assert_eq!(other.section, Section::Other);
        assert_eq!(other.labels.iter().filter(|l| l.quantity_only).count(), 4);
    }
}
