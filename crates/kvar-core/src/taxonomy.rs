//! Closed classification taxonomy: category, priority, and room.
//!
//! Every [`ClassificationResult`](crate::ClassificationResult) field drawn from
//! these sets is a member of its enum. Raw strings from external models are
//! resolved through [`Category::from_synonym`] / [`Room::from_synonym`], which
//! accept casing, diacritic-free spellings and common alternate names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CATEGORY
// =============================================================================

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Voda/Vodovod")]
    Water,
    #[serde(rename = "Struja/Elektrika")]
    Electrical,
    #[serde(rename = "Grijanje/Klima")]
    Heating,
    #[serde(rename = "Stolarija")]
    Carpentry,
    #[serde(rename = "Krovište")]
    Roof,
    #[serde(rename = "Zidovi/Fasada")]
    Walls,
    #[serde(rename = "Podovi")]
    Floors,
    #[serde(rename = "Dizalo")]
    Elevator,
    #[serde(rename = "Sigurnost")]
    Security,
    #[serde(rename = "Čistoća/Štetočine")]
    Hygiene,
    /// Catch-all
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    /// Every member, in display order.
    pub const ALL: [Category; 11] = [
        Self::Water,
        Self::Electrical,
        Self::Heating,
        Self::Carpentry,
        Self::Roof,
        Self::Walls,
        Self::Floors,
        Self::Elevator,
        Self::Security,
        Self::Hygiene,
        Self::Other,
    ];

    /// Canonical wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "Voda/Vodovod",
            Self::Electrical => "Struja/Elektrika",
            Self::Heating => "Grijanje/Klima",
            Self::Carpentry => "Stolarija",
            Self::Roof => "Krovište",
            Self::Walls => "Zidovi/Fasada",
            Self::Floors => "Podovi",
            Self::Elevator => "Dizalo",
            Self::Security => "Sigurnost",
            Self::Hygiene => "Čistoća/Štetočine",
            Self::Other => "Other",
        }
    }

    /// Resolve a raw value through exact, case-folded, and synonym matching.
    pub fn from_synonym(raw: &str) -> Option<Self> {
        if let Ok(category) = raw.parse() {
            return Some(category);
        }
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|c| fold(c.as_str()) == folded)
            .or_else(|| lookup(CATEGORY_SYNONYMS, &folded))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only canonical forms are accepted.
impl FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid category: {}", s))
    }
}

const CATEGORY_SYNONYMS: &[(&str, Category)] = &[
    ("voda", Category::Water),
    ("vodovod", Category::Water),
    ("vodoinstalacije", Category::Water),
    ("water", Category::Water),
    ("plumbing", Category::Water),
    ("struja", Category::Electrical),
    ("elektrika", Category::Electrical),
    ("elektroinstalacije", Category::Electrical),
    ("electrical", Category::Electrical),
    ("electricity", Category::Electrical),
    ("grijanje", Category::Heating),
    ("klima", Category::Heating),
    ("klimatizacija", Category::Heating),
    ("heating", Category::Heating),
    ("hvac", Category::Heating),
    ("vrata", Category::Carpentry),
    ("prozori", Category::Carpentry),
    ("vrata/prozori", Category::Carpentry),
    ("doors", Category::Carpentry),
    ("windows", Category::Carpentry),
    ("doors/windows", Category::Carpentry),
    ("krov", Category::Roof),
    ("roof", Category::Roof),
    ("zidovi", Category::Walls),
    ("zid", Category::Walls),
    ("fasada", Category::Walls),
    ("walls", Category::Walls),
    ("pod", Category::Floors),
    ("floor", Category::Floors),
    ("floors", Category::Floors),
    ("lift", Category::Elevator),
    ("elevator", Category::Elevator),
    ("security", Category::Security),
    ("brave", Category::Security),
    ("locks", Category::Security),
    ("cistoca", Category::Hygiene),
    ("stetocine", Category::Hygiene),
    ("higijena", Category::Hygiene),
    ("cleaning", Category::Hygiene),
    ("pests", Category::Hygiene),
    ("ostalo", Category::Other),
    ("drugo", Category::Other),
];

// =============================================================================
// PRIORITY
// =============================================================================

/// Issue priority, totally ordered by severity (`Low < Medium < High < Urgent`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Every member, least severe first.
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Canonical wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Resolve a raw value through case-folded and synonym matching.
    pub fn from_synonym(raw: &str) -> Option<Self> {
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        folded
            .parse()
            .ok()
            .or_else(|| lookup(PRIORITY_SYNONYMS, &folded))
    }
}

const PRIORITY_SYNONYMS: &[(&str, Priority)] = &[
    ("nisko", Priority::Low),
    ("nizak", Priority::Low),
    ("niska", Priority::Low),
    ("srednje", Priority::Medium),
    ("srednji", Priority::Medium),
    ("srednja", Priority::Medium),
    ("normal", Priority::Medium),
    ("visoko", Priority::High),
    ("visok", Priority::High),
    ("visoka", Priority::High),
    ("hitno", Priority::Urgent),
    ("hitan", Priority::Urgent),
    ("hitna", Priority::Urgent),
    ("critical", Priority::Urgent),
];

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

// =============================================================================
// ROOM
// =============================================================================

/// Room (or common area) where the issue is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    #[serde(rename = "Kuhinja")]
    Kitchen,
    #[serde(rename = "Kupaonica")]
    Bathroom,
    #[serde(rename = "WC")]
    Toilet,
    #[serde(rename = "Dnevni boravak")]
    LivingRoom,
    #[serde(rename = "Spavaća soba")]
    Bedroom,
    #[serde(rename = "Hodnik")]
    Hallway,
    #[serde(rename = "Balkon")]
    Balcony,
    #[serde(rename = "Podrum")]
    Basement,
    #[serde(rename = "Stubište")]
    Stairwell,
    #[serde(rename = "Garaža")]
    Garage,
    /// Catch-all
    #[serde(rename = "Other")]
    Other,
}

impl Room {
    /// Every member, in display order.
    pub const ALL: [Room; 11] = [
        Self::Kitchen,
        Self::Bathroom,
        Self::Toilet,
        Self::LivingRoom,
        Self::Bedroom,
        Self::Hallway,
        Self::Balcony,
        Self::Basement,
        Self::Stairwell,
        Self::Garage,
        Self::Other,
    ];

    /// Canonical wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kitchen => "Kuhinja",
            Self::Bathroom => "Kupaonica",
            Self::Toilet => "WC",
            Self::LivingRoom => "Dnevni boravak",
            Self::Bedroom => "Spavaća soba",
            Self::Hallway => "Hodnik",
            Self::Balcony => "Balkon",
            Self::Basement => "Podrum",
            Self::Stairwell => "Stubište",
            Self::Garage => "Garaža",
            Self::Other => "Other",
        }
    }

    /// Resolve a raw value through exact, case-folded, and synonym matching.
    pub fn from_synonym(raw: &str) -> Option<Self> {
        if let Ok(room) = raw.parse() {
            return Some(room);
        }
        let folded = fold(raw);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|r| fold(r.as_str()) == folded)
            .or_else(|| lookup(ROOM_SYNONYMS, &folded))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only canonical forms are accepted.
impl FromStr for Room {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Invalid room: {}", s))
    }
}

const ROOM_SYNONYMS: &[(&str, Room)] = &[
    ("kitchen", Room::Kitchen),
    ("kupaona", Room::Bathroom),
    ("kupatilo", Room::Bathroom),
    ("bathroom", Room::Bathroom),
    ("toalet", Room::Toilet),
    ("zahod", Room::Toilet),
    ("toilet", Room::Toilet),
    ("dnevna soba", Room::LivingRoom),
    ("boravak", Room::LivingRoom),
    ("living room", Room::LivingRoom),
    ("spavaonica", Room::Bedroom),
    ("soba", Room::Bedroom),
    ("bedroom", Room::Bedroom),
    ("predsoblje", Room::Hallway),
    ("hallway", Room::Hallway),
    ("hall", Room::Hallway),
    ("terasa", Room::Balcony),
    ("loda", Room::Balcony),
    ("balcony", Room::Balcony),
    ("basement", Room::Basement),
    ("cellar", Room::Basement),
    ("stepeniste", Room::Stairwell),
    ("stairs", Room::Stairwell),
    ("stairwell", Room::Stairwell),
    ("garage", Room::Garage),
    ("ostalo", Room::Other),
    ("drugo", Room::Other),
];

// =============================================================================
// VALIDITY
// =============================================================================

/// Whether `x` is exactly a canonical category.
pub fn is_valid_category(x: &str) -> bool {
    x.parse::<Category>().is_ok()
}

/// Whether `x` is exactly a canonical priority.
pub fn is_valid_priority(x: &str) -> bool {
    x.parse::<Priority>().is_ok()
}

/// Whether `x` is exactly a canonical room.
pub fn is_valid_room(x: &str) -> bool {
    x.parse::<Room>().is_ok()
}

/// Lowercase, trim, and strip Croatian diacritics.
///
/// Used for every case-insensitive comparison against the taxonomy and the
/// keyword tables, so "Kupaonica", "kupaonica" and "KUPAONICA" compare equal
/// and "Čistoća" matches "cistoca".
pub fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'č' | 'ć' => 'c',
            'š' => 's',
            'ž' => 'z',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

fn lookup<T: Copy>(table: &[(&str, T)], folded: &str) -> Option<T> {
    table
        .iter()
        .find(|(synonym, _)| *synonym == folded)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_sizes() {
        assert_eq!(Category::ALL.len(), 11);
        assert_eq!(Room::ALL.len(), 11);
        assert_eq!(Priority::ALL.len(), 4);
    }

    #[test]
    fn test_canonical_forms_are_valid() {
        for c in Category::ALL {
            assert!(is_valid_category(c.as_str()));
        }
        for p in Priority::ALL {
            assert!(is_valid_priority(p.as_str()));
        }
        for r in Room::ALL {
            assert!(is_valid_room(r.as_str()));
        }
    }

    #[test]
    fn test_validity_is_strict() {
        assert!(!is_valid_category("voda/vodovod"));
        assert!(!is_valid_category("Plumbing"));
        assert!(!is_valid_priority("Urgent"));
        assert!(!is_valid_priority("critical"));
        assert!(!is_valid_room("kupaonica"));
        assert!(!is_valid_room(""));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Urgent);
        assert_eq!(Priority::ALL.iter().max(), Some(&Priority::Urgent));
    }

    #[test]
    fn test_priority_synonyms() {
        assert_eq!(Priority::from_synonym("HIGH"), Some(Priority::High));
        assert_eq!(Priority::from_synonym(" urgent "), Some(Priority::Urgent));
        assert_eq!(Priority::from_synonym("Hitno"), Some(Priority::Urgent));
        assert_eq!(Priority::from_synonym("niska"), Some(Priority::Low));
        assert_eq!(Priority::from_synonym("asap"), None);
        assert_eq!(Priority::from_synonym(""), None);
    }

    #[test]
    fn test_category_synonyms() {
        assert_eq!(Category::from_synonym("voda/vodovod"), Some(Category::Water));
        assert_eq!(Category::from_synonym("Plumbing"), Some(Category::Water));
        assert_eq!(Category::from_synonym("  STRUJA "), Some(Category::Electrical));
        assert_eq!(
            Category::from_synonym("cistoca/stetocine"),
            Some(Category::Hygiene)
        );
        assert_eq!(Category::from_synonym("Ostalo"), Some(Category::Other));
        assert_eq!(Category::from_synonym("furniture"), None);
        assert_eq!(Category::from_synonym(""), None);
    }

    #[test]
    fn test_room_synonyms() {
        assert_eq!(Room::from_synonym("kupaonica"), Some(Room::Bathroom));
        assert_eq!(Room::from_synonym("Kupaona"), Some(Room::Bathroom));
        assert_eq!(Room::from_synonym("spavaca soba"), Some(Room::Bedroom));
        assert_eq!(Room::from_synonym("KITCHEN"), Some(Room::Kitchen));
        assert_eq!(Room::from_synonym("wc"), Some(Room::Toilet));
        assert_eq!(Room::from_synonym("garaza"), Some(Room::Garage));
        assert_eq!(Room::from_synonym("attic"), None);
    }

    #[test]
    fn test_serde_uses_canonical_forms() {
        let json = serde_json::to_string(&Category::Water).unwrap();
        assert_eq!(json, "\"Voda/Vodovod\"");
        let json = serde_json::to_string(&Priority::Urgent).unwrap();
        assert_eq!(json, "\"urgent\"");
        let room: Room = serde_json::from_str("\"Spavaća soba\"").unwrap();
        assert_eq!(room, Room::Bedroom);
    }

    #[test]
    fn test_display_matches_as_str() {
        for c in Category::ALL {
            assert_eq!(c.to_string(), c.as_str());
        }
        for r in Room::ALL {
            assert_eq!(r.to_string(), r.as_str());
        }
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("  Čistoća "), "cistoca");
        assert_eq!(fold("GARAŽA"), "garaza");
        assert_eq!(fold("Đakovo"), "dakovo");
    }
}
