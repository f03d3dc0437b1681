//! Label to waste-category mapping.
//!
//! The table is built once at startup and shared read-only afterwards. It is
//! an injected value rather than a process global so tests can run with
//! alternate tables.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// Coarse waste category for a detected object.
///
/// `Continue` is the sentinel for "not actionable": the presenter keeps
/// showing the placeholder for these.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum Category {
    Continue,
    Recyclable,
    FoodWaste,
    HazardousWaste,
    ResidualWaste,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Category::Continue => "continue",
            Category::Recyclable => "Recyclable waste",
            Category::FoodWaste => "Food waste",
            Category::HazardousWaste => "Hazardous waste",
            Category::ResidualWaste => "Residual waste",
        };
        f.write_str(text)
    }
}

/// Default COCO mapping. Labels not listed resolve to `Continue`, so only
/// actionable classes appear here.
const DEFAULT_TABLE: &[(&str, Category)] = &[
    // household items
    ("backpack", Category::ResidualWaste),
    ("umbrella", Category::ResidualWaste),
    ("handbag", Category::ResidualWaste),
    ("tie", Category::ResidualWaste),
    ("suitcase", Category::ResidualWaste),
    ("teddy bear", Category::ResidualWaste),
    ("toothbrush", Category::ResidualWaste),
    // recyclables (containers, cutlery, paper goods)
    ("bottle", Category::Recyclable),
    ("wine glass", Category::Recyclable),
    ("cup", Category::Recyclable),
    ("fork", Category::Recyclable),
    ("knife", Category::Recyclable),
    ("spoon", Category::Recyclable),
    ("bowl", Category::Recyclable),
    ("book", Category::Recyclable),
    ("vase", Category::Recyclable),
    ("scissors", Category::Recyclable),
    // food
    ("banana", Category::FoodWaste),
    ("apple", Category::FoodWaste),
    ("sandwich", Category::FoodWaste),
    ("orange", Category::FoodWaste),
    ("broccoli", Category::FoodWaste),
    ("carrot", Category::FoodWaste),
    ("hot dog", Category::FoodWaste),
    ("pizza", Category::FoodWaste),
    ("donut", Category::FoodWaste),
    ("cake", Category::FoodWaste),
    // electronics and appliances
    ("laptop", Category::HazardousWaste),
    ("mouse", Category::HazardousWaste),
    ("remote", Category::HazardousWaste),
    ("keyboard", Category::HazardousWaste),
    ("cell phone", Category::HazardousWaste),
    ("microwave", Category::HazardousWaste),
    ("oven", Category::HazardousWaste),
    ("toaster", Category::HazardousWaste),
    ("refrigerator", Category::HazardousWaste),
    ("clock", Category::HazardousWaste),
    ("hair drier", Category::HazardousWaste),
];

/// Immutable label-to-category table.
#[derive(Clone, Debug)]
pub struct CategoryTable {
    entries: HashMap<String, Category>,
}

impl CategoryTable {
    /// Build a table from explicit pairs. Later duplicates win.
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(label, category)| (label.into(), category))
            .collect();
        Self { entries }
    }

    /// Classify a detector label. Total over all strings: unknown labels
    /// return `Category::Continue`.
    pub fn classify(&self, label: &str) -> Category {
        self.entries
            .get(label)
            .copied()
            .unwrap_or(Category::Continue)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE.iter().map(|&(label, cat)| (label, cat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_total_over_unknown_labels() {
        let table = CategoryTable::default();
        assert_eq!(table.classify("person"), Category::Continue);
        assert_eq!(table.classify(""), Category::Continue);
        assert_eq!(table.classify("not a coco label"), Category::Continue);
    }

    #[test]
    fn classify_returns_configured_categories() {
        let table = CategoryTable::default();
        assert_eq!(table.classify("bottle"), Category::Recyclable);
        assert_eq!(table.classify("banana"), Category::FoodWaste);
        assert_eq!(table.classify("laptop"), Category::HazardousWaste);
        assert_eq!(table.classify("umbrella"), Category::ResidualWaste);
    }

    #[test]
    fn alternate_tables_are_injectable() {
        let table = CategoryTable::new([("widget", Category::Recyclable)]);
        assert_eq!(table.classify("widget"), Category::Recyclable);
        assert_eq!(table.classify("bottle"), Category::Continue);
    }

    #[test]
    fn category_display_matches_overlay_text() {
        assert_eq!(Category::Recyclable.to_string(), "Recyclable waste");
        assert_eq!(Category::Continue.to_string(), "continue");
    }
}
