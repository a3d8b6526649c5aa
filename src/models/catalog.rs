//! Catalog models
//!
//! Categories and menu items come from the external menu lookup service.
//! The dispatcher assembles a `CatalogView` snapshot per event so the
//! engine can resolve numeric selections without performing I/O.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Menu category grouping related items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub ordering: i32,
}

/// Individual menu item with snapshot-friendly pricing in minor units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price_minor: u64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

/// Consistent catalog snapshot for one engine transition.
///
/// Selection codes are list positions (1-based) in the snapshot's
/// ordering, so the engine stays deterministic over its inputs.
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    pub categories: Vec<Category>,
    items_by_category: HashMap<i64, Vec<MenuItem>>,
}

impl CatalogView {
    pub fn new(categories: Vec<Category>, items_by_category: HashMap<i64, Vec<MenuItem>>) -> Self {
        Self { categories, items_by_category }
    }

    /// Resolve a 1-based category selection code
    pub fn category_by_code(&self, code: usize) -> Option<&Category> {
        if code == 0 {
            return None;
        }
        self.categories.get(code - 1)
    }

    /// Available items for a category, in snapshot order
    pub fn items(&self, category_id: i64) -> &[MenuItem] {
        self.items_by_category
            .get(&category_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve a 1-based item selection code within a category
    pub fn item_by_code(&self, category_id: i64, code: usize) -> Option<&MenuItem> {
        if code == 0 {
            return None;
        }
        self.items(category_id).get(code - 1)
    }

    pub fn category_name(&self, category_id: i64) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> CatalogView {
        let categories = vec![
            Category { id: 10, name: "Burgers".to_string(), ordering: 0 },
            Category { id: 20, name: "Drinks".to_string(), ordering: 1 },
        ];
        let mut items = HashMap::new();
        items.insert(10, vec![MenuItem {
            id: 1,
            category_id: 10,
            name: "Cheeseburger".to_string(),
            price_minor: 500,
            is_available: true,
        }]);
        CatalogView::new(categories, items)
    }

    #[test]
    fn test_selection_codes_are_one_based() {
        let view = view();
        assert_eq!(view.category_by_code(1).map(|c| c.id), Some(10));
        assert_eq!(view.category_by_code(2).map(|c| c.id), Some(20));
        assert!(view.category_by_code(0).is_none());
        assert!(view.category_by_code(3).is_none());
        assert_eq!(view.item_by_code(10, 1).map(|i| i.id), Some(1));
        assert!(view.item_by_code(20, 1).is_none());
    }
}
