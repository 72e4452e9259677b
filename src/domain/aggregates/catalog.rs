//! Variant Catalog Aggregate
//!
//! A product's selectable option groups. Wire format is a JSON array:
//!
//! ```json
//! [{ "name": "Size", "type": "SELECT", "options": [{ "label": "Large", "price": 300 }] },
//!  { "name": "Extras", "type": "CHECKBOX", "min_selection": 0, "max_selection": 2, "options": [...] }]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionMode {
    #[serde(rename = "SELECT")]
    Single,
    #[serde(rename = "CHECKBOX")]
    Multi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantOption {
    pub label: String,
    pub price_delta: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantGroup {
    name: String,
    mode: SelectionMode,
    options: Vec<VariantOption>,
    min_selections: u32,
    max_selections: u32,
}

impl VariantGroup {
    pub fn single(name: impl Into<String>, required: bool, options: Vec<VariantOption>) -> Result<Self, CatalogError> {
        Self::build(name.into(), SelectionMode::Single, options, u32::from(required), 1)
    }

    pub fn multi(name: impl Into<String>, min: u32, max: u32, options: Vec<VariantOption>) -> Result<Self, CatalogError> {
        Self::build(name.into(), SelectionMode::Multi, options, min, max)
    }

    fn build(name: String, mode: SelectionMode, options: Vec<VariantOption>, min: u32, max: u32) -> Result<Self, CatalogError> {
        if name.trim().is_empty() { return Err(CatalogError::UnnamedGroup); }

        let mut seen = HashSet::new();
        for option in &options {
            if option.label.trim().is_empty() {
                return Err(CatalogError::EmptyLabel { group: name });
            }
            if option.price_delta < Money::ZERO {
                return Err(CatalogError::NegativePrice { group: name, label: option.label.clone() });
            }
            if !seen.insert(option.label.as_str()) {
                return Err(CatalogError::DuplicateOption { group: name, label: option.label.clone() });
            }
        }

        match mode {
            SelectionMode::Single if min > 1 => Err(CatalogError::InvalidBounds { group: name, min, max: 1 }),
            SelectionMode::Single => Ok(Self { name, mode, options, min_selections: min, max_selections: 1 }),
            SelectionMode::Multi if max == 0 || min > max => Err(CatalogError::InvalidBounds { group: name, min, max }),
            SelectionMode::Multi => Ok(Self { name, mode, options, min_selections: min, max_selections: max }),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn mode(&self) -> SelectionMode { self.mode }
    pub fn options(&self) -> &[VariantOption] { &self.options }
    pub fn min_selections(&self) -> u32 { self.min_selections }
    /// Always 1 for single-selection groups.
    pub fn max_selections(&self) -> u32 { self.max_selections }
    pub fn is_required(&self) -> bool { self.min_selections > 0 }

    pub fn option(&self, label: &str) -> Option<&VariantOption> { self.options.iter().find(|o| o.label == label) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantCatalog {
    groups: Vec<VariantGroup>,
}

impl VariantCatalog {
    pub fn new(groups: Vec<VariantGroup>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group.name()) {
                return Err(CatalogError::DuplicateGroup(group.name().to_string()));
            }
        }
        Ok(Self { groups })
    }

    pub fn empty() -> Self { Self::default() }
    pub fn groups(&self) -> &[VariantGroup] { &self.groups }
    pub fn group(&self, name: &str) -> Option<&VariantGroup> { self.groups.iter().find(|g| g.name == name) }
    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Parse the stored variant JSON. A blank or `null` payload is a product without variants.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return Ok(Self::empty());
        }
        let wire: Vec<VariantGroupWire> = serde_json::from_str(raw)?;
        let groups = wire.into_iter().map(VariantGroupWire::into_domain).collect::<Result<Vec<_>, _>>()?;
        Self::new(groups)
    }
}

#[derive(Debug, Deserialize)]
struct VariantOptionWire {
    #[serde(default)]
    label: String,
    #[serde(default, alias = "priceDelta")]
    price: i64,
}

#[derive(Debug, Deserialize)]
struct VariantGroupWire {
    name: String,
    #[serde(rename = "type")]
    mode: SelectionMode,
    #[serde(default)]
    options: Vec<VariantOptionWire>,
    #[serde(default, alias = "minSelections")]
    min_selection: Option<u32>,
    #[serde(default, alias = "maxSelections")]
    max_selection: Option<u32>,
}

impl VariantGroupWire {
    fn into_domain(self) -> Result<VariantGroup, CatalogError> {
        // The product form can leave blank option rows behind; they are not selectable.
        let options = self.options.into_iter()
            .filter(|o| !o.label.trim().is_empty())
            .map(|o| VariantOption { label: o.label, price_delta: Money::from_minor(o.price) })
            .collect();

        match self.mode {
            SelectionMode::Single => {
                let min = self.min_selection.unwrap_or(1);
                VariantGroup::build(self.name, SelectionMode::Single, options, min, 1)
            }
            SelectionMode::Multi => {
                let max = self.max_selection.filter(|m| *m > 0).unwrap_or(1);
                VariantGroup::build(self.name, SelectionMode::Multi, options, self.min_selection.unwrap_or(0), max)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("variants are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("variant group has no name")]
    UnnamedGroup,
    #[error("duplicate variant group {0:?}")]
    DuplicateGroup(String),
    #[error("group {group:?} has an option without a label")]
    EmptyLabel { group: String },
    #[error("group {group:?} lists option {label:?} twice")]
    DuplicateOption { group: String, label: String },
    #[error("option {label:?} in group {group:?} has a negative price")]
    NegativePrice { group: String, label: String },
    #[error("group {group:?} has invalid selection bounds min={min} max={max}")]
    InvalidBounds { group: String, min: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wire_catalog() {
        let raw = json!([
            { "name": "Size", "type": "SELECT", "options": [
                { "label": "Small", "price": 0 }, { "label": "Large", "price": 300 }, { "label": "  ", "price": 0 }
            ]},
            { "name": "Extras", "type": "CHECKBOX", "min_selection": 1, "max_selection": 2, "options": [
                { "label": "Bacon", "price": 400 }, { "label": "Cheese", "price": 250 }, { "label": "Egg", "price": 200 }
            ]}
        ]);
        let catalog = VariantCatalog::from_json(&raw.to_string()).unwrap();

        let size = catalog.group("Size").unwrap();
        assert_eq!(size.mode(), SelectionMode::Single);
        assert_eq!(size.options().len(), 2);
        assert!(size.is_required());

        let extras = catalog.group("Extras").unwrap();
        assert_eq!((extras.min_selections(), extras.max_selections()), (1, 2));
        assert_eq!(extras.option("Cheese").unwrap().price_delta, Money::from_minor(250));
    }

    #[test]
    fn test_wire_defaults() {
        let raw = json!([
            { "name": "Sauce", "type": "SELECT", "min_selection": 0, "options": [{ "label": "BBQ" }] },
            { "name": "Toppings", "type": "CHECKBOX", "max_selection": 0, "options": [{ "label": "Onion" }] }
        ]);
        let catalog = VariantCatalog::from_json(&raw.to_string()).unwrap();
        assert!(!catalog.group("Sauce").unwrap().is_required());
        let toppings = catalog.group("Toppings").unwrap();
        assert_eq!((toppings.min_selections(), toppings.max_selections()), (0, 1));
    }

    #[test]
    fn test_blank_payload_is_empty_catalog() {
        assert!(VariantCatalog::from_json("").unwrap().is_empty());
        assert!(VariantCatalog::from_json("null").unwrap().is_empty());
        assert!(VariantCatalog::from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_invalid_catalogs() {
        let dup = json!([{ "name": "Size", "type": "SELECT", "options": [{ "label": "S" }, { "label": "S" }] }]);
        assert!(matches!(VariantCatalog::from_json(&dup.to_string()), Err(CatalogError::DuplicateOption { .. })));

        let bounds = json!([{ "name": "Extras", "type": "CHECKBOX", "min_selection": 3, "max_selection": 2, "options": [] }]);
        assert!(matches!(VariantCatalog::from_json(&bounds.to_string()), Err(CatalogError::InvalidBounds { .. })));

        let single_min = json!([{ "name": "Size", "type": "SELECT", "min_selection": 2, "options": [] }]);
        assert!(matches!(VariantCatalog::from_json(&single_min.to_string()), Err(CatalogError::InvalidBounds { .. })));

        let negative = json!([{ "name": "Size", "type": "SELECT", "options": [{ "label": "S", "price": -1 }] }]);
        assert!(matches!(VariantCatalog::from_json(&negative.to_string()), Err(CatalogError::NegativePrice { .. })));

        let unknown_type = json!([{ "name": "Size", "type": "RADIO", "options": [] }]);
        assert!(matches!(VariantCatalog::from_json(&unknown_type.to_string()), Err(CatalogError::Json(_))));
    }
}
