//! Selection State
//!
//! A customer's in-progress choices for one product's [`VariantCatalog`].
//! Created empty when the product is opened, replaced on every toggle and
//! consumed into a cart line on confirm.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use crate::domain::aggregates::catalog::{SelectionMode, VariantCatalog, VariantGroup};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupSelection {
    Single(String),
    Multi(BTreeSet<String>),
}

impl GroupSelection {
    fn len(&self) -> usize {
        match self { Self::Single(_) => 1, Self::Multi(set) => set.len() }
    }

    fn contains(&self, label: &str) -> bool {
        match self { Self::Single(l) => l == label, Self::Multi(set) => set.contains(label) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionState {
    groups: BTreeMap<String, GroupSelection>,
}

impl SelectionState {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Number of options currently selected in `group`.
    pub fn count(&self, group: &str) -> usize { self.groups.get(group).map_or(0, GroupSelection::len) }

    pub fn is_selected(&self, group: &str, label: &str) -> bool {
        self.groups.get(group).is_some_and(|s| s.contains(label))
    }

    /// Apply one click. Checking a multi-select option past its maximum leaves
    /// the state unchanged; unknown groups and labels are rejected.
    pub fn toggle(&self, catalog: &VariantCatalog, group: &str, label: &str, checked: bool) -> Result<Self, ValidationError> {
        let variant = catalog.group(group).ok_or_else(|| ValidationError::UnknownGroup(group.to_string()))?;
        if variant.option(label).is_none() {
            return Err(ValidationError::UnknownOption { group: group.to_string(), label: label.to_string() });
        }

        let mut next = self.clone();
        match (variant.mode(), checked) {
            (SelectionMode::Single, true) => {
                next.groups.insert(group.to_string(), GroupSelection::Single(label.to_string()));
            }
            (SelectionMode::Single, false) => {
                if next.is_selected(group, label) {
                    next.groups.remove(group);
                }
            }
            (SelectionMode::Multi, true) => {
                if self.is_selected(group, label) {
                    return Ok(next);
                }
                if self.count(group) >= variant.max_selections() as usize {
                    tracing::debug!(group, label, max = variant.max_selections(), "selection at maximum, ignoring toggle");
                    return Ok(next);
                }
                match next.groups.entry(group.to_string()).or_insert_with(|| GroupSelection::Multi(BTreeSet::new())) {
                    GroupSelection::Multi(set) => { set.insert(label.to_string()); }
                    single @ GroupSelection::Single(_) => *single = GroupSelection::Multi(BTreeSet::from([label.to_string()])),
                }
            }
            (SelectionMode::Multi, false) => {
                if let Some(GroupSelection::Multi(set)) = next.groups.get_mut(group) {
                    set.remove(label);
                    if set.is_empty() {
                        next.groups.remove(group);
                    }
                }
            }
        }
        Ok(next)
    }

    fn is_group_complete(&self, group: &VariantGroup) -> bool {
        let count = self.count(group.name()) as u32;
        match group.mode() {
            SelectionMode::Single => group.min_selections() == 0 || count == 1,
            SelectionMode::Multi => count >= group.min_selections(),
        }
    }

    /// First group whose minimum is not yet met, in catalog order.
    pub fn first_incomplete<'c>(&self, catalog: &'c VariantCatalog) -> Option<&'c VariantGroup> {
        catalog.groups().iter().find(|g| !self.is_group_complete(g))
    }

    pub fn is_complete(&self, catalog: &VariantCatalog) -> bool { self.first_incomplete(catalog).is_none() }

    /// Full check before confirming, including states restored from outside the engine.
    pub fn validate(&self, catalog: &VariantCatalog) -> Result<(), ValidationError> {
        for (name, selection) in &self.groups {
            let group = catalog.group(name).ok_or_else(|| ValidationError::UnknownGroup(name.clone()))?;
            let labels: Vec<&String> = match selection {
                GroupSelection::Single(label) => vec![label],
                GroupSelection::Multi(set) => set.iter().collect(),
            };
            if let Some(label) = labels.iter().find(|l| group.option(l.as_str()).is_none()) {
                return Err(ValidationError::UnknownOption { group: name.clone(), label: label.to_string() });
            }
            if labels.len() as u32 > group.max_selections() {
                return Err(ValidationError::TooManySelections { group: name.clone(), max: group.max_selections() });
            }
        }
        match self.first_incomplete(catalog) {
            Some(group) => Err(ValidationError::Incomplete { group: group.name().to_string(), min: group.min_selections() }),
            None => Ok(()),
        }
    }

    /// Sum of the price deltas of every selected option, per unit.
    pub fn price_delta(&self, catalog: &VariantCatalog) -> Money {
        catalog.groups().iter()
            .flat_map(|g| g.options().iter().filter(move |o| self.is_selected(g.name(), &o.label)))
            .map(|o| o.price_delta)
            .sum()
    }

    /// `"Group: a, b"` per group with a selection, in catalog order.
    pub fn resolved_labels(&self, catalog: &VariantCatalog) -> Vec<String> {
        catalog.groups().iter()
            .filter_map(|g| {
                let chosen: Vec<&str> = g.options().iter()
                    .filter(|o| self.is_selected(g.name(), &o.label))
                    .map(|o| o.label.as_str())
                    .collect();
                (!chosen.is_empty()).then(|| format!("{}: {}", g.name(), chosen.join(", ")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown variant group {0:?}")]
    UnknownGroup(String),
    #[error("unknown option {label:?} in group {group:?}")]
    UnknownOption { group: String, label: String },
    #[error("group {group:?} allows at most {max} selections")]
    TooManySelections { group: String, max: u32 },
    #[error("please choose at least {min} option(s) for {group}")]
    Incomplete { group: String, min: u32 },
    #[error("quantity must be at least 1")]
    InvalidQuantity,
}
