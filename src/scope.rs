// src/scope.rs
//! Scope document extraction: turn a per-program scope document into target strings

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{HarvestError, Result};

/// Where the scope items live inside a platform's scope document, and
/// which fields of an item carry the name, uri and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeLayout {
    /// JSON pointer to the array of scope items
    pub items_pointer: &'static str,
    pub name_field: &'static str,
    pub uri_field: &'static str,
    pub category_field: &'static str,
    /// Boolean field that, when explicitly `false`, excludes the item
    pub eligibility_field: Option<&'static str>,
}

/// One raw record inside a scope document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeItem {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub category: Option<String>,
    pub eligible: bool,
}

impl ScopeItem {
    /// Read an item out of a JSON object according to `layout`
    pub fn from_value(value: &Value, layout: &ScopeLayout) -> Self {
        let text = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let eligible = layout
            .eligibility_field
            .and_then(|field| value.get(field))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Self {
            name: text(layout.name_field),
            uri: text(layout.uri_field),
            category: text(layout.category_field),
            eligible,
        }
    }

    /// The target string: `uri` when present, otherwise `name`
    pub fn target(&self) -> Option<&str> {
        self.uri.as_deref().or(self.name.as_deref())
    }
}

/// Set of category names whose items are kept (ASCII case-insensitive)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptedCategories {
    names: HashSet<String>,
}

impl AcceptedCategories {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_ascii_lowercase())
            .filter(|n| !n.is_empty())
            .collect();

        Self { names }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.names.contains(&category.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Extract every accepted target string from a scope document.
///
/// Fails with [`HarvestError::MalformedDocument`] when the item list is not
/// where `layout` says it is. Items without a usable target, without a
/// category, in a rejected category, or marked ineligible are skipped.
pub fn extract_targets(
    document: &Value,
    layout: &ScopeLayout,
    accepted: &AcceptedCategories,
) -> Result<Vec<String>> {
    let items = document
        .pointer(layout.items_pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| HarvestError::MalformedDocument {
            pointer: layout.items_pointer.to_string(),
        })?;

    let targets = items
        .iter()
        .map(|item| ScopeItem::from_value(item, layout))
        .filter(|item| item.eligible)
        .filter(|item| {
            item.category
                .as_deref()
                .is_some_and(|category| accepted.contains(category))
        })
        .filter_map(|item| item.target().map(str::to_string))
        .collect();

    Ok(targets)
}
