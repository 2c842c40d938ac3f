//! Per-task configuration store.
//!
//! A task instance owns exactly one [`OptionStore`]. Values are typed by shape
//! (scalar, flag, list, key/value map) rather than by tool, so the same store
//! backs every wrapper and the parameter builder can render it generically.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Str(String),
    Flag(bool),
    List(Vec<String>),
    /// Key/value properties, kept in insertion order.
    Map(Vec<(String, String)>),
}

impl OptionValue {
    /// Human-readable shape name used in type mismatch diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            OptionValue::Str(_) => "string",
            OptionValue::Flag(_) => "flag",
            OptionValue::List(_) => "list",
            OptionValue::Map(_) => "map",
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Flag(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

impl From<Vec<(String, String)>> for OptionValue {
    fn from(value: Vec<(String, String)>) -> Self {
        OptionValue::Map(value)
    }
}

/// Named option values for one task instance.
///
/// Defaults and explicit values live in the same map: [`OptionStore::merge_defaults`]
/// only fills holes, so whatever the caller set explicitly always wins, no matter
/// whether it was set before or after the merge. Options filled from defaults are
/// remembered until the instance writes them, so the first [`OptionStore::append`]
/// onto a defaulted list replaces it instead of extending it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionStore {
    values: BTreeMap<String, OptionValue>,
    #[serde(skip)]
    defaulted: BTreeSet<String>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite an option.
    pub fn set(&mut self, option: &str, value: impl Into<OptionValue>) {
        self.defaulted.remove(option);
        self.values.insert(option.to_string(), value.into());
    }

    /// Returns the option value, or `None` when the option is unset.
    pub fn get(&self, option: &str) -> Option<&OptionValue> {
        self.values.get(option)
    }

    pub fn contains(&self, option: &str) -> bool {
        self.values.contains_key(option)
    }

    pub fn remove(&mut self, option: &str) -> Option<OptionValue> {
        self.defaulted.remove(option);
        self.values.remove(option)
    }

    /// `true` while the option still holds the value merged from defaults.
    pub fn is_defaulted(&self, option: &str) -> bool {
        self.defaulted.contains(option)
    }

    /// Append to a list option, creating it when absent.
    ///
    /// The first append onto a list that came from defaults replaces it; later
    /// appends extend the instance's own list. A non-list value under the same
    /// name is replaced by a one-element list.
    pub fn append(&mut self, option: &str, value: impl Into<String>) {
        let value = value.into();
        let inherited = self.defaulted.remove(option);
        match self.values.get_mut(option) {
            Some(OptionValue::List(items)) if !inherited => items.push(value),
            _ => {
                self.values
                    .insert(option.to_string(), OptionValue::List(vec![value]));
            }
        }
    }

    /// Turn a boolean flag on.
    pub fn enable(&mut self, option: &str) {
        self.set(option, true);
    }

    /// Turn a boolean flag off. Rendering treats `false` the same as absent.
    pub fn disable(&mut self, option: &str) {
        self.set(option, false);
    }

    /// Insert or replace `key` in a map option.
    ///
    /// Replacing keeps the key's original position so rendering order stays stable.
    /// Maps merge per key: default entries the instance does not touch are kept.
    pub fn insert_entry(&mut self, option: &str, key: impl Into<String>, value: impl Into<String>) {
        self.defaulted.remove(option);
        let key = key.into();
        let value = value.into();
        match self.values.get_mut(option) {
            Some(OptionValue::Map(entries)) => {
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    entries.push((key, value));
                }
            }
            _ => {
                self.values
                    .insert(option.to_string(), OptionValue::Map(vec![(key, value)]));
            }
        }
    }

    /// Apply `defaults` to every option not already present on this store.
    pub fn merge_defaults(&mut self, defaults: &OptionStore) {
        for (name, value) in &defaults.values {
            if !self.values.contains_key(name) {
                self.values.insert(name.clone(), value.clone());
                self.defaulted.insert(name.clone());
            }
        }
    }

    pub fn get_str(&self, option: &str) -> Option<&str> {
        match self.values.get(option) {
            Some(OptionValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Flags read as `false` when unset.
    pub fn get_flag(&self, option: &str) -> bool {
        matches!(self.values.get(option), Some(OptionValue::Flag(true)))
    }

    pub fn get_list(&self, option: &str) -> Option<&[String]> {
        match self.values.get(option) {
            Some(OptionValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn get_map(&self, option: &str) -> Option<&[(String, String)]> {
        match self.values.get(option) {
            Some(OptionValue::Map(entries)) => Some(entries.as_slice()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
