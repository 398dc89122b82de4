//! Custom diagnostic data attached to a single error report.
//!
//! Data is grouped into named tabs, each holding key/value entries. Several
//! independently built stores (per-event data, integration context, global
//! defaults) are combined with [`Metadata::merge`], where earlier stores take
//! precedence over later ones on conflicting entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The tab name used when a caller doesn't supply one
pub const DEFAULT_TAB_NAME: &str = "Custom Data";

/// Key used by [`Metadata::add_value`] for values that are not JSON objects
pub const DEFAULT_VALUE_KEY: &str = "value";

/// Entries of a single tab, keyed by entry name
pub type Tab = BTreeMap<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Two-level store of report metadata: tab name → entry key → value.
///
/// Tabs and keys are kept sorted so the serialized fragment is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    tabs: BTreeMap<String, Tab>,
}

impl Metadata {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Add a value to the default tab.
    ///
    /// A JSON object contributes each of its fields as a separate entry.
    /// Any other value is stored under [`DEFAULT_VALUE_KEY`].
    pub fn add_value(&mut self, value: impl Into<Value>) {
        match value.into() {
            Value::Object(fields) => {
                for (key, value) in fields {
                    self.add_to_tab(DEFAULT_TAB_NAME, key, value);
                }
            }
            other => self.add_to_tab(DEFAULT_TAB_NAME, DEFAULT_VALUE_KEY, other),
        }
    }

    /// Add an entry to the default tab
    pub fn add_entry(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.add_to_tab(DEFAULT_TAB_NAME, key, value);
    }

    /// Add an entry to a specific tab, creating the tab if needed.
    ///
    /// An existing entry with the same key is overwritten.
    pub fn add_to_tab(
        &mut self,
        tab: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.tabs
            .entry(tab.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Remove a tab and all of its entries. Missing tabs are ignored.
    pub fn remove_tab(&mut self, tab: &str) {
        self.tabs.remove(tab);
    }

    /// Remove a single entry. Missing tabs or keys are ignored.
    ///
    /// The tab itself stays, even when this removes its last entry.
    pub fn remove_entry(&mut self, tab: &str, key: &str) {
        if let Some(entries) = self.tabs.get_mut(tab) {
            entries.remove(key);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Merging
    // ─────────────────────────────────────────────────────────────────────

    /// Combine several stores into a new one.
    ///
    /// Stores are folded left to right into an empty accumulator. An entry is
    /// copied only if its (tab, key) is not already present, so the first
    /// store holding a given entry wins. None of the inputs is modified.
    pub fn merge<'a, I>(stores: I) -> Metadata
    where
        I: IntoIterator<Item = &'a Metadata>,
    {
        let mut merged = Metadata::new();
        let mut sources = 0usize;

        for store in stores {
            merged.fill_missing_from(store);
            sources += 1;
        }

        tracing::debug!(
            "Merged {} metadata stores into {} tabs / {} entries",
            sources,
            merged.len(),
            merged.entry_count()
        );

        merged
    }

    /// Copy in every entry of `other` whose (tab, key) is absent here.
    fn fill_missing_from(&mut self, other: &Metadata) {
        for (tab_name, entries) in &other.tabs {
            let tab = self.tabs.entry(tab_name.clone()).or_default();
            for (key, value) in entries {
                tab.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────

    /// Look up a single entry
    pub fn get(&self, tab: &str, key: &str) -> Option<&Value> {
        self.tabs.get(tab).and_then(|entries| entries.get(key))
    }

    /// Look up all entries of a tab
    pub fn tab(&self, tab: &str) -> Option<&Tab> {
        self.tabs.get(tab)
    }

    pub fn contains_tab(&self, tab: &str) -> bool {
        self.tabs.contains_key(tab)
    }

    /// Tab names in sorted order
    pub fn tab_names(&self) -> impl Iterator<Item = &str> {
        self.tabs.keys().map(String::as_str)
    }

    /// Iterate over tabs and their entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tab)> {
        self.tabs.iter().map(|(name, tab)| (name.as_str(), tab))
    }

    /// Number of tabs
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Total number of entries across all tabs
    pub fn entry_count(&self) -> usize {
        self.tabs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Render the store as the metadata fragment of a report payload
    pub fn to_fragment(&self) -> Value {
        Value::Object(
            self.tabs
                .iter()
                .map(|(name, entries)| {
                    let entries = entries
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    (name.clone(), Value::Object(entries))
                })
                .collect(),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(data: Value) -> Metadata {
        serde_json::from_value(data).unwrap()
    }

    // Mutation tests

    #[test]
    fn test_add_entry_uses_default_tab() {
        let mut metadata = Metadata::new();
        metadata.add_entry("user_id", 42);

        assert_eq!(metadata.get(DEFAULT_TAB_NAME, "user_id"), Some(&json!(42)));
        assert_eq!(metadata.tab_names().collect::<Vec<_>>(), vec!["Custom Data"]);
    }

    #[test]
    fn test_add_value_object_spreads_fields() {
        let mut metadata = Metadata::new();
        metadata.add_value(json!({"plan": "pro", "seats": 5}));

        assert_eq!(metadata.get(DEFAULT_TAB_NAME, "plan"), Some(&json!("pro")));
        assert_eq!(metadata.get(DEFAULT_TAB_NAME, "seats"), Some(&json!(5)));
        assert_eq!(metadata.entry_count(), 2);
    }

    #[test]
    fn test_add_value_scalar_uses_value_key() {
        let mut metadata = Metadata::new();
        metadata.add_value("checkout failed twice");

        assert_eq!(
            metadata.get(DEFAULT_TAB_NAME, DEFAULT_VALUE_KEY),
            Some(&json!("checkout failed twice"))
        );
    }

    #[test]
    fn test_add_to_tab_creates_tab() {
        let mut metadata = Metadata::new();
        metadata.add_to_tab("Device", "os", "linux");

        assert!(metadata.contains_tab("Device"));
        assert_eq!(metadata.get("Device", "os"), Some(&json!("linux")));
    }

    #[test]
    fn test_add_same_key_overwrites() {
        let mut metadata = Metadata::new();
        metadata.add_to_tab("Account", "tier", "free");
        metadata.add_to_tab("Account", "tier", "paid");

        assert_eq!(metadata.tab("Account").unwrap().len(), 1);
        assert_eq!(metadata.get("Account", "tier"), Some(&json!("paid")));
    }

    #[test]
    fn test_add_nested_value() {
        let mut metadata = Metadata::new();
        metadata.add_to_tab("Request", "params", json!({"page": 2, "tags": ["a", "b"]}));

        assert_eq!(
            metadata.get("Request", "params"),
            Some(&json!({"page": 2, "tags": ["a", "b"]}))
        );
    }

    #[test]
    fn test_remove_tab() {
        let mut metadata = store(json!({"A": {"k": 1}, "B": {"k": 2}}));
        metadata.remove_tab("A");

        assert!(!metadata.contains_tab("A"));
        assert!(metadata.contains_tab("B"));
    }

    #[test]
    fn test_remove_missing_targets_is_noop() {
        let mut metadata = store(json!({"A": {"k": 1}}));
        let before = metadata.clone();

        metadata.remove_tab("Missing");
        metadata.remove_entry("Missing", "k");
        metadata.remove_entry("A", "missing");

        assert_eq!(metadata, before);
    }

    #[test]
    fn test_remove_entry_keeps_tab() {
        let mut metadata = store(json!({"A": {"k": 1, "j": 2}}));
        metadata.remove_entry("A", "k");

        assert_eq!(metadata.get("A", "k"), None);
        assert_eq!(metadata.get("A", "j"), Some(&json!(2)));

        metadata.remove_entry("A", "j");
        assert!(metadata.contains_tab("A"));
        assert_eq!(metadata.entry_count(), 0);
    }

    // Merge tests

    #[test]
    fn test_merge_earlier_store_wins() {
        let a = store(json!({"t1": {"k1": "a"}}));
        let b = store(json!({"t1": {"k1": "b", "k2": "c"}}));

        let merged = Metadata::merge([&a, &b]);

        assert_eq!(merged.to_fragment(), json!({"t1": {"k1": "a", "k2": "c"}}));
    }

    #[test]
    fn test_merge_three_way_precedence() {
        let a = store(json!({"t": {"x": "a"}}));
        let b = store(json!({"t": {"x": "b", "y": "b"}}));
        let c = store(json!({"t": {"x": "c", "y": "c", "z": "c"}, "u": {"w": "c"}}));

        let flat = Metadata::merge([&a, &b, &c]);
        let left = Metadata::merge([&Metadata::merge([&a, &b]), &c]);
        let right = Metadata::merge([&a, &Metadata::merge([&b, &c])]);

        let expected = json!({"t": {"x": "a", "y": "b", "z": "c"}, "u": {"w": "c"}});
        assert_eq!(flat.to_fragment(), expected);
        assert_eq!(left, flat);
        assert_eq!(right, flat);
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let a = store(json!({"t1": {"k1": "a"}}));
        let b = store(json!({"t1": {"k2": "b"}, "t2": {"k": true}}));
        let (a_before, b_before) = (a.clone(), b.clone());

        let merged = Metadata::merge([&a, &b]);

        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
        assert_eq!(merged.entry_count(), 3);
    }

    #[test]
    fn test_merge_result_is_independent() {
        let a = store(json!({"t1": {"k1": "a"}}));
        let mut merged = Metadata::merge([&a]);
        merged.add_to_tab("t1", "k1", "changed");

        assert_eq!(a.get("t1", "k1"), Some(&json!("a")));
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(Metadata::merge(std::iter::empty()).is_empty());

        let empty = Metadata::new();
        let a = store(json!({"t": {"k": 1}}));
        assert_eq!(Metadata::merge([&empty, &a, &empty]), a);
    }

    #[test]
    fn test_merge_keeps_empty_tabs() {
        let mut a = Metadata::new();
        a.add_to_tab("Empty", "k", 1);
        a.remove_entry("Empty", "k");

        let merged = Metadata::merge([&a]);
        assert!(merged.contains_tab("Empty"));
    }

    // Serialization tests

    #[test]
    fn test_serializes_as_nested_object() {
        let mut metadata = Metadata::new();
        metadata.add_entry("a", 1);
        metadata.add_to_tab("Device", "locale", "en-GB");

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            json,
            json!({"Custom Data": {"a": 1}, "Device": {"locale": "en-GB"}})
        );
        assert_eq!(json, metadata.to_fragment());
    }
}
