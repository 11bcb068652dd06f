//! Attribute lists as the directory endpoint encodes them.
//!
//! Multi-valued attributes travel as `{name, operation, isEncoded, values}`
//! structures, with the value list nested one level down under an `item`
//! key. An attribute that is present with an empty value list is distinct
//! from an attribute that is absent: the former is an explicit clear, the
//! latter says nothing.

use serde::{Deserialize, Serialize};

/// Replace the attribute's values. The only operation this client issues.
pub const OPERATION_REPLACE: i32 = 0;

/// A list nested under an `item` key, as the endpoint shapes collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub item: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { item: Vec::new() }
    }
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(item: Vec<T>) -> Self {
        Self { item }
    }
}

/// One named, multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub operation: i32,
    #[serde(default)]
    pub is_encoded: bool,
    #[serde(default)]
    pub values: ItemList<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            operation: OPERATION_REPLACE,
            is_encoded: false,
            values: values.into(),
        }
    }

    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }

    /// An attribute present with no values: an explicit clear.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// The attribute list carried by directory entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(default)]
    pub item: Vec<Attribute>,
}

impl AttributeSet {
    pub fn from_attributes(item: Vec<Attribute>) -> Self {
        Self { item }
    }

    /// Looks up an attribute's values by name, case-insensitively.
    ///
    /// `None` means the attribute is absent. `Some` with an empty slice
    /// means it is present with no values.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.item
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
            .map(|attribute| attribute.values.item.as_slice())
    }

    /// The first value of an attribute, if the attribute has any values.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All attribute names, lowercased.
    pub fn keys(&self) -> Vec<String> {
        self.item
            .iter()
            .map(|attribute| attribute.name.to_lowercase())
            .collect()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.item.push(attribute);
    }

    pub fn len(&self) -> usize {
        self.item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_empty()
    }
}
