//! Ordered attribute storage and typed attribute values.
//!
//! Attribute values are always strings once stored. [`AttributeValue`] fixes
//! how non-string inputs are stringified at the boundary, so callers cannot
//! pass arbitrary types into the tree.

use std::fmt;

/// An XML attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name.
    pub name: String,
    /// The raw attribute value, escaped only on serialization.
    pub value: String,
}

/// A stringified attribute value.
///
/// Built from strings, integers, floats, and chars through their `Display`
/// output; `bool` becomes `"true"` or `"false"`.
///
/// # Examples
///
/// ```
/// use xmlbuilder::tree::AttributeValue;
///
/// assert_eq!(AttributeValue::from(10).as_str(), "10");
/// assert_eq!(AttributeValue::from(true).as_str(), "true");
/// assert_eq!(AttributeValue::from("example").as_str(), "example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeValue(String);

impl AttributeValue {
    /// Returns the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the stored string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self(if value { "true" } else { "false" }.to_string())
    }
}

macro_rules! attribute_value_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

attribute_value_from_display!(
    char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

/// Insertion-ordered attribute map with unique names.
///
/// Setting an existing name replaces its value in place, keeping its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<Attribute>,
}

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, returning the previous value if there was one.
    pub fn set(&mut self, name: &str, value: AttributeValue) -> Option<String> {
        if let Some(existing) = self.entries.iter_mut().find(|a| a.name == name) {
            return Some(std::mem::replace(&mut existing.value, value.into_string()));
        }
        self.entries.push(Attribute {
            name: name.to_string(),
            value: value.into_string(),
        });
        None
    }

    /// Returns the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Iterates attributes in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.entries.iter()
    }

    /// Returns the attributes as a slice, in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Attribute] {
        &self.entries
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeMap {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_stringification() {
        assert_eq!(AttributeValue::from(-3_i64).as_str(), "-3");
        assert_eq!(AttributeValue::from(42_usize).as_str(), "42");
        assert_eq!(AttributeValue::from(1.5_f64).as_str(), "1.5");
        assert_eq!(AttributeValue::from('x').as_str(), "x");
        assert_eq!(AttributeValue::from(false).as_str(), "false");
        assert_eq!(AttributeValue::from(String::from("s")).as_str(), "s");
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let mut map = AttributeMap::new();
        map.set("id", "10".into());
        map.set("type", "example".into());
        map.set("alpha", "a".into());
        let names: Vec<&str> = map.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "type", "alpha"]);
    }

    #[test]
    fn test_map_overwrite_keeps_position() {
        let mut map = AttributeMap::new();
        map.set("id", "10".into());
        map.set("type", "example".into());
        let old = map.set("id", 11.into());
        assert_eq!(old.as_deref(), Some("10"));
        assert_eq!(map.len(), 2);
        assert_eq!(map.as_slice()[0].name, "id");
        assert_eq!(map.get("id"), Some("11"));
    }

    #[test]
    fn test_map_get_missing() {
        let map = AttributeMap::new();
        assert!(map.is_empty());
        assert_eq!(map.get("id"), None);
    }
}
