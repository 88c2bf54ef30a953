use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Ordered set of CSS class tokens.
///
/// Tokens keep their insertion order and appear at most once. The list is only
/// joined into a space-separated string at the render boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    tokens: Vec<String>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-separated class string
    pub fn parse(classes: &str) -> Self {
        let mut list = Self::new();
        for token in classes.split_whitespace() {
            list.add(token);
        }
        list
    }

    /// Build from a JSON string (`"a b"`) or array of strings (`["a", "b c"]`).
    /// Anything else yields an empty list.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) => {
                let mut list = Self::new();
                for item in items {
                    list.extend(Self::from_value(item));
                }
                list
            }
            _ => Self::new(),
        }
    }

    /// Add a token (or several space-separated tokens). Returns true if anything was added.
    pub fn add(&mut self, token: &str) -> bool {
        let mut added = false;
        for t in token.split_whitespace() {
            if !self.contains(t) {
                self.tokens.push(t.to_string());
                added = true;
            }
        }
        added
    }

    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        before != self.tokens.len()
    }

    /// Toggle a token, returning whether it is present afterwards
    pub fn toggle(&mut self, token: &str) -> bool {
        if self.remove(token) {
            false
        } else {
            self.add(token);
            true
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn extend(&mut self, other: ClassList) {
        for token in other.tokens {
            if !self.contains(&token) {
                self.tokens.push(token);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

impl Serialize for ClassList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> FromIterator<&'a str> for ClassList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = Self::new();
        for token in iter {
            list.add(token);
        }
        list
    }
}

impl From<&str> for ClassList {
    fn from(classes: &str) -> Self {
        Self::parse(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dedups_and_keeps_order() {
        let list = ClassList::parse("  b a  b c ");
        assert_eq!(list.to_string(), "b a c");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_add_remove_toggle() {
        let mut list = ClassList::parse("container");
        assert!(list.add("md animate"));
        assert!(!list.add("md"));
        assert!(list.remove("md"));
        assert!(!list.remove("md"));
        assert!(list.toggle("open"));
        assert!(!list.toggle("open"));
        assert_eq!(list.to_string(), "container animate");
    }

    #[test]
    fn test_from_value() {
        assert_eq!(ClassList::from_value(&json!("a b")).to_string(), "a b");
        assert_eq!(ClassList::from_value(&json!(["a", "b c", "a"])).to_string(), "a b c");
        assert!(ClassList::from_value(&json!(42)).is_empty());
    }
}
