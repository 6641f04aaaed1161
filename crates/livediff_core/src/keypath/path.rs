//! A single dotted property path.

use crate::error::{CoreError, CoreResult};
use crate::object::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Segment that matches any property at its level.
pub const WILDCARD: &str = "*";

/// A parsed property-path filter such as `Friends.FirstName` or `*.Name`.
///
/// Paths are validated for shape on construction. Whether each segment
/// names a real property is only known once the path is resolved against
/// a schema, which happens at subscribe time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath {
    segments: Vec<String>,
    has_wildcard_tail: bool,
}

impl KeyPath {
    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the path is empty, only
    /// whitespace, or contains an empty or whitespace-only segment.
    pub fn parse(path: &str) -> CoreResult<Self> {
        if path.trim().is_empty() {
            return Err(CoreError::configuration(
                "a key path must not be empty or whitespace",
            ));
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if let Some(pos) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(CoreError::configuration(format!(
                "key path '{path}' has an empty segment at position {pos}"
            )));
        }

        Ok(Self::from_segments(segments))
    }

    /// Builds a path from a property-access expression.
    ///
    /// The expression must be a chain of member reads rooted at the lambda
    /// parameter, for example `p => p.Dog.Name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] for method calls, indexers,
    /// constants, or a bare parameter.
    pub fn from_expression(expr: &PropertyExpr) -> CoreResult<Self> {
        let mut segments = Vec::new();
        let mut current = expr;
        loop {
            match current {
                PropertyExpr::Member { target, name } => {
                    segments.push(name.clone());
                    current = target;
                }
                PropertyExpr::Param => break,
                PropertyExpr::Call { method, .. } => {
                    return Err(CoreError::configuration(format!(
                        "key path expressions may only read properties, found call to '{method}'"
                    )));
                }
                PropertyExpr::Index { .. } => {
                    return Err(CoreError::configuration(
                        "key path expressions may only read properties, found an indexer",
                    ));
                }
                PropertyExpr::Constant(value) => {
                    return Err(CoreError::configuration(format!(
                        "key path expressions must start at the parameter, found constant {value}"
                    )));
                }
            }
        }

        if segments.is_empty() {
            return Err(CoreError::configuration(
                "key path expression does not access any property",
            ));
        }
        segments.reverse();
        Self::parse(&segments.join("."))
    }

    fn from_segments(segments: Vec<String>) -> Self {
        let has_wildcard_tail = segments.last().is_some_and(|s| s == WILDCARD);
        Self {
            segments,
            has_wildcard_tail,
        }
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns true if the last segment is `*`.
    pub fn has_wildcard_tail(&self) -> bool {
        self.has_wildcard_tail
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for KeyPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyPath {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<KeyPath> for String {
    fn from(path: KeyPath) -> Self {
        path.to_string()
    }
}

/// A property-access expression tree.
///
/// This is the explicit stand-in for a host-language lambda such as
/// `p => p.Dog.Name`. Build it with [`PropertyExpr::param`] and the
/// chaining helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyExpr {
    /// The lambda parameter.
    Param,
    /// `target.name`
    Member {
        /// Expression the member is read from.
        target: Box<PropertyExpr>,
        /// Property name.
        name: String,
    },
    /// `target.method()`
    Call {
        /// Expression the method is called on.
        target: Box<PropertyExpr>,
        /// Method name.
        method: String,
    },
    /// `target[index]`
    Index {
        /// Indexed expression.
        target: Box<PropertyExpr>,
        /// Index.
        index: usize,
    },
    /// A constant value.
    Constant(Value),
}

impl PropertyExpr {
    /// The lambda parameter.
    pub fn param() -> Self {
        PropertyExpr::Param
    }

    /// Reads a property.
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        PropertyExpr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Calls a method.
    #[must_use]
    pub fn call(self, method: impl Into<String>) -> Self {
        PropertyExpr::Call {
            target: Box::new(self),
            method: method.into(),
        }
    }

    /// Indexes into a collection.
    #[must_use]
    pub fn index(self, index: usize) -> Self {
        PropertyExpr::Index {
            target: Box::new(self),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let path = KeyPath::parse("Friends.FirstName").unwrap();
        assert_eq!(path.segments(), ["Friends", "FirstName"]);
        assert!(!path.has_wildcard_tail());
        assert_eq!(path.to_string(), "Friends.FirstName");
    }

    #[test]
    fn parse_wildcard_tail() {
        let path = KeyPath::parse("Friends.*").unwrap();
        assert!(path.has_wildcard_tail());
        assert!(!KeyPath::parse("*.Name").unwrap().has_wildcard_tail());
    }

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        for bad in ["", "   ", "A..B", ".A", "A.", "A. .B", "*."] {
            let err = KeyPath::parse(bad).unwrap_err();
            assert!(
                matches!(err, CoreError::Configuration { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn from_expression_property_chain() {
        let expr = PropertyExpr::param().member("Dog").member("Name");
        let path = KeyPath::from_expression(&expr).unwrap();
        assert_eq!(path, KeyPath::parse("Dog.Name").unwrap());
    }

    #[test]
    fn from_expression_rejects_method_call() {
        let expr = PropertyExpr::param().member("Name").call("ToUpper");
        assert!(matches!(
            KeyPath::from_expression(&expr),
            Err(CoreError::Configuration { .. })
        ));
    }

    #[test]
    fn from_expression_rejects_indexer_and_constant() {
        let indexed = PropertyExpr::param().member("Friends").index(0).member("Name");
        assert!(KeyPath::from_expression(&indexed).is_err());

        let constant = PropertyExpr::Constant(Value::Int(1)).member("Name");
        assert!(KeyPath::from_expression(&constant).is_err());

        assert!(KeyPath::from_expression(&PropertyExpr::param()).is_err());
    }

    #[test]
    fn serde_as_string() {
        let path = KeyPath::parse("A.B").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"A.B\"");
        let back: KeyPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<KeyPath>("\"A..B\"").is_err());
    }
}
