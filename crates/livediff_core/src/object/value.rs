//! Dynamic property values and their fingerprints.

use super::ObjectId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;

/// A dynamic property value.
///
/// This is the value carried by snapshot entries and stored in object
/// properties. Links are represented by the target's [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// Text string (UTF-8).
    String(String),
    /// Link to another object.
    Object(ObjectId),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Returns the linked object, if this value is a link.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Total order used for sorting query results.
    ///
    /// Values of different kinds order by kind; floats use IEEE total order
    /// so NaN has a stable place.
    pub fn cmp_sort(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => a.cmp(b),
            (a, b) => a.kind().rank().cmp(&b.kind().rank()),
        }
    }

    fn write_canonical(&self, hasher: &mut Sha256) {
        hasher.update([self.kind().rank()]);
        match self {
            Value::Null => {}
            Value::Bool(b) => hasher.update([u8::from(*b)]),
            Value::Int(i) => hasher.update(i.to_be_bytes()),
            Value::Float(f) => hasher.update(f.to_bits().to_be_bytes()),
            Value::String(s) => {
                hasher.update((s.len() as u64).to_be_bytes());
                hasher.update(s.as_bytes());
            }
            Value::Object(id) => hasher.update(id.as_bytes()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(id) => write!(f, "<{id}>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

/// The kind of a [`Value`], used by schemas to type primitive collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Null.
    Null,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Float.
    Float,
    /// String.
    String,
    /// Object link.
    Object,
}

impl ValueKind {
    const fn rank(self) -> u8 {
        match self {
            ValueKind::Null => 0,
            ValueKind::Bool => 1,
            ValueKind::Int => 2,
            ValueKind::Float => 3,
            ValueKind::String => 4,
            ValueKind::Object => 5,
        }
    }
}

/// Hash of the properties an entry's rendering depends on.
///
/// Two entries with the same key and a different fingerprint changed
/// between snapshots even when no dirty-property information is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprints a single value.
    pub fn of(value: &Value) -> Self {
        Self::of_all(std::iter::once(value))
    }

    /// Fingerprints a sequence of values in order.
    pub fn of_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut hasher = Sha256::new();
        for value in values {
            value.write_canonical(&mut hasher);
        }
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable() {
        let a = Value::from("hello");
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&a.clone()));
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&Value::from("hellO")));
    }

    #[test]
    fn fingerprint_distinguishes_kinds() {
        assert_ne!(
            Fingerprint::of(&Value::Int(1)),
            Fingerprint::of(&Value::Bool(true))
        );
        assert_ne!(
            Fingerprint::of(&Value::Int(0)),
            Fingerprint::of(&Value::Float(0.0))
        );
    }

    #[test]
    fn fingerprint_of_all_is_order_sensitive() {
        let a = Value::Int(1);
        let b = Value::Int(2);
        assert_ne!(Fingerprint::of_all([&a, &b]), Fingerprint::of_all([&b, &a]));
    }

    #[test]
    fn sort_order() {
        assert_eq!(Value::Int(1).cmp_sort(&Value::Int(2)), Ordering::Less);
        assert_eq!(Value::Float(2.5).cmp_sort(&Value::Int(2)), Ordering::Greater);
        assert_eq!(Value::Null.cmp_sort(&Value::from("a")), Ordering::Less);
        assert_eq!(
            Value::from("b").cmp_sort(&Value::from("a")),
            Ordering::Greater
        );
    }
}
