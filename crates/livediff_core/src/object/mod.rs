//! Object identity and property values.

mod id;
mod value;

pub use id::ObjectId;
pub use value::{Fingerprint, Value, ValueKind};
