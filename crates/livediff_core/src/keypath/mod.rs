//! Key paths: which property changes a subscription cares about.
//!
//! - [`KeyPath`]: one dotted path, optionally with `*` wildcards
//! - [`KeyPathsCollection`]: a set of paths plus a depth mode
//! - [`KeyPathFilter`]: the collection resolved against a schema

mod collection;
mod filter;
mod path;

pub use collection::{KeyPathsCollection, KeyPathsMode};
pub use filter::KeyPathFilter;
pub use path::{KeyPath, PropertyExpr, WILDCARD};
