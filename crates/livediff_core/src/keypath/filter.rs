//! Key paths resolved against a schema and matched against dirty paths.

use super::{KeyPath, KeyPathsCollection, KeyPathsMode, WILDCARD};
use crate::dirty::PropertyPath;
use crate::error::{CoreError, CoreResult};
use crate::schema::{ElementType, Schema};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Any property at this level.
    Any,
    /// One of these storage names. A name after a wildcard may resolve to
    /// different storage names on different types.
    Named(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pattern {
    steps: Vec<Step>,
    /// Patterns synthesized for full mode never match through backlinks.
    implicit: bool,
}

impl Pattern {
    fn implicit_wildcards(depth: usize) -> Self {
        Self {
            steps: vec![Step::Any; depth],
            implicit: true,
        }
    }

    fn covers(&self, path: &PropertyPath) -> bool {
        path.len() <= self.steps.len()
            && self
                .steps
                .iter()
                .zip(path.segments())
                .all(|(step, segment)| match step {
                    Step::Any => true,
                    Step::Named(names) => names.contains(segment),
                })
    }
}

/// A [`KeyPathsCollection`] validated against the element schema of one
/// collection, ready to decide which dirty paths count as modifications.
#[derive(Debug, Clone)]
pub struct KeyPathFilter {
    mode: KeyPathsMode,
    patterns: Vec<Pattern>,
    schema: Option<Arc<Schema>>,
    root_type: Option<String>,
}

impl KeyPathFilter {
    /// A filter that never reports modifications.
    pub fn shallow() -> Self {
        Self {
            mode: KeyPathsMode::Shallow,
            patterns: Vec::new(),
            schema: None,
            root_type: None,
        }
    }

    /// A full-depth filter that does not consult any schema.
    ///
    /// Without a schema backlinks cannot be recognized, so every path up to
    /// `depth` segments matches. Used for primitive collections and
    /// schema-less tooling.
    pub fn unchecked_full(depth: usize) -> Self {
        Self {
            mode: KeyPathsMode::Full,
            patterns: vec![Pattern::implicit_wildcards(depth)],
            schema: None,
            root_type: None,
        }
    }

    /// Resolves key paths for a collection with the given element type.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidOperation`] if explicit key paths are used on a
    ///   collection of primitives.
    /// - [`CoreError::Argument`] if a segment names an unknown property or
    ///   continues past a scalar.
    pub fn resolve(
        key_paths: &KeyPathsCollection,
        schema: &Arc<Schema>,
        element: &ElementType,
        full_depth: usize,
    ) -> CoreResult<Self> {
        let root_type = element.object_type();
        match key_paths.mode() {
            KeyPathsMode::Shallow => Ok(Self::shallow()),
            KeyPathsMode::Full => match root_type {
                Some(root) => {
                    schema.object(root)?;
                    Ok(Self {
                        mode: KeyPathsMode::Full,
                        patterns: vec![Pattern::implicit_wildcards(full_depth)],
                        schema: Some(Arc::clone(schema)),
                        root_type: Some(root.to_string()),
                    })
                }
                None => Ok(Self::unchecked_full(full_depth)),
            },
            KeyPathsMode::Explicit => {
                let root = root_type.ok_or_else(|| {
                    CoreError::invalid_operation(
                        "key paths can be used only with collections of objects",
                    )
                })?;
                let patterns = key_paths
                    .paths()
                    .iter()
                    .map(|path| compile(path, schema, root))
                    .collect::<CoreResult<Vec<_>>>()?;
                Ok(Self {
                    mode: KeyPathsMode::Explicit,
                    patterns,
                    schema: Some(Arc::clone(schema)),
                    root_type: Some(root.to_string()),
                })
            }
        }
    }

    /// Returns the mode the filter was resolved from.
    pub fn mode(&self) -> KeyPathsMode {
        self.mode
    }

    /// Returns true if the filter never matches.
    pub fn is_shallow(&self) -> bool {
        self.mode == KeyPathsMode::Shallow
    }

    /// Returns true if a change along `path` should be reported.
    pub fn matches(&self, path: &PropertyPath) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.covers(path) && !(pattern.implicit && self.crosses_backlink(path)))
    }

    /// Returns true if any of the paths matches.
    pub fn matches_any<'a>(&self, paths: impl IntoIterator<Item = &'a PropertyPath>) -> bool {
        !self.is_shallow() && paths.into_iter().any(|p| self.matches(p))
    }

    fn crosses_backlink(&self, path: &PropertyPath) -> bool {
        let (Some(schema), Some(root)) = (&self.schema, &self.root_type) else {
            return false;
        };
        let mut current = root.as_str();
        for segment in path.segments() {
            let Some(property) = schema
                .get(current)
                .and_then(|o| o.property_by_storage_name(segment))
            else {
                return false;
            };
            if property.is_backlink() {
                return true;
            }
            match property.target_type() {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }
}

enum Previous {
    Root,
    Named { segment: String, type_name: String },
    Wildcard { scope: String },
}

fn describe(scope: &BTreeSet<String>) -> String {
    scope.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Validates one key path hop by hop and compiles it to storage names.
fn compile(path: &KeyPath, schema: &Schema, root: &str) -> CoreResult<Pattern> {
    let mut scope: BTreeSet<String> = BTreeSet::from([root.to_string()]);
    let mut previous = Previous::Root;
    let mut steps = Vec::with_capacity(path.len());

    for segment in path.segments() {
        if segment == WILDCARD {
            if let (true, Previous::Named { segment, type_name }) = (scope.is_empty(), &previous) {
                return Err(CoreError::not_traversable(segment, type_name));
            }
            let mut next = BTreeSet::new();
            for type_name in &scope {
                for property in &schema.object(type_name)?.properties {
                    if let Some(target) = property.target_type() {
                        next.insert(target.to_string());
                    }
                }
            }
            steps.push(Step::Any);
            previous = Previous::Wildcard {
                scope: describe(&scope),
            };
            scope = next;
            continue;
        }

        if scope.is_empty() {
            return Err(match previous {
                Previous::Named { segment, type_name } => {
                    CoreError::not_traversable(segment, type_name)
                }
                Previous::Wildcard { scope } => CoreError::unknown_property(segment, scope),
                Previous::Root => CoreError::unknown_property(segment, root),
            });
        }

        let mut storage_names = BTreeSet::new();
        let mut next = BTreeSet::new();
        let mut declared_on = None;
        for type_name in &scope {
            if let Some(property) = schema.object(type_name)?.property(segment) {
                storage_names.insert(property.storage_name.clone());
                declared_on.get_or_insert_with(|| type_name.clone());
                if let Some(target) = property.target_type() {
                    next.insert(target.to_string());
                }
            }
        }
        let Some(type_name) = declared_on else {
            return Err(CoreError::unknown_property(segment, describe(&scope)));
        };
        steps.push(Step::Named(storage_names));
        previous = Previous::Named {
            segment: segment.clone(),
            type_name,
        };
        scope = next;
    }

    Ok(Pattern {
        steps,
        implicit: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ValueKind;
    use crate::schema::{ObjectSchema, Property};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new()
                .with_type(
                    ObjectSchema::new("Person")
                        .with(Property::scalar("FirstName", ValueKind::String))
                        .with(Property::scalar("LastName", ValueKind::String))
                        .with(Property::scalar("Age", ValueKind::Int).mapped_to("_age"))
                        .with(Property::link("Dog", "Dog"))
                        .with(Property::list("Friends", ElementType::object("Person"))),
                )
                .with_type(
                    ObjectSchema::new("Dog")
                        .with(Property::scalar("Name", ValueKind::String))
                        .with(Property::backlink("Owners", "Person", "Dog")),
                ),
        )
    }

    fn person() -> ElementType {
        ElementType::object("Person")
    }

    fn explicit(paths: &[&str]) -> CoreResult<KeyPathFilter> {
        let key_paths = KeyPathsCollection::parse_all(paths).unwrap();
        KeyPathFilter::resolve(&key_paths, &schema(), &person(), 4)
    }

    #[test]
    fn shallow_never_matches() {
        let filter =
            KeyPathFilter::resolve(&KeyPathsCollection::shallow(), &schema(), &person(), 4)
                .unwrap();
        assert!(!filter.matches(&PropertyPath::dotted("FirstName")));
        assert!(!filter.matches(&PropertyPath::root()));
    }

    #[test]
    fn full_matches_up_to_depth() {
        let filter =
            KeyPathFilter::resolve(&KeyPathsCollection::full(), &schema(), &person(), 4).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("FirstName")));
        assert!(filter.matches(&PropertyPath::dotted("Friends.Friends.Friends.FirstName")));
        assert!(!filter.matches(&PropertyPath::dotted("Friends.Friends.Friends.Friends.FirstName")));
    }

    #[test]
    fn full_ignores_backlinks() {
        let filter =
            KeyPathFilter::resolve(&KeyPathsCollection::full(), &schema(), &person(), 4).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("Dog.Name")));
        assert!(!filter.matches(&PropertyPath::dotted("Dog.Owners")));
        assert!(!filter.matches(&PropertyPath::dotted("Dog.Owners.FirstName")));
    }

    #[test]
    fn explicit_names_backlinks() {
        let filter = explicit(&["Dog.Owners.FirstName"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("Dog.Owners.FirstName")));
        assert!(!filter.matches(&PropertyPath::dotted("Dog.Owners.LastName")));
        assert!(filter.matches(&PropertyPath::dotted("Dog")));
    }

    #[test]
    fn explicit_exact_and_prefix() {
        let filter = explicit(&["FirstName"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("FirstName")));
        assert!(!filter.matches(&PropertyPath::dotted("LastName")));

        let filter = explicit(&["Dog.Name"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("Dog")));
        assert!(filter.matches(&PropertyPath::dotted("Dog.Name")));
        assert!(!filter.matches(&PropertyPath::dotted("FirstName")));
    }

    #[test]
    fn wildcard_then_name() {
        let filter = explicit(&["*.FirstName"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("Friends")));
        assert!(filter.matches(&PropertyPath::dotted("Friends.FirstName")));
        assert!(!filter.matches(&PropertyPath::dotted("Friends.LastName")));
        assert!(filter.matches(&PropertyPath::dotted("LastName")));
    }

    #[test]
    fn storage_names_are_matched() {
        let filter = explicit(&["Age"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("_age")));
        assert!(!filter.matches(&PropertyPath::dotted("Age")));
    }

    #[test]
    fn deep_wildcards_exceed_default() {
        let filter = explicit(&["*.*.*.*.*"]).unwrap();
        assert!(filter.matches(&PropertyPath::dotted("Friends.Friends.Friends.Friends.FirstName")));
    }

    #[test]
    fn unknown_property_is_argument_error() {
        let err = explicit(&["Nope"]).unwrap_err();
        assert!(matches!(err, CoreError::Argument { ref property, ref type_name, .. }
            if property == "Nope" && type_name == "Person"));

        let err = explicit(&["Friends.unknownProp"]).unwrap_err();
        assert!(matches!(err, CoreError::Argument { ref property, ref type_name, .. }
            if property == "unknownProp" && type_name == "Person"));
    }

    #[test]
    fn scalar_traversal_is_argument_error() {
        for path in ["FirstName.*", "FirstName.Length"] {
            let err = explicit(&[path]).unwrap_err();
            assert!(matches!(err, CoreError::Argument { ref property, .. } if property == "FirstName"),
                "{path}: {err:?}");
        }
    }

    #[test]
    fn explicit_on_primitives_is_invalid() {
        let key_paths = KeyPathsCollection::parse_all(["Anything"]).unwrap();
        let err = KeyPathFilter::resolve(
            &key_paths,
            &schema(),
            &ElementType::Primitive(ValueKind::Int),
            4,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }

    #[test]
    fn full_on_primitives_matches_root() {
        let filter = KeyPathFilter::resolve(
            &KeyPathsCollection::full(),
            &schema(),
            &ElementType::Primitive(ValueKind::Int),
            4,
        )
        .unwrap();
        assert!(filter.matches(&PropertyPath::root()));
    }
}
