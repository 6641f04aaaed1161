//! Explicit object schema table.
//!
//! Key paths are resolved against this table once, at subscribe time. Each
//! property carries both its public name and the name it is persisted
//! under; filters always match on the persisted name so that aliased
//! properties keep working.

use crate::error::{CoreError, CoreResult};
use crate::object::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element type of a collection property or a top-level collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Objects of the named type.
    Object(String),
    /// Primitive values of the given kind.
    Primitive(ValueKind),
}

impl ElementType {
    /// Creates an object element type.
    pub fn object(type_name: impl Into<String>) -> Self {
        ElementType::Object(type_name.into())
    }

    /// Returns the object type name for object elements.
    pub fn object_type(&self) -> Option<&str> {
        match self {
            ElementType::Object(name) => Some(name),
            ElementType::Primitive(_) => None,
        }
    }

    /// Returns true if elements have object identity.
    pub fn is_object(&self) -> bool {
        matches!(self, ElementType::Object(_))
    }
}

/// What a property holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// A single primitive value.
    Scalar(ValueKind),
    /// A to-one link to an object of the target type.
    Link {
        /// Target object type.
        target: String,
    },
    /// An ordered list.
    List(ElementType),
    /// An unordered set.
    Set(ElementType),
    /// A string-keyed dictionary.
    Dictionary(ElementType),
    /// Objects of `source_type` whose `source_property` links here.
    Backlink {
        /// Type that holds the forward link.
        source_type: String,
        /// Forward link property on the source type (storage name).
        source_property: String,
    },
}

/// A property on an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Name used by application code.
    pub name: String,
    /// Name the property is persisted under.
    pub storage_name: String,
    /// What the property holds.
    pub kind: PropertyKind,
}

impl Property {
    fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        let name = name.into();
        Self {
            storage_name: name.clone(),
            name,
            kind,
        }
    }

    /// Creates a scalar property.
    pub fn scalar(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(name, PropertyKind::Scalar(kind))
    }

    /// Creates a to-one link property.
    pub fn link(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            PropertyKind::Link {
                target: target.into(),
            },
        )
    }

    /// Creates a list property.
    pub fn list(name: impl Into<String>, element: ElementType) -> Self {
        Self::new(name, PropertyKind::List(element))
    }

    /// Creates a set property.
    pub fn set(name: impl Into<String>, element: ElementType) -> Self {
        Self::new(name, PropertyKind::Set(element))
    }

    /// Creates a dictionary property.
    pub fn dictionary(name: impl Into<String>, element: ElementType) -> Self {
        Self::new(name, PropertyKind::Dictionary(element))
    }

    /// Creates a backlink property.
    pub fn backlink(
        name: impl Into<String>,
        source_type: impl Into<String>,
        source_property: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            PropertyKind::Backlink {
                source_type: source_type.into(),
                source_property: source_property.into(),
            },
        )
    }

    /// Persists the property under a different name.
    #[must_use]
    pub fn mapped_to(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    /// Returns the object type reached by following this property.
    ///
    /// `None` for scalars and primitive collections.
    pub fn target_type(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Scalar(_) => None,
            PropertyKind::Link { target } => Some(target),
            PropertyKind::List(e) | PropertyKind::Set(e) | PropertyKind::Dictionary(e) => {
                e.object_type()
            }
            PropertyKind::Backlink { source_type, .. } => Some(source_type),
        }
    }

    /// Returns true if a key path may continue past this property.
    pub fn is_traversable(&self) -> bool {
        self.target_type().is_some()
    }

    /// Returns true for backlink properties.
    pub fn is_backlink(&self) -> bool {
        matches!(self.kind, PropertyKind::Backlink { .. })
    }

    /// Returns the element type for collection properties.
    pub fn collection_element(&self) -> Option<&ElementType> {
        match &self.kind {
            PropertyKind::List(e) | PropertyKind::Set(e) | PropertyKind::Dictionary(e) => Some(e),
            _ => None,
        }
    }
}

/// Schema of one object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Type name.
    pub name: String,
    /// Properties in declaration order.
    pub properties: Vec<Property>,
}

impl ObjectSchema {
    /// Creates an empty object schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Finds a property by public name, falling back to the storage name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.property_by_storage_name(name))
    }

    /// Finds a property by its persisted name.
    pub fn property_by_storage_name(&self, storage_name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.storage_name == storage_name)
    }
}

/// The schema table: object type name to object schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    types: BTreeMap<String, ObjectSchema>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object type.
    #[must_use]
    pub fn with_type(mut self, object: ObjectSchema) -> Self {
        self.types.insert(object.name.clone(), object);
        self
    }

    /// Looks up an object type.
    pub fn get(&self, type_name: &str) -> Option<&ObjectSchema> {
        self.types.get(type_name)
    }

    /// Looks up an object type, failing if it is unknown.
    pub fn object(&self, type_name: &str) -> CoreResult<&ObjectSchema> {
        self.get(type_name).ok_or_else(|| {
            CoreError::invalid_operation(format!("type '{type_name}' is not part of the schema"))
        })
    }

    /// Resolves a property by public or storage name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Argument`] naming the property and declaring
    /// type when it does not exist.
    pub fn resolve(&self, type_name: &str, property: &str) -> CoreResult<&Property> {
        self.object(type_name)?
            .property(property)
            .ok_or_else(|| CoreError::unknown_property(property, type_name))
    }

    /// Iterates over all object types.
    pub fn types(&self) -> impl Iterator<Item = &ObjectSchema> {
        self.types.values()
    }

    /// Checks that every link target exists and every backlink points at a
    /// forward link to its declaring type.
    pub fn validate(&self) -> CoreResult<()> {
        for object in self.types.values() {
            for property in &object.properties {
                if let Some(target) = property.target_type() {
                    if !self.types.contains_key(target) {
                        return Err(CoreError::invalid_operation(format!(
                            "property '{}.{}' targets unknown type '{target}'",
                            object.name, property.name
                        )));
                    }
                }
                if let PropertyKind::Backlink {
                    source_type,
                    source_property,
                } = &property.kind
                {
                    let forward = self
                        .object(source_type)?
                        .property_by_storage_name(source_property)
                        .ok_or_else(|| CoreError::unknown_property(source_property, source_type))?;
                    if forward.target_type() != Some(object.name.as_str()) || forward.is_backlink()
                    {
                        return Err(CoreError::invalid_operation(format!(
                            "backlink '{}.{}' does not match a link from '{source_type}.{source_property}'",
                            object.name, property.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_type(
                ObjectSchema::new("Person")
                    .with(Property::scalar("FirstName", ValueKind::String))
                    .with(Property::scalar("Age", ValueKind::Int).mapped_to("_age"))
                    .with(Property::link("Dog", "Dog"))
                    .with(Property::list("Friends", ElementType::object("Person"))),
            )
            .with_type(
                ObjectSchema::new("Dog")
                    .with(Property::scalar("Name", ValueKind::String))
                    .with(Property::backlink("Owners", "Person", "Dog")),
            )
    }

    #[test]
    fn resolve_by_public_and_storage_name() {
        let s = schema();
        assert_eq!(s.resolve("Person", "Age").unwrap().storage_name, "_age");
        assert_eq!(s.resolve("Person", "_age").unwrap().name, "Age");
    }

    #[test]
    fn resolve_unknown_property() {
        let err = schema().resolve("Person", "Nope").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Argument { ref property, ref type_name, .. }
                if property == "Nope" && type_name == "Person"
        ));
    }

    #[test]
    fn traversability() {
        let s = schema();
        assert!(!s.resolve("Person", "FirstName").unwrap().is_traversable());
        assert_eq!(s.resolve("Person", "Friends").unwrap().target_type(), Some("Person"));
        assert_eq!(s.resolve("Dog", "Owners").unwrap().target_type(), Some("Person"));
    }

    #[test]
    fn validate_accepts_consistent_schema() {
        schema().validate().unwrap();
    }

    #[test]
    fn validate_rejects_dangling_link() {
        let s = Schema::new().with_type(ObjectSchema::new("A").with(Property::link("B", "Missing")));
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_mismatched_backlink() {
        let s = schema().with_type(
            ObjectSchema::new("Cat").with(Property::backlink("Owners", "Person", "Dog")),
        );
        assert!(s.validate().is_err());
    }
}
