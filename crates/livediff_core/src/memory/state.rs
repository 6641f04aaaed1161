//! Object storage for the in-memory source.

use crate::error::{CoreError, CoreResult};
use crate::object::{ObjectId, Value};
use crate::schema::{ElementType, ObjectSchema, PropertyKind};
use std::collections::{BTreeMap, HashMap};

/// A primitive or object slot in a list or set.
///
/// `row` is stable across moves and in-place updates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot {
    pub(crate) row: u64,
    pub(crate) value: Value,
}

/// Stored content of one property.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Field {
    Value(Value),
    List(Vec<Slot>),
    Set(Vec<Slot>),
    Dictionary(Vec<(String, Value)>),
}

impl Field {
    fn empty_for(kind: &PropertyKind) -> Option<Self> {
        match kind {
            PropertyKind::Scalar(_) | PropertyKind::Link { .. } => Some(Field::Value(Value::Null)),
            PropertyKind::List(_) => Some(Field::List(Vec::new())),
            PropertyKind::Set(_) => Some(Field::Set(Vec::new())),
            PropertyKind::Dictionary(_) => Some(Field::Dictionary(Vec::new())),
            PropertyKind::Backlink { .. } => None,
        }
    }

    /// Iterates over the objects this field references.
    pub(crate) fn objects(&self) -> Box<dyn Iterator<Item = ObjectId> + '_> {
        match self {
            Field::Value(value) => Box::new(value.as_object().into_iter()),
            Field::List(slots) | Field::Set(slots) => {
                Box::new(slots.iter().filter_map(|slot| slot.value.as_object()))
            }
            Field::Dictionary(entries) => {
                Box::new(entries.iter().filter_map(|(_, value)| value.as_object()))
            }
        }
    }

    /// Returns true if the field references `target`.
    pub(crate) fn references(&self, target: ObjectId) -> bool {
        self.objects().any(|id| id == target)
    }

    /// Drops every reference to `target`. Returns true if anything changed.
    fn unlink(&mut self, target: ObjectId) -> bool {
        let target = Value::Object(target);
        match self {
            Field::Value(value) if *value == target => {
                *value = Value::Null;
                true
            }
            Field::Value(_) => false,
            Field::List(slots) | Field::Set(slots) => {
                let before = slots.len();
                slots.retain(|slot| slot.value != target);
                slots.len() != before
            }
            Field::Dictionary(entries) => {
                let mut changed = false;
                for (_, value) in entries.iter_mut() {
                    if *value == target {
                        *value = Value::Null;
                        changed = true;
                    }
                }
                changed
            }
        }
    }
}

/// One stored object. Fields are keyed by storage name.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredObject {
    pub(crate) type_name: String,
    pub(crate) fields: BTreeMap<String, Field>,
}

impl StoredObject {
    pub(crate) fn new(schema: &ObjectSchema) -> Self {
        let fields = schema
            .properties
            .iter()
            .filter_map(|p| Field::empty_for(&p.kind).map(|f| (p.storage_name.clone(), f)))
            .collect();
        Self {
            type_name: schema.name.clone(),
            fields,
        }
    }

    /// Reads a plain value field; collections read as `None`.
    pub(crate) fn value(&self, storage_name: &str) -> Option<&Value> {
        match self.fields.get(storage_name) {
            Some(Field::Value(value)) => Some(value),
            _ => None,
        }
    }
}

/// All committed objects.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectStore {
    objects: HashMap<ObjectId, StoredObject>,
    /// Object ids per type, in creation order.
    tables: BTreeMap<String, Vec<ObjectId>>,
    next_row: u64,
}

impl ObjectStore {
    pub(crate) fn get(&self, id: ObjectId) -> Option<&StoredObject> {
        self.objects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> CoreResult<&mut StoredObject> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| CoreError::ObjectNotFound {
                object_id: id.to_string(),
            })
    }

    pub(crate) fn require(&self, id: ObjectId) -> CoreResult<&StoredObject> {
        self.get(id).ok_or_else(|| CoreError::ObjectNotFound {
            object_id: id.to_string(),
        })
    }

    pub(crate) fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    /// Object ids of a type, in creation order.
    pub(crate) fn table(&self, type_name: &str) -> &[ObjectId] {
        self.tables.get(type_name).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn next_row(&mut self) -> u64 {
        self.next_row += 1;
        self.next_row
    }

    pub(crate) fn insert(&mut self, id: ObjectId, object: StoredObject) {
        self.tables
            .entry(object.type_name.clone())
            .or_default()
            .push(id);
        self.objects.insert(id, object);
    }

    /// Removes an object and every reference to it.
    ///
    /// Returns the `(object, storage name)` pairs whose content changed.
    pub(crate) fn remove(&mut self, id: ObjectId) -> CoreResult<Vec<(ObjectId, String)>> {
        let removed = self.objects.remove(&id).ok_or_else(|| CoreError::ObjectNotFound {
            object_id: id.to_string(),
        })?;
        if let Some(table) = self.tables.get_mut(&removed.type_name) {
            table.retain(|other| *other != id);
        }

        let mut touched = Vec::new();
        for (&owner, object) in &mut self.objects {
            for (name, field) in &mut object.fields {
                if field.unlink(id) {
                    touched.push((owner, name.clone()));
                }
            }
        }
        touched.sort();
        Ok(touched)
    }

    /// Objects of `source_type` whose `source_property` references `target`.
    pub(crate) fn backlinks(
        &self,
        target: ObjectId,
        source_type: &str,
        source_property: &str,
    ) -> Vec<ObjectId> {
        self.table(source_type)
            .iter()
            .copied()
            .filter(|id| {
                self.get(*id)
                    .and_then(|object| object.fields.get(source_property))
                    .is_some_and(|field| field.references(target))
            })
            .collect()
    }
}

/// Checks that `value` may be stored where `element` is expected.
pub(crate) fn check_element(
    store: &ObjectStore,
    element: &ElementType,
    value: &Value,
) -> CoreResult<()> {
    match (element, value) {
        (ElementType::Object(expected), Value::Object(id)) => {
            let object = store.require(*id)?;
            if object.type_name == *expected {
                Ok(())
            } else {
                Err(CoreError::invalid_operation(format!(
                    "expected an object of type '{expected}', got '{}'",
                    object.type_name
                )))
            }
        }
        (ElementType::Primitive(kind), value) if value.kind() == *kind => Ok(()),
        (element, value) => Err(CoreError::invalid_operation(format!(
            "value {value} does not fit element type {element:?}"
        ))),
    }
}
