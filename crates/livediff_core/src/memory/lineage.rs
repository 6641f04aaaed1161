//! Collection lineages of the in-memory source and how they materialize.

use super::state::{Field, ObjectStore};
use crate::error::CoreResult;
use crate::object::{ObjectId, Value};
use crate::snapshot::{CollectionDescriptor, Entry, EntryKey, Materialized, Snapshot};
use crate::types::Version;

/// A live query over one object type: optional equality filter and sort.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsQuery {
    pub(crate) type_name: String,
    pub(crate) filter: Option<(String, Value)>,
    pub(crate) sort: Option<(String, bool)>,
}

impl ResultsQuery {
    /// All objects of a type, in creation order.
    pub fn all(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            filter: None,
            sort: None,
        }
    }

    /// Keeps only objects whose property equals `value`.
    #[must_use]
    pub fn filter_eq(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((property.into(), value.into()));
        self
    }

    /// Orders results by one property.
    #[must_use]
    pub fn sort_by(mut self, property: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some((property.into(), ascending));
        self
    }
}

/// Where a lineage's entries come from. Property names are storage names.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Origin {
    Results(ResultsQuery),
    Property { owner: ObjectId, property: String },
}

#[derive(Debug, Clone)]
pub(crate) struct LineageDef {
    pub(crate) origin: Origin,
    pub(crate) descriptor: CollectionDescriptor,
}

impl LineageDef {
    /// Reads the lineage from `store`.
    pub(crate) fn materialize(&self, store: &ObjectStore, version: Version) -> CoreResult<Materialized> {
        let entries = match &self.origin {
            Origin::Results(query) => results_entries(store, query),
            Origin::Property { owner, property } => {
                let Some(object) = store.get(*owner) else {
                    return Ok(Materialized::Invalidated);
                };
                match object.fields.get(property) {
                    Some(Field::List(slots)) | Some(Field::Set(slots)) => slot_entries(
                        slots.iter().map(|slot| (slot.row, &slot.value)),
                    ),
                    Some(Field::Dictionary(pairs)) => pairs
                        .iter()
                        .map(|(key, value)| Entry::new(EntryKey::Key(key.clone()), value.clone()))
                        .collect(),
                    Some(Field::Value(_)) | None => Vec::new(),
                }
            }
        };
        Snapshot::new(self.descriptor.clone(), version, entries).map(Materialized::Live)
    }

    /// The object owning this lineage, for property collections.
    pub(crate) fn owner(&self) -> Option<ObjectId> {
        match &self.origin {
            Origin::Property { owner, .. } => Some(*owner),
            Origin::Results(_) => None,
        }
    }
}

fn results_entries(store: &ObjectStore, query: &ResultsQuery) -> Vec<Entry> {
    let mut rows: Vec<(ObjectId, Value)> = store
        .table(&query.type_name)
        .iter()
        .filter_map(|&id| store.get(id).map(|object| (id, object)))
        .filter(|(_, object)| match &query.filter {
            Some((property, expected)) => object.value(property) == Some(expected),
            None => true,
        })
        .map(|(id, object)| {
            let key = query
                .sort
                .as_ref()
                .and_then(|(property, _)| object.value(property).cloned())
                .unwrap_or(Value::Null);
            (id, key)
        })
        .collect();

    if let Some((_, ascending)) = &query.sort {
        rows.sort_by(|a, b| {
            let ord = a.1.cmp_sort(&b.1);
            if *ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }

    rows.into_iter()
        .map(|(id, _)| Entry::new(EntryKey::object(id), Value::Object(id)))
        .collect()
}

/// Keys list and set slots by row, for objects and primitives alike, so a
/// slot keeps its identity when elements before it come and go.
fn slot_entries<'a>(slots: impl Iterator<Item = (u64, &'a Value)>) -> Vec<Entry> {
    slots
        .map(|(row, value)| Entry::new(EntryKey::Row(row), value.clone()))
        .collect()
}
