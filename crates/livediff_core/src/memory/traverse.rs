//! Dirty path discovery.
//!
//! A commit records which properties of which objects it wrote. An entry
//! of a collection is affected by a write when the written object is
//! reachable from the entry; the dirty path is the chain of properties
//! followed to get there plus the written property. Walks follow links,
//! object collections and backlinks and stop at the configured depth. A
//! cycle is just another path. The paths found below an object are
//! memoised per remaining depth, so each object is expanded at most once
//! per depth for the whole walker.

use super::state::ObjectStore;
use crate::dirty::PropertyPath;
use crate::object::ObjectId;
use crate::schema::{PropertyKind, Schema};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Properties written per object, by storage name.
pub(crate) type Writes = HashMap<ObjectId, BTreeSet<String>>;

pub(crate) struct Walker<'a> {
    store: &'a ObjectStore,
    schema: &'a Schema,
    writes: &'a Writes,
    max_depth: usize,
    /// Dirty paths below `(object, remaining depth)`.
    memo: HashMap<(ObjectId, usize), Rc<BTreeSet<PropertyPath>>>,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(
        store: &'a ObjectStore,
        schema: &'a Schema,
        writes: &'a Writes,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            schema,
            writes,
            max_depth,
            memo: HashMap::new(),
        }
    }

    /// Returns every dirty path starting at `root`.
    pub(crate) fn paths_from(&mut self, root: ObjectId) -> BTreeSet<PropertyPath> {
        if self.writes.is_empty() || self.max_depth == 0 {
            return BTreeSet::new();
        }
        self.below(root, self.max_depth).as_ref().clone()
    }

    /// Dirty paths of at most `budget` segments starting at `object`.
    fn below(&mut self, object: ObjectId, budget: usize) -> Rc<BTreeSet<PropertyPath>> {
        if let Some(known) = self.memo.get(&(object, budget)) {
            return Rc::clone(known);
        }

        let mut out = BTreeSet::new();
        if let Some(written) = self.writes.get(&object) {
            out.extend(written.iter().map(|property| PropertyPath::new([property.as_str()])));
        }
        if budget > 1 {
            for (segment, next) in self.neighbors(object) {
                let rest = self.below(next, budget - 1);
                out.extend(rest.iter().map(|tail| {
                    PropertyPath::new(
                        std::iter::once(segment.as_str())
                            .chain(tail.segments().iter().map(String::as_str)),
                    )
                }));
            }
        }

        let out = Rc::new(out);
        self.memo.insert((object, budget), Rc::clone(&out));
        out
    }

    /// Objects one hop away, with the storage name of the hop.
    fn neighbors(&self, id: ObjectId) -> Vec<(String, ObjectId)> {
        let Some(object) = self.store.get(id) else {
            return Vec::new();
        };
        let Some(object_schema) = self.schema.get(&object.type_name) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for property in &object_schema.properties {
            match &property.kind {
                PropertyKind::Scalar(_) => {}
                PropertyKind::Backlink {
                    source_type,
                    source_property,
                } => {
                    for source in self.store.backlinks(id, source_type, source_property) {
                        out.push((property.storage_name.clone(), source));
                    }
                }
                _ => {
                    if let Some(field) = object.fields.get(&property.storage_name) {
                        let mut targets: Vec<ObjectId> = field.objects().collect();
                        targets.sort();
                        targets.dedup();
                        out.extend(
                            targets
                                .into_iter()
                                .map(|target| (property.storage_name.clone(), target)),
                        );
                    }
                }
            }
        }
        out
    }
}
