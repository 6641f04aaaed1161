//! In-memory reference data source.
//!
//! `MemorySource` implements [`SnapshotSource`] over a plain object graph
//! held in memory. It has a single writer, versioned commits, links, lists,
//! sets, dictionaries, backlinks and simple sorted results. It keeps only
//! the latest state: a snapshot is always read at the latest committed
//! version.
//!
//! ```rust,ignore
//! let source = Arc::new(MemorySource::new(schema)?);
//! let people = source.results(ResultsQuery::all("Person").sort_by("Name", true))?;
//! source.transaction(|txn| {
//!     let alice = txn.create("Person")?;
//!     txn.set(alice, "Name", "Alice")
//! })?;
//! ```

mod lineage;
mod state;
mod transaction;
mod traverse;

pub use lineage::ResultsQuery;
pub use transaction::WriteTransaction;

use crate::dirty::DirtySet;
use crate::error::{CoreError, CoreResult};
use crate::object::{ObjectId, Value};
use crate::schema::{ElementType, PropertyKind, Schema};
use crate::snapshot::{CollectionDescriptor, CollectionKind, EntryKey, Materialized};
use crate::source::{CommitHook, SnapshotSource};
use crate::types::{LineageId, Version};
use lineage::{LineageDef, Origin};
use parking_lot::{Mutex, RwLock};
use state::ObjectStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use traverse::{Walker, Writes};

/// Configuration for [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemorySourceConfig {
    /// Longest property path reported by dirty path discovery.
    pub max_traversal_depth: usize,
}

impl Default for MemorySourceConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: 8,
        }
    }
}

impl MemorySourceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the traversal depth.
    #[must_use]
    pub const fn max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = depth;
        self
    }
}

struct SourceState {
    version: Version,
    store: ObjectStore,
    lineages: BTreeMap<LineageId, LineageDef>,
    next_lineage: u64,
    /// Writes of each commit, in commit order.
    log: Vec<(Version, Writes)>,
}

/// An in-memory [`SnapshotSource`].
pub struct MemorySource {
    schema: Arc<Schema>,
    config: MemorySourceConfig,
    state: RwLock<SourceState>,
    /// Serializes write transactions.
    writer: Mutex<()>,
    hooks: RwLock<Vec<CommitHook>>,
}

impl MemorySource {
    /// Creates an empty source.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema references unknown types.
    pub fn new(schema: Schema) -> CoreResult<Self> {
        Self::with_config(schema, MemorySourceConfig::default())
    }

    /// Creates an empty source with custom configuration.
    pub fn with_config(schema: Schema, config: MemorySourceConfig) -> CoreResult<Self> {
        schema.validate()?;
        Ok(Self {
            schema: Arc::new(schema),
            config,
            state: RwLock::new(SourceState {
                version: Version::ZERO,
                store: ObjectStore::default(),
                lineages: BTreeMap::new(),
                next_lineage: 1,
                log: Vec::new(),
            }),
            writer: Mutex::new(()),
            hooks: RwLock::new(Vec::new()),
        })
    }

    /// Returns the latest committed version.
    pub fn committed_version(&self) -> Version {
        self.state.read().version
    }

    /// Returns the number of live objects.
    pub fn object_count(&self) -> usize {
        self.state.read().store.len()
    }

    /// Reads a committed scalar or link property.
    pub fn get(&self, id: ObjectId, property: &str) -> CoreResult<Value> {
        let state = self.state.read();
        let object = state.store.require(id)?;
        let prop = self.schema.resolve(&object.type_name, property)?;
        Ok(object
            .value(&prop.storage_name)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Runs a write transaction and commits it.
    ///
    /// The closure works on a private copy of the data. If it returns an
    /// error nothing is committed. On success the version advances and
    /// every commit hook is called, after the state lock is released.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>,
    {
        let _writer = self.writer.lock();
        let mut store = self.state.read().store.clone();

        let mut txn = WriteTransaction::new(&self.schema, &mut store);
        let result = f(&mut txn)?;
        let writes = txn.into_writes();

        let version = {
            let mut state = self.state.write();
            let version = state.version.next();
            state.version = version;
            state.store = store;
            state.log.push((version, writes));
            version
        };
        tracing::debug!(version = %version, "transaction committed");

        let hooks: Vec<CommitHook> = self.hooks.read().clone();
        for hook in hooks {
            hook(version);
        }
        Ok(result)
    }

    /// Registers a live query and returns its lineage.
    ///
    /// Registering an equal query again returns the same lineage.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types or properties.
    pub fn results(&self, query: ResultsQuery) -> CoreResult<LineageId> {
        let object = self.schema.object(&query.type_name)?;
        let storage = |name: &str| -> CoreResult<String> {
            object
                .property(name)
                .map(|p| p.storage_name.clone())
                .ok_or_else(|| CoreError::unknown_property(name, &object.name))
        };
        let resolved = ResultsQuery {
            filter: match query.filter {
                Some((name, value)) => Some((storage(&name)?, value)),
                None => None,
            },
            sort: match query.sort {
                Some((name, ascending)) => Some((storage(&name)?, ascending)),
                None => None,
            },
            type_name: query.type_name,
        };
        let element = ElementType::object(resolved.type_name.clone());
        self.register(Origin::Results(resolved), CollectionKind::Results, element)
    }

    /// Registers the list, set or dictionary property of an object and
    /// returns its lineage.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the property is not
    /// a collection.
    pub fn property_collection(&self, owner: ObjectId, property: &str) -> CoreResult<LineageId> {
        let (storage_name, kind, element) = {
            let state = self.state.read();
            let object = state.store.require(owner)?;
            let prop = self.schema.resolve(&object.type_name, property)?;
            let kind = match &prop.kind {
                PropertyKind::List(_) => CollectionKind::List,
                PropertyKind::Set(_) => CollectionKind::Set,
                PropertyKind::Dictionary(_) => CollectionKind::Dictionary,
                _ => {
                    return Err(CoreError::invalid_operation(format!(
                        "property '{}.{}' is not a collection",
                        object.type_name, prop.name
                    )))
                }
            };
            let element = prop
                .collection_element()
                .cloned()
                .ok_or_else(|| CoreError::source("collection without element type"))?;
            (prop.storage_name.clone(), kind, element)
        };
        self.register(
            Origin::Property {
                owner,
                property: storage_name,
            },
            kind,
            element,
        )
    }

    fn register(
        &self,
        origin: Origin,
        kind: CollectionKind,
        element: ElementType,
    ) -> CoreResult<LineageId> {
        let mut state = self.state.write();
        if let Some((&id, _)) = state.lineages.iter().find(|(_, def)| def.origin == origin) {
            return Ok(id);
        }
        let lineage = LineageId::new(state.next_lineage);
        state.next_lineage += 1;
        state.lineages.insert(
            lineage,
            LineageDef {
                origin,
                descriptor: CollectionDescriptor {
                    lineage,
                    kind,
                    element,
                },
            },
        );
        tracing::debug!(lineage = %lineage, kind = ?kind, "lineage registered");
        Ok(lineage)
    }
}

fn lineage_def(state: &SourceState, lineage: LineageId) -> CoreResult<&LineageDef> {
    state
        .lineages
        .get(&lineage)
        .ok_or(CoreError::LineageNotFound {
            lineage: lineage.as_u64(),
        })
}

impl SnapshotSource for MemorySource {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn descriptor(&self, lineage: LineageId) -> CoreResult<CollectionDescriptor> {
        let state = self.state.read();
        Ok(lineage_def(&state, lineage)?.descriptor.clone())
    }

    fn current_version(&self, lineage: LineageId) -> CoreResult<Version> {
        let state = self.state.read();
        lineage_def(&state, lineage)?;
        Ok(state.version)
    }

    fn materialize(&self, lineage: LineageId, version: Version) -> CoreResult<Materialized> {
        let state = self.state.read();
        let def = lineage_def(&state, lineage)?;
        if version > state.version {
            return Err(CoreError::source(format!(
                "{version} has not been committed (latest is {})",
                state.version
            )));
        }
        def.materialize(&state.store, state.version)
    }

    fn dirty_properties(
        &self,
        lineage: LineageId,
        since: Version,
        until: Version,
    ) -> CoreResult<DirtySet> {
        let state = self.state.read();
        let def = lineage_def(&state, lineage)?;
        if !def.descriptor.element.is_object() {
            return Ok(DirtySet::new());
        }

        let mut writes = Writes::new();
        for (_, commit) in state
            .log
            .iter()
            .filter(|(version, _)| *version > since && *version <= until)
        {
            for (object, properties) in commit {
                writes
                    .entry(*object)
                    .or_default()
                    .extend(properties.iter().cloned());
            }
        }
        if writes.is_empty() {
            return Ok(DirtySet::new());
        }

        let Some(snapshot) = def.materialize(&state.store, state.version)?.into_live() else {
            return Ok(DirtySet::new());
        };
        let mut walker = Walker::new(
            &state.store,
            &self.schema,
            &writes,
            self.config.max_traversal_depth,
        );
        let mut dirty = DirtySet::new();
        for entry in snapshot.entries() {
            let root = match &entry.key {
                EntryKey::Object { id, .. } => Some(*id),
                EntryKey::Row(_) | EntryKey::Key(_) | EntryKey::Position(_) => {
                    entry.value.as_object()
                }
            };
            if let Some(root) = root {
                for path in walker.paths_from(root) {
                    dirty.insert(entry.key.clone(), path);
                }
            }
        }

        tracing::trace!(
            lineage = %lineage,
            since = %since,
            until = %until,
            entries = dirty.len(),
            "dirty properties"
        );
        Ok(dirty)
    }

    fn on_commit(&self, hook: CommitHook) {
        self.hooks.write().push(hook);
    }

    fn max_dirty_path_len(&self) -> Option<usize> {
        Some(self.config.max_traversal_depth)
    }
}

impl std::fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemorySource")
            .field("version", &state.version)
            .field("objects", &state.store.len())
            .field("lineages", &state.lineages.len())
            .finish()
    }
}
