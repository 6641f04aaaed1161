//! Benchmark utilities.

use livediff_core::{
    CollectionDescriptor, CollectionKind, ElementType, Entry, EntryKey, LineageId, ObjectId,
    ObjectSchema, Property, Schema, Snapshot, Value, ValueKind, Version,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Type name of the benchmark schema's objects.
pub const ITEM: &str = "Item";

/// Schema with one self-linking type, deep enough for full-depth filters.
pub fn bench_schema() -> Schema {
    Schema::new().with_type(
        ObjectSchema::new(ITEM)
            .with(Property::scalar("Name", ValueKind::String))
            .with(Property::scalar("Rank", ValueKind::Int).mapped_to("rank"))
            .with(Property::link("Parent", ITEM))
            .with(Property::list("Children", ElementType::object(ITEM))),
    )
}

/// Generate a batch of deterministic object IDs.
pub fn generate_ids(count: usize) -> Vec<ObjectId> {
    (0..count as u128).map(|n| ObjectId::from_u128(n + 1)).collect()
}

/// Build an object list snapshot with entries in the given order.
pub fn object_snapshot(version: u64, ids: &[ObjectId]) -> Snapshot {
    let entries = ids
        .iter()
        .map(|&id| Entry::new(EntryKey::object(id), Value::Object(id)))
        .collect();
    Snapshot::new(
        CollectionDescriptor {
            lineage: LineageId::new(1),
            kind: CollectionKind::List,
            element: ElementType::object(ITEM),
        },
        Version::new(version),
        entries,
    )
    .expect("Generated IDs are unique")
}

/// Remove `deletes` random entries and insert `inserts` fresh ones at
/// random positions.
pub fn churn(ids: &[ObjectId], deletes: usize, inserts: usize) -> Vec<ObjectId> {
    let mut rng = rand::thread_rng();
    let mut next = ids.to_vec();
    for _ in 0..deletes.min(next.len()) {
        let at = rng.gen_range(0..next.len());
        next.remove(at);
    }
    for _ in 0..inserts {
        let at = rng.gen_range(0..=next.len());
        next.insert(at, ObjectId::new());
    }
    next
}

/// Move `count` random entries to random positions.
pub fn reorder(ids: &[ObjectId], count: usize) -> Vec<ObjectId> {
    let mut rng = rand::thread_rng();
    let mut next = ids.to_vec();
    if next.is_empty() {
        return next;
    }
    for _ in 0..count {
        let from = rng.gen_range(0..next.len());
        let id = next.remove(from);
        let to = rng.gen_range(0..=next.len());
        next.insert(to, id);
    }
    next
}

/// Shuffle every entry.
pub fn shuffled(ids: &[ObjectId]) -> Vec<ObjectId> {
    let mut next = ids.to_vec();
    next.shuffle(&mut rand::thread_rng());
    next
}
