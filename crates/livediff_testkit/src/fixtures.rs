//! Test fixtures and notifier helpers.
//!
//! Provides a shared schema covering links, backlinks, mapped names and
//! every collection kind, and a harness wiring an in-memory source to a
//! notifier.

use livediff_core::{
    CoreResult, ElementType, LineageId, LiveCollection, MemorySource, Notifier, NotifierConfig,
    ObjectId, ObjectSchema, Property, ResultsQuery, Schema, Value, ValueKind, WriteTransaction,
};
use std::sync::Arc;

/// Type with names, a mapped property, links and every collection kind.
pub const PERSON: &str = "Person";
/// Type reached from [`PERSON`] through a link, with a backlink.
pub const DOG: &str = "Dog";
/// Type linking to itself and to a different type.
pub const HOLDER: &str = "TestNotificationObject";

/// Builds the schema used across the integration tests.
///
/// - `Person`: `FirstName`, `LastName`, `Age` (stored as `age`), `Dog`,
///   `BestFriend`, `Friends`, `Nicknames`, `Tags`, `Scores`
/// - `Dog`: `Name`, `Age`, `Owners` (backlink of `Person.Dog`)
/// - `TestNotificationObject`: `StringProperty`, `IntProperty` (stored as
///   `int_property`), `LinkSameType`, `LinkDifferentType`,
///   `ListSameType`, `ListDifferentType`, `DictionaryOfPeople`,
///   `Backlink` (backlink of `LinkSameType`)
pub fn notification_schema() -> Schema {
    Schema::new()
        .with_type(
            ObjectSchema::new(PERSON)
                .with(Property::scalar("FirstName", ValueKind::String))
                .with(Property::scalar("LastName", ValueKind::String))
                .with(Property::scalar("Age", ValueKind::Int).mapped_to("age"))
                .with(Property::link("Dog", DOG))
                .with(Property::link("BestFriend", PERSON))
                .with(Property::list("Friends", ElementType::object(PERSON)))
                .with(Property::list(
                    "Nicknames",
                    ElementType::Primitive(ValueKind::String),
                ))
                .with(Property::set("Tags", ElementType::Primitive(ValueKind::String)))
                .with(Property::dictionary(
                    "Scores",
                    ElementType::Primitive(ValueKind::Int),
                )),
        )
        .with_type(
            ObjectSchema::new(DOG)
                .with(Property::scalar("Name", ValueKind::String))
                .with(Property::scalar("Age", ValueKind::Int))
                .with(Property::backlink("Owners", PERSON, "Dog")),
        )
        .with_type(
            ObjectSchema::new(HOLDER)
                .with(Property::scalar("StringProperty", ValueKind::String))
                .with(Property::scalar("IntProperty", ValueKind::Int).mapped_to("int_property"))
                .with(Property::link("LinkSameType", HOLDER))
                .with(Property::link("LinkDifferentType", PERSON))
                .with(Property::list("ListSameType", ElementType::object(HOLDER)))
                .with(Property::list("ListDifferentType", ElementType::object(PERSON)))
                .with(Property::dictionary(
                    "DictionaryOfPeople",
                    ElementType::object(PERSON),
                ))
                .with(Property::backlink("Backlink", HOLDER, "LinkSameType")),
        )
}

/// An in-memory source with a notifier attached.
pub struct TestHarness {
    /// The data source.
    pub source: Arc<MemorySource>,
    /// The notifier observing `source`.
    pub notifier: Notifier,
}

impl TestHarness {
    /// Creates a harness over [`notification_schema`] with the default
    /// notifier configuration.
    pub fn new() -> Self {
        Self::with_config(NotifierConfig::default())
    }

    /// Creates a harness with a custom notifier configuration.
    pub fn with_config(config: NotifierConfig) -> Self {
        let source = Arc::new(
            MemorySource::new(notification_schema()).expect("Test schema should be valid"),
        );
        let notifier = Notifier::new(source.clone(), config);
        Self { source, notifier }
    }

    /// Runs a write transaction, panicking if it fails.
    pub fn write<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> CoreResult<T>,
    {
        self.source.transaction(f).expect("Write transaction failed")
    }

    /// Runs one refresh cycle and returns the number of callbacks invoked.
    pub fn refresh(&self) -> usize {
        self.notifier.refresh()
    }

    /// Returns a subscribable handle for `lineage`.
    pub fn collection(&self, lineage: LineageId) -> LiveCollection {
        self.notifier
            .collection(lineage)
            .expect("Lineage should be registered")
    }

    /// Every `Person`, in insertion order.
    pub fn people(&self) -> LiveCollection {
        self.query(ResultsQuery::all(PERSON))
    }

    /// Every `Person`, youngest first.
    pub fn people_by_age(&self) -> LiveCollection {
        self.query(ResultsQuery::all(PERSON).sort_by("Age", true))
    }

    /// Every `Dog`, in insertion order.
    pub fn dogs(&self) -> LiveCollection {
        self.query(ResultsQuery::all(DOG))
    }

    /// Registers a live query.
    pub fn query(&self, query: ResultsQuery) -> LiveCollection {
        let lineage = self.source.results(query).expect("Query should be valid");
        self.collection(lineage)
    }

    /// The list, set or dictionary `property` of `owner`.
    pub fn property(&self, owner: ObjectId, property: &str) -> LiveCollection {
        let lineage = self
            .source
            .property_collection(owner, property)
            .expect("Property should be a collection");
        self.collection(lineage)
    }

    /// Creates a `Person` in its own transaction.
    pub fn add_person(&self, first_name: &str, age: i64) -> ObjectId {
        self.write(|txn| {
            let id = txn.create(PERSON)?;
            txn.set(id, "FirstName", first_name)?;
            txn.set(id, "Age", age)?;
            Ok(id)
        })
    }

    /// Creates a `Dog` in its own transaction.
    pub fn add_dog(&self, name: &str) -> ObjectId {
        self.write(|txn| {
            let id = txn.create(DOG)?;
            txn.set(id, "Name", name)?;
            Ok(id)
        })
    }

    /// Creates an empty `TestNotificationObject`.
    pub fn add_holder(&self) -> ObjectId {
        self.write(|txn| txn.create(HOLDER))
    }

    /// Sets one property in its own transaction.
    pub fn set(&self, id: ObjectId, property: &str, value: impl Into<Value>) {
        let value = value.into();
        self.write(|txn| txn.set(id, property, value));
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestHarness {
    type Target = MemorySource;

    fn deref(&self) -> &Self::Target {
        &self.source
    }
}

/// Runs a test with a fresh harness.
///
/// # Example
///
/// ```rust,ignore
/// use livediff_testkit::with_harness;
///
/// #[test]
/// fn my_test() {
///     with_harness(|harness| {
///         let people = harness.people();
///         // ... subscribe, write, refresh
///     });
/// }
/// ```
pub fn with_harness<F, R>(f: F) -> R
where
    F: FnOnce(&TestHarness) -> R,
{
    let harness = TestHarness::new();
    f(&harness)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a holder whose `ListDifferentType` contains people named
    /// after `names`, in order. Returns the holder and the people.
    pub fn holder_with_people(harness: &TestHarness, names: &[&str]) -> (ObjectId, Vec<ObjectId>) {
        harness.write(|txn| {
            let holder = txn.create(HOLDER)?;
            let mut people = Vec::with_capacity(names.len());
            for name in names {
                let person = txn.create(PERSON)?;
                txn.set(person, "FirstName", *name)?;
                txn.list_push(holder, "ListDifferentType", person)?;
                people.push(person);
            }
            Ok((holder, people))
        })
    }

    /// Creates `count` people named `p0`, `p1`, ... with ages `0..count`.
    pub fn populated(harness: &TestHarness, count: usize) -> Vec<ObjectId> {
        harness.write(|txn| {
            (0..count)
                .map(|i| {
                    let id = txn.create(PERSON)?;
                    txn.set(id, "FirstName", format!("p{i}"))?;
                    txn.set(id, "Age", i as i64)?;
                    Ok(id)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livediff_core::Materialized;

    #[test]
    fn schema_is_valid() {
        assert!(notification_schema().validate().is_ok());
    }

    #[test]
    fn harness_reads_back_writes() {
        with_harness(|harness| {
            let ada = harness.add_person("Ada", 36);
            assert_eq!(harness.get(ada, "Age").unwrap(), Value::Int(36));

            let Materialized::Live(people) = harness.people().read().unwrap() else {
                panic!("results are never invalidated");
            };
            assert_eq!(people.len(), 1);
        });
    }

    #[test]
    fn holder_scenario_fills_list() {
        let harness = TestHarness::new();
        let (holder, people) = scenarios::holder_with_people(&harness, &["a", "b", "c"]);
        let list = harness.property(holder, "ListDifferentType");
        let snapshot = list.read().unwrap().into_live().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(2).unwrap().value, Value::Object(people[2]));
    }
}
