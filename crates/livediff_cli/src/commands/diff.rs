//! Diff command implementation.

use super::{load_schema, read_json, CliError};
use livediff_core::{
    ChangeSet, CollectionChangedAdapter, CollectionChangedEvent, CollectionKind,
    DictionaryChanges, DiffEngine, DirtySet, Entry, EntryKey, Fingerprint, KeyPathFilter,
    KeyPathsCollection, KeyPathsMode, LineageId, PropertyPath, Snapshot, Version,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inputs of the diff command.
#[derive(Debug)]
pub struct DiffOptions<'a> {
    /// Old snapshot file.
    pub old: &'a Path,
    /// New snapshot file.
    pub new: &'a Path,
    /// Dirty properties file.
    pub dirty: Option<&'a Path>,
    /// Schema file.
    pub schema: Option<&'a Path>,
    /// Explicit key paths.
    pub key_paths: &'a [String],
    /// Ignore modifications.
    pub shallow: bool,
    /// Depth for full-mode filters.
    pub depth: usize,
    /// Translate the change set into a collection-changed event.
    pub adapter: bool,
}

/// One entry of a dirty properties file.
///
/// Paths are dotted storage names relative to the entry.
#[derive(Debug, Deserialize)]
struct DirtyEntry {
    key: EntryKey,
    paths: Vec<String>,
}

/// Diff result.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// Lineage of both snapshots.
    pub lineage: LineageId,
    /// Old version.
    pub from: Version,
    /// New version.
    pub to: Version,
    /// The change set.
    pub changes: ChangeSet,
    /// The change set in dictionary keys, for dictionaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<DictionaryChanges>,
    /// The collection-changed event (if requested and structural).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CollectionChangedEvent>,
}

/// Runs the diff command.
pub fn run(options: &DiffOptions<'_>, format: &str) -> Result<(), CliError> {
    let report = compute(options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

/// Loads the inputs and diffs them.
pub fn compute(options: &DiffOptions<'_>) -> Result<DiffReport, CliError> {
    let old = fingerprinted(read_json(options.old)?)?;
    let new = fingerprinted(read_json(options.new)?)?;
    let dirty = match options.dirty {
        Some(path) => dirty_set(read_json(path)?),
        None => DirtySet::new(),
    };
    let filter = filter(options, &new)?;

    tracing::debug!(
        old = old.len(),
        new = new.len(),
        dirty = dirty.len(),
        mode = ?filter.mode(),
        "diffing snapshots"
    );

    let changes = DiffEngine::new()
        .diff(Some(&old), &new, &filter, &dirty)?
        .unwrap_or_default();

    let dictionary = (new.kind() == CollectionKind::Dictionary)
        .then(|| changes.dictionary_keys(&old, &new));
    let event = if options.adapter {
        CollectionChangedAdapter::new().event_for(Some(&old), &new, &changes)
    } else {
        None
    };

    Ok(DiffReport {
        lineage: new.lineage(),
        from: old.version(),
        to: new.version(),
        changes,
        dictionary,
        event,
    })
}

fn filter(options: &DiffOptions<'_>, new: &Snapshot) -> Result<KeyPathFilter, CliError> {
    let key_paths = if options.shallow {
        KeyPathsCollection::shallow()
    } else if options.key_paths.is_empty() {
        KeyPathsCollection::full()
    } else {
        KeyPathsCollection::parse_all(options.key_paths)?
    };

    match options.schema {
        Some(path) => {
            let schema = load_schema(path)?;
            Ok(KeyPathFilter::resolve(
                &key_paths,
                &schema,
                new.element(),
                options.depth,
            )?)
        }
        None => match key_paths.mode() {
            KeyPathsMode::Shallow => Ok(KeyPathFilter::shallow()),
            KeyPathsMode::Full => Ok(KeyPathFilter::unchecked_full(options.depth)),
            KeyPathsMode::Explicit => Err(CliError::Usage(
                "explicit key paths need --schema to resolve them".to_string(),
            )),
        },
    }
}

/// Fingerprints entries whose file left the fingerprint out.
fn fingerprinted(snapshot: Snapshot) -> Result<Snapshot, CliError> {
    if snapshot
        .entries()
        .iter()
        .all(|e| e.fingerprint != Fingerprint::default())
    {
        return Ok(snapshot);
    }
    let entries = snapshot
        .entries()
        .iter()
        .map(|e| {
            if e.fingerprint == Fingerprint::default() {
                Entry::new(e.key.clone(), e.value.clone())
            } else {
                e.clone()
            }
        })
        .collect();
    Ok(Snapshot::new(
        snapshot.descriptor(),
        snapshot.version(),
        entries,
    )?)
}

fn dirty_set(entries: Vec<DirtyEntry>) -> DirtySet {
    let mut dirty = DirtySet::new();
    for entry in entries {
        for path in &entry.paths {
            dirty.insert(entry.key.clone(), PropertyPath::dotted(path));
        }
    }
    dirty
}

fn join(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_text_output(report: &DiffReport) {
    let changes = &report.changes;
    println!(
        "Lineage {}: {} -> {}",
        report.lineage, report.from, report.to
    );
    if changes.is_empty() {
        println!("  no changes");
        return;
    }
    println!("  Inserted: [{}]", join(&changes.inserted));
    println!("  Deleted:  [{}]", join(&changes.deleted));
    println!(
        "  Modified: [{}] -> [{}]",
        join(&changes.modified),
        join(&changes.new_modified)
    );
    let moves: Vec<String> = changes
        .moves
        .iter()
        .map(|m| format!("{} -> {}", m.from, m.to))
        .collect();
    println!("  Moves:    [{}]", moves.join(", "));
    if changes.is_cleared {
        println!("  Cleared");
    }
    if changes.is_reset {
        println!("  Reset");
    }

    if let Some(dictionary) = &report.dictionary {
        println!("  Keys inserted: {:?}", dictionary.inserted);
        println!("  Keys deleted:  {:?}", dictionary.deleted);
        println!("  Keys modified: {:?}", dictionary.modified);
    }

    if let Some(event) = &report.event {
        print!("  Event: {:?}", event.action);
        if let Some(start) = event.old_start {
            print!(" old_start={start}");
        }
        if let Some(start) = event.new_start {
            print!(" new_start={start}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livediff_core::{
        CollectionAction, CollectionDescriptor, ElementType, Move, ObjectId, ObjectSchema,
        Property, Schema, Value, ValueKind,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn person_list(version: u64, ids: &[u128]) -> Snapshot {
        Snapshot::new(
            CollectionDescriptor {
                lineage: LineageId::new(3),
                kind: CollectionKind::List,
                element: ElementType::object("Person"),
            },
            Version::new(version),
            ids.iter()
                .map(|&n| {
                    let id = ObjectId::from_u128(n);
                    Entry::new(EntryKey::object(id), Value::Object(id))
                })
                .collect(),
        )
        .unwrap()
    }

    fn write(dir: &TempDir, name: &str, value: &impl Serialize) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    fn options<'a>(old: &'a Path, new: &'a Path) -> DiffOptions<'a> {
        DiffOptions {
            old,
            new,
            dirty: None,
            schema: None,
            key_paths: &[],
            shallow: false,
            depth: 4,
            adapter: true,
        }
    }

    #[test]
    fn move_is_reported_with_event() {
        let dir = TempDir::new().unwrap();
        let old = write(&dir, "old.json", &person_list(1, &[1, 2, 3, 4, 5]));
        let new = write(&dir, "new.json", &person_list(2, &[2, 3, 4, 1, 5]));

        let report = compute(&options(&old, &new)).unwrap();
        assert_eq!(report.changes.moves, vec![Move::new(0, 3)]);
        let event = report.event.unwrap();
        assert_eq!(event.action, CollectionAction::Move);
        assert_eq!(event.new_start, Some(3));
        assert!(report.dictionary.is_none());
    }

    #[test]
    fn missing_fingerprints_are_computed() {
        let dir = TempDir::new().unwrap();
        let snapshot = |version: u64, value: i64| {
            format!(
                r#"{{"lineage":1,"version":{version},"kind":"list","element":{{"primitive":"int"}},
                "entries":[{{"key":{{"row":1}},"value":{{"int":{value}}}}}]}}"#
            )
        };
        let old = dir.path().join("old.json");
        let new = dir.path().join("new.json");
        std::fs::write(&old, snapshot(1, 5)).unwrap();
        std::fs::write(&new, snapshot(2, 6)).unwrap();

        let report = compute(&options(&old, &new)).unwrap();
        assert_eq!(report.changes.modified, vec![0]);
        assert!(report.event.is_none());
    }

    #[test]
    fn explicit_key_paths_use_schema_and_dirty_file() {
        let dir = TempDir::new().unwrap();
        let schema = Schema::new().with_type(
            ObjectSchema::new("Person")
                .with(Property::scalar("FirstName", ValueKind::String))
                .with(Property::scalar("Age", ValueKind::Int).mapped_to("age")),
        );
        let schema = write(&dir, "schema.json", &schema);
        let old = write(&dir, "old.json", &person_list(1, &[1, 2]));
        let new = write(&dir, "new.json", &person_list(2, &[1, 2]));
        let dirty_path = dir.path().join("dirty.json");
        let key = serde_json::to_string(&EntryKey::object(ObjectId::from_u128(2))).unwrap();
        std::fs::write(&dirty_path, format!(r#"[{{"key":{key},"paths":["age"]}}]"#)).unwrap();

        let key_paths = vec!["Age".to_string()];
        let report = compute(&DiffOptions {
            dirty: Some(dirty_path.as_path()),
            schema: Some(schema.as_path()),
            key_paths: &key_paths,
            ..options(&old, &new)
        })
        .unwrap();
        assert_eq!(report.changes.modified, vec![1]);

        let key_paths = vec!["FirstName".to_string()];
        let report = compute(&DiffOptions {
            dirty: Some(dirty_path.as_path()),
            schema: Some(schema.as_path()),
            key_paths: &key_paths,
            ..options(&old, &new)
        })
        .unwrap();
        assert!(report.changes.is_empty());
    }

    #[test]
    fn explicit_key_paths_without_schema_are_rejected() {
        let dir = TempDir::new().unwrap();
        let old = write(&dir, "old.json", &person_list(1, &[1]));
        let new = write(&dir, "new.json", &person_list(2, &[1]));
        let key_paths = vec!["FirstName".to_string()];
        let err = compute(&DiffOptions {
            key_paths: &key_paths,
            ..options(&old, &new)
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn unreadable_input_names_the_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let err = compute(&options(&missing, &missing)).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
