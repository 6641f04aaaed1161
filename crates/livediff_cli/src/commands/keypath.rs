//! Keypath command implementation.

use super::{load_schema, CliError};
use livediff_core::{ElementType, KeyPath, KeyPathFilter, KeyPathsCollection, Schema};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Depth used when resolving; explicit paths do not depend on it.
const RESOLVE_DEPTH: usize = 4;

/// Outcome for one key path.
#[derive(Debug, Serialize)]
pub struct KeyPathReport {
    /// The path as given.
    pub path: String,
    /// Whether it resolved.
    pub valid: bool,
    /// Why it did not resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the keypath command.
///
/// Fails if any path is invalid, after printing every result.
pub fn run(
    schema_path: &Path,
    type_name: &str,
    paths: &[String],
    format: &str,
) -> Result<(), CliError> {
    let schema = load_schema(schema_path)?;
    let reports = check(&schema, type_name, paths)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        _ => {
            for report in &reports {
                match &report.error {
                    None => println!("ok     {}", report.path),
                    Some(error) => println!("error  {}: {}", report.path, error),
                }
            }
        }
    }

    let invalid = reports.iter().filter(|r| !r.valid).count();
    if invalid > 0 {
        return Err(CliError::InvalidKeyPaths(invalid));
    }
    Ok(())
}

/// Parses and resolves each path against `type_name`.
///
/// # Errors
///
/// Returns an error only if `type_name` is not in the schema; problems
/// with individual paths are reported per path.
pub fn check(
    schema: &Arc<Schema>,
    type_name: &str,
    paths: &[String],
) -> Result<Vec<KeyPathReport>, CliError> {
    schema.object(type_name)?;
    let element = ElementType::object(type_name);

    Ok(paths
        .iter()
        .map(|path| {
            let result = KeyPath::parse(path).and_then(|key_path| {
                KeyPathFilter::resolve(
                    &KeyPathsCollection::of([key_path]),
                    schema,
                    &element,
                    RESOLVE_DEPTH,
                )
            });
            if let Err(err) = &result {
                tracing::debug!(path = %path, error = %err, "key path rejected");
            }
            KeyPathReport {
                path: path.clone(),
                valid: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use livediff_core::{ObjectSchema, Property, ValueKind};
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new()
            .with_type(
                ObjectSchema::new("Person")
                    .with(Property::scalar("FirstName", ValueKind::String))
                    .with(Property::link("Dog", "Dog")),
            )
            .with_type(
                ObjectSchema::new("Dog")
                    .with(Property::scalar("Name", ValueKind::String))
                    .with(Property::backlink("Owners", "Person", "Dog")),
            )
    }

    fn paths(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn reports_each_path() {
        let schema = Arc::new(schema());
        let reports = check(
            &schema,
            "Person",
            &paths(&["FirstName", "Dog.Owners.FirstName", "*.Name", "Nope", "FirstName.X", "a..b"]),
        )
        .unwrap();

        let valid: Vec<bool> = reports.iter().map(|r| r.valid).collect();
        assert_eq!(valid, vec![true, true, true, false, false, false]);
        assert_eq!(
            reports[3].error.as_deref(),
            Some("Property 'Nope' does not exist on type 'Person'")
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let schema = Arc::new(schema());
        assert!(check(&schema, "Cat", &paths(&["Name"])).is_err());
    }

    #[test]
    fn run_fails_when_a_path_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, serde_json::to_string(&schema()).unwrap()).unwrap();

        assert!(run(&path, "Dog", &paths(&["Owners.FirstName"]), "json").is_ok());
        let err = run(&path, "Dog", &paths(&["Name", "Owner"]), "text").unwrap_err();
        assert!(matches!(err, CliError::InvalidKeyPaths(1)));
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schema.json");
        let broken = Schema::new().with_type(
            ObjectSchema::new("Person").with(Property::link("Dog", "Dog")),
        );
        std::fs::write(&path, serde_json::to_string(&broken).unwrap()).unwrap();

        assert!(run(&path, "Person", &paths(&["Dog"]), "text").is_err());
    }
}
