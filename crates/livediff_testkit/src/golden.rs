//! Golden test utilities for change set verification.
//!
//! Change sets and adapter events are serialized to pretty JSON and
//! compared against checked-in files.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Compares serialized change sets and events with checked-in files.
#[derive(Debug)]
pub struct GoldenTest {
    name: String,
    golden_dir: PathBuf,
    update_mode: bool,
}

impl GoldenTest {
    /// Creates a golden test reading `<golden_dir>/<name>_<suffix>.json`.
    ///
    /// Update mode is on when `UPDATE_GOLDEN` is set.
    pub fn new(name: impl Into<String>, golden_dir: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            golden_dir: golden_dir.as_ref().to_path_buf(),
            update_mode: std::env::var("UPDATE_GOLDEN").is_ok(),
        }
    }

    /// Creates a golden test using `docs/golden` in the workspace root.
    pub fn with_default_dir(name: impl Into<String>) -> Self {
        let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
        let workspace = manifest.ancestors().nth(2).unwrap_or(manifest);
        Self::new(name, workspace.join("docs").join("golden"))
    }

    /// Forces update mode on or off, ignoring `UPDATE_GOLDEN`.
    #[must_use]
    pub fn updating(mut self, update_mode: bool) -> Self {
        self.update_mode = update_mode;
        self
    }

    /// Asserts that `value`, as pretty JSON, matches the golden file.
    ///
    /// Files are compared as JSON values, so hand-edited whitespace in a
    /// golden file does not fail the test.
    pub fn assert_json<T: Serialize>(&self, suffix: &str, value: &T) {
        let actual = serde_json::to_value(value).expect("Value should serialize");
        let mut rendered = serde_json::to_string_pretty(value).expect("Value should serialize");
        rendered.push('\n');

        let Some(expected) = self.expected(suffix, &rendered) else {
            return;
        };
        let parsed: serde_json::Value = serde_json::from_str(&expected)
            .unwrap_or_else(|e| panic!("Golden file for '{}' is not JSON: {e}", self.name));
        if parsed != actual {
            self.mismatch(suffix, &expected, &rendered);
        }
    }

    /// Asserts that the given string matches the golden file exactly.
    pub fn assert_text(&self, suffix: &str, actual: &str) {
        if let Some(expected) = self.expected(suffix, actual) {
            if expected != actual {
                self.mismatch(suffix, &expected, actual);
            }
        }
    }

    /// Reads the golden file, or rewrites it in update mode and returns
    /// `None`.
    fn expected(&self, suffix: &str, actual: &str) -> Option<String> {
        let path = self.file_path(suffix);
        if self.update_mode {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create golden directory");
            }
            fs::write(&path, actual).expect("Failed to write golden file");
            println!("Updated golden file: {}", path.display());
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(expected) => Some(expected),
            Err(_) => panic!(
                "Golden file not found: {}\nRun with UPDATE_GOLDEN=1 to create it.\nActual:\n{actual}",
                path.display()
            ),
        }
    }

    fn mismatch(&self, suffix: &str, expected: &str, actual: &str) -> ! {
        let line = expected
            .lines()
            .zip(actual.lines())
            .position(|(e, a)| e != a)
            .map_or_else(
                || expected.lines().count().min(actual.lines().count()) + 1,
                |i| i + 1,
            );
        panic!(
            "Golden test '{}' failed for '{suffix}' at line {line}:\n\
             --- Expected ---\n{expected}\n\
             --- Actual ---\n{actual}\n\
             Run with UPDATE_GOLDEN=1 to update.",
            self.name
        );
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        let file = match suffix {
            "" => format!("{}.json", self.name),
            _ => format!("{}_{suffix}.json", self.name),
        };
        self.golden_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livediff_core::{ChangeSet, Move};
    use tempfile::TempDir;

    fn sample() -> ChangeSet {
        ChangeSet {
            inserted: vec![3],
            moves: vec![Move::new(0, 2)],
            ..ChangeSet::default()
        }
    }

    #[test]
    fn update_then_compare() {
        let dir = TempDir::new().unwrap();
        GoldenTest::new("moves", dir.path())
            .updating(true)
            .assert_json("", &sample());
        assert!(dir.path().join("moves.json").exists());

        GoldenTest::new("moves", dir.path())
            .updating(false)
            .assert_json("", &sample());
    }

    #[test]
    #[should_panic(expected = "Golden test 'moves' failed")]
    fn mismatch_panics() {
        let dir = TempDir::new().unwrap();
        GoldenTest::new("moves", dir.path())
            .updating(true)
            .assert_json("", &sample());

        let other = ChangeSet {
            deleted: vec![1],
            ..ChangeSet::default()
        };
        GoldenTest::new("moves", dir.path())
            .updating(false)
            .assert_json("", &other);
    }

    #[test]
    fn json_comparison_ignores_layout() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("compact.json"),
            r#"{"inserted":[3],"deleted":[],"modified":[],"new_modified":[],
               "moves":[{"from":0,"to":2}],"is_cleared":false,"is_reset":false}"#,
        )
        .unwrap();
        GoldenTest::new("compact", dir.path())
            .updating(false)
            .assert_json("", &sample());
    }

    #[test]
    #[should_panic(expected = "Golden file not found")]
    fn missing_file_panics() {
        let dir = TempDir::new().unwrap();
        GoldenTest::new("absent", dir.path())
            .updating(false)
            .assert_text("x", "anything");
    }
}
