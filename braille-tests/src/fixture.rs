//! Fixture bundles: manifest parsing, validation and per-fixture run state

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::FixtureLayout;
use crate::execution::{RunFailure, TestExecutor, TestResult};
use crate::status::{StateError, Status};

/// Tags a manifest may use
pub const ALLOWED_TAGS: [&str; 6] =
    ["text", "numbers", "punctuation", "capitalization", "contractions", "long"];

/// Inclusive bounds for a fixture's level
pub const MIN_LEVEL: f64 = 0.0;
pub const MAX_LEVEL: f64 = 4.1;

/// Why a candidate directory is not a usable fixture
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Manifest file not found: {0}")]
    MissingManifest(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    UnreadableManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Empty manifest file: {0}")]
    EmptyManifest(PathBuf),

    #[error("Invalid manifest file {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {field}: expected {expected}")]
    InvalidField { field: &'static str, expected: &'static str },

    #[error("Invalid name: must not be empty")]
    EmptyName,

    #[error("Invalid level '{0}': not a number")]
    InvalidLevel(String),

    #[error("Invalid level '{0}': must lie between 0 and 4.1")]
    LevelOutOfRange(String),

    #[error("Duplicate tags: {}", .0.join(", "))]
    DuplicateTags(Vec<String>),

    #[error("Invalid tags: {}", .0.join(", "))]
    UnknownTags(Vec<String>),

    #[error("Content file '{0}' not found")]
    MissingContent(String),

    #[error("Content file '{file}' is unreadable: {reason}")]
    UnreadableContent { file: String, reason: String },

    #[error("Content file '{0}' is empty")]
    EmptyContent(String),
}

/// How strictly a fixture is checked while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// Every manifest and content check; the path used for running
    #[default]
    Strict,
    /// Only require a parseable manifest; used for listing
    Lenient,
}

/// Level as written in the manifest, e.g. `"1"` or `"2.5"`.
///
/// Fixtures are grouped by the raw text, so `"1"` and `"1.0"` are different
/// buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(String);

impl Level {
    /// Parse and range check a manifest level
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value: f64 =
            raw.trim().parse().map_err(|_| ValidationError::InvalidLevel(raw.to_string()))?;
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&value) {
            return Err(ValidationError::LevelOutOfRange(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One on-disk test bundle and its transient execution state
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    root: PathBuf,
    name: String,
    description: String,
    level: Level,
    tags: Vec<String>,
    pub(crate) status: Status,
    pub(crate) result: Option<TestResult>,
    pub(crate) failure: Option<RunFailure>,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) elapsed: Option<Duration>,
}

impl Fixture {
    /// Load and fully validate the fixture rooted at `root`
    pub fn load(root: impl AsRef<Path>, layout: &FixtureLayout) -> Result<Self, ValidationError> {
        Self::load_with(root, layout, Validation::Strict)
    }

    /// Load the fixture rooted at `root` with the given strictness
    pub fn load_with(
        root: impl AsRef<Path>,
        layout: &FixtureLayout,
        validation: Validation,
    ) -> Result<Self, ValidationError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ValidationError::MissingRoot(root.to_path_buf()));
        }

        let manifest = read_manifest(&root.join(&layout.manifest))?;

        let fixture = match validation {
            Validation::Strict => {
                let name = string_field(&manifest, "name")?;
                if name.trim().is_empty() {
                    return Err(ValidationError::EmptyName);
                }
                let description = string_field(&manifest, "desc")?;
                let level = Level::parse(&string_field(&manifest, "level")?)?;
                let tags = tags_field(&manifest)?;
                check_tags(&tags)?;
                check_content(root, layout)?;
                Self::ready(root, name, description, level, tags)
            }
            Validation::Lenient => {
                let name = manifest
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| dir_name(root));
                let description =
                    manifest.get("desc").and_then(Value::as_str).unwrap_or_default().to_string();
                let level = Level(
                    manifest.get("level").and_then(Value::as_str).unwrap_or_default().to_string(),
                );
                let tags = manifest
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                Self::ready(root, name, description, level, tags)
            }
        };

        Ok(fixture)
    }

    fn ready(
        root: &Path,
        name: String,
        description: String,
        level: Level,
        tags: Vec<String>,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            name,
            description,
            level,
            tags,
            status: Status::Ready,
            result: None,
            failure: None,
            stdout: String::new(),
            stderr: String::new(),
            elapsed: None,
        }
    }

    /// Drive the translator through every direction of this fixture
    pub fn run(&mut self, executor: &TestExecutor) -> Result<Status, StateError> {
        executor.execute(self)
    }

    pub(crate) fn advance(&mut self, next: Status) -> Result<(), StateError> {
        self.status = self.status.transition(next)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Comparison captures, present once both directions ran to completion
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    /// Why the fixture ended in `Error`
    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// Standard output captured across every invocation
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Standard error captured across every invocation
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Wall-clock duration of the last run
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

fn dir_name(root: &Path) -> String {
    root.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

fn read_manifest(path: &Path) -> Result<Value, ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::MissingManifest(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| {
        ValidationError::UnreadableManifest { path: path.to_path_buf(), source }
    })?;
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyManifest(path.to_path_buf()));
    }
    serde_json::from_str(&content)
        .map_err(|source| ValidationError::InvalidJson { path: path.to_path_buf(), source })
}

fn string_field(manifest: &Value, field: &'static str) -> Result<String, ValidationError> {
    manifest
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ValidationError::InvalidField { field, expected: "a string" })
}

fn tags_field(manifest: &Value) -> Result<Vec<String>, ValidationError> {
    let invalid = ValidationError::InvalidField { field: "tags", expected: "a list of strings" };
    let Some(items) = manifest.get("tags").and_then(Value::as_array) else {
        return Err(invalid);
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(invalid)
}

fn check_tags(tags: &[String]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for tag in tags {
        if !seen.insert(tag.as_str()) && !duplicates.contains(tag) {
            duplicates.push(tag.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(ValidationError::DuplicateTags(duplicates));
    }

    let unknown: Vec<String> =
        tags.iter().filter(|tag| !ALLOWED_TAGS.contains(&tag.as_str())).cloned().collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownTags(unknown));
    }
    Ok(())
}

fn check_content(root: &Path, layout: &FixtureLayout) -> Result<(), ValidationError> {
    for file in layout.content_files() {
        let path = root.join(file);
        if !path.is_file() {
            return Err(ValidationError::MissingContent(file.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|e| ValidationError::UnreadableContent {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent(file.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) const MANIFEST: &str = r#"{
        "$schema": "../schema.json",
        "name": "Greeting",
        "desc": "Simple greeting",
        "level": "1",
        "tags": ["text"]
    }"#;

    pub(crate) fn write_fixture(dir: &Path, manifest: &str, plain: &str, encoded: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("manifest.json"), manifest).unwrap();
        fs::write(dir.join("afr.txt"), plain).unwrap();
        fs::write(dir.join("brf.brf"), encoded).unwrap();
    }

    fn load(manifest: &str) -> Result<Fixture, ValidationError> {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("case");
        write_fixture(&dir, manifest, "hallo\n", ",hallo\n");
        Fixture::load(&dir, &FixtureLayout::default())
    }

    #[test]
    fn test_well_formed_fixture_is_ready() {
        let fixture = load(MANIFEST).unwrap();
        assert_eq!(fixture.status(), Status::Ready);
        assert_eq!(fixture.name(), "Greeting");
        assert_eq!(fixture.description(), "Simple greeting");
        assert_eq!(fixture.level().as_str(), "1");
        assert_eq!(fixture.tags(), ["text".to_string()]);
        assert!(fixture.result().is_none());
        assert!(fixture.failure().is_none());
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("case");
        write_fixture(&dir, MANIFEST, "hallo\n", ",hallo\n");
        let layout = FixtureLayout::default();

        let first = Fixture::load(&dir, &layout).unwrap();
        let second = Fixture::load(&dir, &layout).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 3);
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = Fixture::load(tmp.path().join("nope"), &FixtureLayout::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingRoot(_)));
    }

    #[test]
    fn test_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = Fixture::load(tmp.path(), &FixtureLayout::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingManifest(_)));
    }

    #[test]
    fn test_empty_manifest() {
        assert!(matches!(load("  \n").unwrap_err(), ValidationError::EmptyManifest(_)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load("{\"name\": ").unwrap_err(), ValidationError::InvalidJson { .. }));
    }

    #[test]
    fn test_field_types() {
        let err = load(r#"{"name": 3, "desc": "", "level": "1", "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "name", .. }));

        let err = load(r#"{"name": "a", "level": "1", "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "desc", .. }));

        let err = load(r#"{"name": "a", "desc": "", "level": 1, "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "level", .. }));

        let err = load(r#"{"name": "a", "desc": "", "level": "1", "tags": "text"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "tags", .. }));

        let err =
            load(r#"{"name": "a", "desc": "", "level": "1", "tags": ["text", 2]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "tags", .. }));

        let err = load(r#"["not", "an", "object"]"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { field: "name", .. }));
    }

    #[test]
    fn test_empty_name() {
        let err = load(r#"{"name": " ", "desc": "", "level": "1", "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyName));
    }

    #[test]
    fn test_level_bounds() {
        assert!(Level::parse("0").is_ok());
        assert!(Level::parse("4.1").is_ok());
        assert!(Level::parse("2.5").is_ok());
        assert!(matches!(Level::parse("4.2"), Err(ValidationError::LevelOutOfRange(_))));
        assert!(matches!(Level::parse("-0.5"), Err(ValidationError::LevelOutOfRange(_))));
        assert!(matches!(Level::parse("NaN"), Err(ValidationError::LevelOutOfRange(_))));
        assert!(matches!(Level::parse("grade one"), Err(ValidationError::InvalidLevel(_))));
    }

    #[test]
    fn test_level_out_of_range_in_manifest() {
        let err = load(r#"{"name": "a", "desc": "", "level": "5", "tags": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::LevelOutOfRange(level) if level == "5"));
    }

    #[test]
    fn test_duplicate_tags() {
        let manifest = r#"{"name": "a", "desc": "", "level": "1", "tags": ["text", "text"]}"#;
        let err = load(manifest).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate tags: text");
        assert!(matches!(err, ValidationError::DuplicateTags(tags) if tags == ["text"]));
    }

    #[test]
    fn test_unknown_tags_named() {
        let manifest =
            r#"{"name": "a", "desc": "", "level": "1", "tags": ["text", "emoji", "maths"]}"#;
        let err = load(manifest).unwrap_err();
        assert_eq!(err.to_string(), "Invalid tags: emoji, maths");
    }

    #[test]
    fn test_missing_content_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("case");
        write_fixture(&dir, MANIFEST, "hallo", ",hallo");
        fs::remove_file(dir.join("brf.brf")).unwrap();
        let err = Fixture::load(&dir, &FixtureLayout::default()).unwrap_err();
        assert!(matches!(err, ValidationError::MissingContent(file) if file == "brf.brf"));
    }

    #[test]
    fn test_blank_content_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("case");
        write_fixture(&dir, MANIFEST, " \n\t\n", ",hallo");
        let err = Fixture::load(&dir, &FixtureLayout::default()).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyContent(file) if file == "afr.txt"));
    }

    #[test]
    fn test_non_utf8_content_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("case");
        write_fixture(&dir, MANIFEST, "hallo", ",hallo");
        fs::write(dir.join("brf.brf"), [0xff, 0xfe, 0x00]).unwrap();
        let err = Fixture::load(&dir, &FixtureLayout::default()).unwrap_err();
        assert!(matches!(err, ValidationError::UnreadableContent { .. }));
    }

    #[test]
    fn test_lenient_skips_checks() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("loose-case");
        fs::create_dir_all(&dir).unwrap();
        let manifest = r#"{"level": "9", "tags": ["text", "text"]}"#;
        fs::write(dir.join("manifest.json"), manifest).unwrap();

        let layout = FixtureLayout::default();
        assert!(Fixture::load(&dir, &layout).is_err());

        let fixture = Fixture::load_with(&dir, &layout, Validation::Lenient).unwrap();
        assert_eq!(fixture.name(), "loose-case");
        assert_eq!(fixture.level().as_str(), "9");
        assert_eq!(fixture.tags().len(), 2);
        assert_eq!(fixture.status(), Status::Ready);
    }

    #[test]
    fn test_lenient_still_needs_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = Fixture::load_with(tmp.path(), &FixtureLayout::default(), Validation::Lenient)
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingManifest(_)));
    }
}
