//! Fixture discovery: scanning a fixture root into a fixture set

use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::FixtureLayout;
use crate::fixture::{Fixture, Validation, ValidationError};
use crate::harness::FixtureSet;
use crate::ConformanceError;

/// A candidate directory that did not validate
#[derive(Debug)]
pub struct SkippedFixture {
    pub path: PathBuf,
    pub error: ValidationError,
}

/// Outcome of scanning a fixture root
#[derive(Debug, Default)]
pub struct Discovery {
    /// Valid fixtures in directory-name order
    pub set: FixtureSet,
    pub skipped: Vec<SkippedFixture>,
}

impl Discovery {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Name of the repository that ships the fixtures
pub const FIXTURE_REPO_DIR: &str = "RW214-project-testcases";

/// Fixture root inside the working directory or the fixture repository
pub const FIXTURE_DIR: &str = "testcases";

/// Levels checked when looking for the fixture repository, `start` included
const SEARCH_DEPTH: usize = 5;

/// Default fixture root for runs started in `start`.
///
/// Prefers `start/testcases`; otherwise looks for the fixture repository at
/// `start` or one of its parents and uses its `testcases` directory.
pub fn locate_fixture_root(start: &Path) -> Result<PathBuf, ConformanceError> {
    let local = start.join(FIXTURE_DIR);
    if local.is_dir() {
        return Ok(local);
    }

    for (depth, dir) in start.ancestors().take(SEARCH_DEPTH).enumerate() {
        let repo = if dir.file_name().is_some_and(|name| name == FIXTURE_REPO_DIR) {
            dir.to_path_buf()
        } else {
            dir.join(FIXTURE_REPO_DIR)
        };
        let root = repo.join(FIXTURE_DIR);
        if root.is_dir() {
            if depth > 0 {
                warn!(
                    "Moved up {} directories from {} to find {}",
                    depth,
                    start.display(),
                    root.display()
                );
            }
            return Ok(root);
        }
    }

    Err(ConformanceError::Discovery(format!(
        "Could not find the '{}' directory from {}",
        FIXTURE_REPO_DIR,
        start.display()
    )))
}

/// Immediate sub-directories of `root`, sorted by name
pub fn candidate_dirs(root: &Path) -> Result<Vec<PathBuf>, ConformanceError> {
    if !root.is_dir() {
        return Err(ConformanceError::Discovery(format!(
            "Fixture directory not found: {}",
            root.display()
        )));
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ConformanceError::Discovery(format!("Failed to scan {}: {}", root.display(), e))
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

/// Validate every candidate under `root`; invalid ones are skipped with
/// their reason and the scan carries on
pub fn discover(root: &Path, layout: &FixtureLayout) -> Result<Discovery, ConformanceError> {
    let (fixtures, skipped) = scan(root, layout, Validation::Strict)?;
    let mut set = FixtureSet::new();
    for fixture in fixtures {
        set.add(fixture)?;
    }
    debug!(
        "Discovered {} fixtures ({} skipped) under {}",
        set.len(),
        skipped.len(),
        root.display()
    );
    Ok(Discovery { set, skipped })
}

/// Load every candidate leniently, for listing
pub fn list(
    root: &Path,
    layout: &FixtureLayout,
) -> Result<(Vec<Fixture>, Vec<SkippedFixture>), ConformanceError> {
    scan(root, layout, Validation::Lenient)
}

fn scan(
    root: &Path,
    layout: &FixtureLayout,
    validation: Validation,
) -> Result<(Vec<Fixture>, Vec<SkippedFixture>), ConformanceError> {
    let mut fixtures = Vec::new();
    let mut skipped = Vec::new();

    for path in candidate_dirs(root)? {
        match Fixture::load_with(&path, layout, validation) {
            Ok(fixture) => fixtures.push(fixture),
            Err(error) => {
                warn!("Skipping {}: {}", path.display(), error);
                skipped.push(SkippedFixture { path, error });
            }
        }
    }

    Ok((fixtures, skipped))
}
