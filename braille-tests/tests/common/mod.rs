//! Shared fixture trees for the integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in translator: forward prefixes every line with the capital sign,
/// reverse strips it. `SLOW` inputs hang, `CRASH` inputs fail after writing
/// part of a result.
pub const TRANSLATOR: &str = r#"#!/bin/sh
direction="$2"
input="$4"
mkdir -p out
if grep -q SLOW "$input"; then
    echo "translating $input"
    exec sleep 30
fi
if grep -q CRASH "$input"; then
    echo "partial" > out/afr_t2b.brf
    echo "Exception in thread main" >&2
    exit 2
fi
case "$direction" in
    t2b) sed 's/^/,/' "$input" > out/afr_t2b.brf ;;
    b2t) sed 's/^,//' "$input" > out/brf_b2t.txt ;;
    *) echo "unknown direction $direction" >&2; exit 64 ;;
esac
"#;

pub const LAUNCHER: &str = "sh translate.sh";

pub struct Workspace {
    tmp: TempDir,
    pub project: PathBuf,
    pub fixtures: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_fixture_root("testcases")
    }

    /// Workspace whose fixtures live at `relative` under the temp root
    pub fn with_fixture_root(relative: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("12345678-RW214-project");
        fs::create_dir_all(project.join("bin")).unwrap();
        fs::create_dir_all(project.join("out")).unwrap();
        fs::write(project.join("translate.sh"), TRANSLATOR).unwrap();
        let fixtures = tmp.path().join(relative);
        fs::create_dir_all(&fixtures).unwrap();
        Self { tmp, project, fixtures }
    }

    /// Write a fixture with a well-formed manifest
    pub fn fixture(&self, dir: &str, level: &str, tags: &[&str], plain: &str, encoded: &str) {
        let manifest = serde_json::json!({
            "$schema": "../schema.json",
            "name": dir,
            "desc": format!("{} fixture", dir),
            "level": level,
            "tags": tags,
        });
        self.raw_fixture(dir, &manifest.to_string(), plain, encoded);
    }

    pub fn raw_fixture(&self, dir: &str, manifest: &str, plain: &str, encoded: &str) {
        let root = self.fixtures.join(dir);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("manifest.json"), manifest).unwrap();
        fs::write(root.join("afr.txt"), plain).unwrap();
        fs::write(root.join("brf.brf"), encoded).unwrap();
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn results_left(&self) -> Vec<String> {
        fs::read_dir(self.project.join("out"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}
