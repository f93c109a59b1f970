//! Configuration: command line, fixture layout and translator launch settings

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ConformanceError;

/// Translation direction exercised by a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Plain Afrikaans text to braille
    Forward,
    /// Braille back to plain Afrikaans text
    Reverse,
}

impl Direction {
    /// Every direction, in execution order
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Reverse];

    /// Short label used in reports
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Forward => "T2B",
            Self::Reverse => "B2T",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// File names inside a fixture bundle and inside the translator's output area.
///
/// The forward direction reads the plain file and expects the encoded file;
/// the reverse direction does the opposite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureLayout {
    pub manifest: String,
    pub plain_file: String,
    pub encoded_file: String,
    /// Directory under the program root the translator writes results into
    pub output_dir: String,
    pub forward_result: String,
    pub reverse_result: String,
    pub forward_code: String,
    pub reverse_code: String,
}

impl Default for FixtureLayout {
    fn default() -> Self {
        Self {
            manifest: "manifest.json".to_string(),
            plain_file: "afr.txt".to_string(),
            encoded_file: "brf.brf".to_string(),
            output_dir: "out".to_string(),
            forward_result: "afr_t2b.brf".to_string(),
            reverse_result: "brf_b2t.txt".to_string(),
            forward_code: "t2b".to_string(),
            reverse_code: "b2t".to_string(),
        }
    }
}

impl FixtureLayout {
    /// Load a layout from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConformanceError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConformanceError::Config(format!("Failed to read layout {}: {}", path.display(), e))
        })?;
        let layout: Self = serde_json::from_str(&content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// File in the fixture the translator is given for `direction`
    pub fn input_file(&self, direction: Direction) -> &str {
        match direction {
            Direction::Forward => &self.plain_file,
            Direction::Reverse => &self.encoded_file,
        }
    }

    /// File in the fixture holding the expected translation for `direction`
    pub fn expected_file(&self, direction: Direction) -> &str {
        match direction {
            Direction::Forward => &self.encoded_file,
            Direction::Reverse => &self.plain_file,
        }
    }

    /// File name the translator writes for `direction`
    pub fn result_file(&self, direction: Direction) -> &str {
        match direction {
            Direction::Forward => &self.forward_result,
            Direction::Reverse => &self.reverse_result,
        }
    }

    /// Direction argument passed to the translator
    pub fn direction_code(&self, direction: Direction) -> &str {
        match direction {
            Direction::Forward => &self.forward_code,
            Direction::Reverse => &self.reverse_code,
        }
    }

    /// Content files every fixture must carry
    pub fn content_files(&self) -> [&str; 2] {
        [&self.plain_file, &self.encoded_file]
    }

    pub fn validate(&self) -> Result<(), ConformanceError> {
        let names = [
            ("manifest", &self.manifest),
            ("plain_file", &self.plain_file),
            ("encoded_file", &self.encoded_file),
            ("output_dir", &self.output_dir),
            ("forward_result", &self.forward_result),
            ("reverse_result", &self.reverse_result),
            ("forward_code", &self.forward_code),
            ("reverse_code", &self.reverse_code),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ConformanceError::Config(format!("Layout key '{}' is empty", key)));
            }
        }
        if self.plain_file == self.encoded_file {
            return Err(ConformanceError::Config(
                "Plain and encoded content files must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// How to launch the translator under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Project root; used as the working directory of every invocation
    pub root: PathBuf,
    /// Program and leading arguments, e.g. `java -cp ./bin src.Translate`
    pub launcher: Vec<String>,
    /// First argument after the launcher
    pub mode_flag: String,
    /// Directory under `root` holding the built translator
    pub artifacts_dir: String,
}

impl ProgramConfig {
    pub const DEFAULT_LAUNCHER: &'static str = "java -cp ./bin src.Translate";
    pub const DEFAULT_MODE_FLAG: &'static str = "noGUI";
    pub const DEFAULT_ARTIFACTS_DIR: &'static str = "bin";

    /// Default launch settings for a compiled project rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            launcher: vec![
                "java".to_string(),
                "-cp".to_string(),
                "./bin".to_string(),
                "src.Translate".to_string(),
            ],
            mode_flag: Self::DEFAULT_MODE_FLAG.to_string(),
            artifacts_dir: Self::DEFAULT_ARTIFACTS_DIR.to_string(),
        }
    }

    /// Replace the launcher with a shell-style command string
    pub fn with_launcher(mut self, command: &str) -> Result<Self, ConformanceError> {
        let parts = shlex::split(command)
            .ok_or_else(|| ConformanceError::Config(format!("Unparseable launcher: {}", command)))?;
        if parts.is_empty() {
            return Err(ConformanceError::Config("Launcher must not be empty".to_string()));
        }
        self.launcher = parts;
        Ok(self)
    }

    pub fn with_mode_flag(mut self, flag: impl Into<String>) -> Self {
        self.mode_flag = flag.into();
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<String>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn artifacts_path(&self) -> PathBuf {
        self.root.join(&self.artifacts_dir)
    }

    pub fn output_path(&self, layout: &FixtureLayout) -> PathBuf {
        self.root.join(&layout.output_dir)
    }

    /// Validate the launch settings
    pub fn validate(&self) -> Result<(), ConformanceError> {
        if self.launcher.is_empty() {
            return Err(ConformanceError::Config("Launcher must not be empty".to_string()));
        }
        if !self.root.is_dir() {
            return Err(ConformanceError::Config(format!(
                "Project directory not found: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// Report format for the `test` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// Summary and breakdown tables
    Table,
    /// Machine readable records
    Json,
    /// Narrative report with side-by-side details
    Report,
}

/// Presentation choices threaded into every renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Highlight statuses and diff spans
    pub color: bool,
    /// Box-drawn tables instead of plain ` | ` separated columns
    pub pretty: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { color: true, pretty: true }
    }
}

/// Conformance runner for the Afrikaans/Braille translator
#[derive(Debug, Parser)]
#[command(name = "braille-tests")]
#[command(version, about = "Test runner for the Braille-Afrikaans translator project")]
pub struct Cli {
    /// Disable color output
    #[arg(short = 'c', long = "no-color", global = true)]
    pub no_color: bool,

    /// Disable pretty printing of tabular data
    #[arg(short = 'p', long = "no-pretty-print", global = true)]
    pub no_pretty_print: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory holding one sub-directory per fixture; searched for from
    /// the working directory when omitted
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// JSON file overriding fixture and result file names
    #[arg(long, global = true)]
    pub layout: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fixtures against a project
    Test(TestArgs),
    /// Validate fixture structure without running anything
    Validate(ValidateArgs),
    /// List fixtures without gating on validation
    List,
}

#[derive(Debug, Clone, Args)]
pub struct TestArgs {
    /// Project directory (your/path/to/<student_number>-RW214-project)
    pub proj_dir: PathBuf,

    /// Timeout for each translator invocation in seconds
    #[arg(short, long, default_value_t = 10)]
    pub timeout: u64,

    /// Show stdout/stderr captured from the translator
    #[arg(short, long)]
    pub error: bool,

    /// Show per-fixture details (name, level, tags, texts)
    #[arg(short, long)]
    pub details: bool,

    /// Include passing fixtures in detail views
    #[arg(long)]
    pub show_passing: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Override the translator launcher (shell syntax)
    #[arg(long, default_value = ProgramConfig::DEFAULT_LAUNCHER)]
    pub launcher: String,

    /// First argument passed to the translator
    #[arg(long, default_value = ProgramConfig::DEFAULT_MODE_FLAG)]
    pub mode_flag: String,

    /// Directory under the project holding the built translator
    #[arg(long, default_value = ProgramConfig::DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: String,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl TestArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Build and validate the launch settings for this run
    pub fn program_config(&self) -> Result<ProgramConfig, ConformanceError> {
        if self.timeout == 0 {
            return Err(ConformanceError::Config("Timeout must be greater than 0".to_string()));
        }
        let root = self.proj_dir.canonicalize().map_err(|e| {
            ConformanceError::Config(format!(
                "Project directory not found: {}: {}",
                self.proj_dir.display(),
                e
            ))
        })?;
        let program = ProgramConfig::new(root)
            .with_launcher(&self.launcher)?
            .with_mode_flag(&self.mode_flag)
            .with_artifacts_dir(&self.artifacts_dir);
        program.validate()?;
        Ok(program)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Print a summary of the valid fixtures (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions { color: !self.no_color, pretty: !self.no_pretty_print }
    }

    /// Fixture root from `--fixtures`, or located from the working directory
    pub fn fixture_root(&self) -> Result<PathBuf, ConformanceError> {
        match &self.fixtures {
            Some(path) => Ok(path.clone()),
            None => crate::discovery::locate_fixture_root(&std::env::current_dir()?),
        }
    }

    /// Layout from `--layout`, or the default one
    pub fn fixture_layout(&self) -> Result<FixtureLayout, ConformanceError> {
        match &self.layout {
            Some(path) => FixtureLayout::from_file(path),
            None => Ok(FixtureLayout::default()),
        }
    }
}
