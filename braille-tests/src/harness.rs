//! Fixture sets and the harness that discovers and runs them

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::{Serialize, Serializer};
use std::iter::Sum;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Direction, FixtureLayout, ProgramConfig};
use crate::discovery::{self, Discovery};
use crate::execution::{ProcessRunner, TestExecutor, TokioProcessRunner};
use crate::fixture::{Fixture, Level};
use crate::reporting::FixtureRecord;
use crate::status::{StateError, Status};
use crate::ConformanceError;

/// Terminal-status counts for a group of fixtures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Every fixture in the group, including ones not run yet
    pub total: usize,
}

impl StatusCounts {
    fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Error => self.errored += 1,
            Status::Ready | Status::Running | Status::Complete => {}
        }
    }
}

impl<'a> Sum<&'a StatusCounts> for StatusCounts {
    fn sum<I: Iterator<Item = &'a StatusCounts>>(iter: I) -> Self {
        iter.fold(StatusCounts::default(), |acc, c| StatusCounts {
            passed: acc.passed + c.passed,
            failed: acc.failed + c.failed,
            errored: acc.errored + c.errored,
            total: acc.total + c.total,
        })
    }
}

/// Aggregate over a whole fixture set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub total: usize,
    /// Sum of per-fixture run durations
    #[serde(serialize_with = "as_seconds")]
    pub total_time: Duration,
}

impl Summary {
    /// No fixture failed or errored
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Share of `count` in the total, as a percentage
    pub fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

fn as_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Ordered fixtures, open for additions until the single run seals it.
///
/// Every aggregate is derived from the fixtures' current state on each call.
#[derive(Debug, Default)]
pub struct FixtureSet {
    fixtures: Vec<Fixture>,
    complete: bool,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `Ready` fixture
    pub fn add(&mut self, fixture: Fixture) -> Result<(), StateError> {
        if self.complete {
            return Err(StateError::Sealed);
        }
        if fixture.status() != Status::Ready {
            return Err(StateError::NotReady {
                name: fixture.name().to_string(),
                status: fixture.status(),
            });
        }
        self.fixtures.push(fixture);
        Ok(())
    }

    /// Run every fixture in insertion order, then seal the set
    pub fn run(&mut self, executor: &TestExecutor) -> Result<(), StateError> {
        self.run_with(executor, |_, _| {})
    }

    /// Like [`FixtureSet::run`], calling `observer` with the set and the
    /// index of each fixture as soon as that fixture finishes
    pub fn run_with<F>(
        &mut self,
        executor: &TestExecutor,
        mut observer: F,
    ) -> Result<(), StateError>
    where
        F: FnMut(&FixtureSet, usize),
    {
        if self.complete {
            return Err(StateError::Sealed);
        }
        for index in 0..self.fixtures.len() {
            self.fixtures[index].run(executor)?;
            observer(self, index);
        }
        self.complete = true;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Fixture> {
        self.fixtures.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.iter()
    }

    pub fn summary(&self) -> Summary {
        let mut counts = StatusCounts::default();
        for fixture in &self.fixtures {
            counts.record(fixture.status());
        }
        Summary {
            passed: counts.passed,
            failed: counts.failed,
            errored: counts.errored,
            total: counts.total,
            total_time: self.fixtures.iter().filter_map(Fixture::elapsed).sum(),
        }
    }

    /// Counts per declared level, in first-seen order
    pub fn by_level(&self) -> Vec<(Level, StatusCounts)> {
        self.group(|fixture| vec![fixture.level().clone()])
    }

    /// Counts per tag, in first-seen order; a fixture counts once per tag
    pub fn by_tag(&self) -> Vec<(String, StatusCounts)> {
        self.group(|fixture| fixture.tags().to_vec())
    }

    /// Per-direction outcome. Completed fixtures count as passed or failed
    /// for each direction; an errored fixture counts once, in the direction
    /// that failed.
    pub fn by_direction(&self) -> Vec<(Direction, StatusCounts)> {
        Direction::ALL
            .iter()
            .map(|&direction| {
                let mut counts = StatusCounts::default();
                for fixture in &self.fixtures {
                    if let Some(result) = fixture.result() {
                        let passed = result.get(direction).passed();
                        counts.record(if passed { Status::Passed } else { Status::Failed });
                    } else if let Some(failure) = fixture.failure() {
                        if failure.direction == direction {
                            counts.record(Status::Error);
                        }
                    }
                }
                (direction, counts)
            })
            .collect()
    }

    /// Stable per-fixture records for reporting
    pub fn records(&self) -> Vec<FixtureRecord> {
        self.fixtures.iter().map(FixtureRecord::from).collect()
    }

    fn group<K, F>(&self, keys: F) -> Vec<(K, StatusCounts)>
    where
        K: PartialEq,
        F: Fn(&Fixture) -> Vec<K>,
    {
        let mut groups: Vec<(K, StatusCounts)> = Vec::new();
        for fixture in &self.fixtures {
            for key in keys(fixture) {
                let index = match groups.iter().position(|(k, _)| *k == key) {
                    Some(index) => index,
                    None => {
                        groups.push((key, StatusCounts::default()));
                        groups.len() - 1
                    }
                };
                groups[index].1.record(fixture.status());
            }
        }
        groups
    }
}

/// Discovers the fixtures under one root and runs them with progress display
pub struct ConformanceHarness {
    executor: TestExecutor,
    fixtures_root: PathBuf,
    quiet: bool,
}

impl ConformanceHarness {
    pub fn new(executor: TestExecutor, fixtures_root: impl Into<PathBuf>) -> Self {
        Self { executor, fixtures_root: fixtures_root.into(), quiet: false }
    }

    /// Hide the progress bar
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn executor(&self) -> &TestExecutor {
        &self.executor
    }

    pub fn fixtures_root(&self) -> &Path {
        &self.fixtures_root
    }

    /// Scan the fixture root without running anything
    pub fn discover(&self) -> Result<Discovery, ConformanceError> {
        discovery::discover(&self.fixtures_root, self.executor.layout())
    }

    /// Run `set` with a progress bar
    pub fn run(&self, set: &mut FixtureSet) -> Result<(), ConformanceError> {
        let progress = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(set.len() as u64)
        };
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
        );

        set.run_with(&self.executor, |set, index| {
            if let Some(fixture) = set.get(index) {
                progress.set_message(format!("{}: {}", fixture.name(), fixture.status()));
            }
            progress.inc(1);
        })?;

        progress.finish_with_message("Fixtures completed");
        Ok(())
    }

    /// Discover and run every valid fixture
    pub fn run_all(&self) -> Result<Discovery, ConformanceError> {
        let mut found = self.discover()?;
        if found.set.is_empty() {
            return Err(ConformanceError::Discovery(format!(
                "No valid fixtures found under {}",
                self.fixtures_root.display()
            )));
        }

        info!(
            "Running {} fixtures against {}",
            found.set.len(),
            self.executor.program().root.display()
        );
        self.run(&mut found.set)?;
        Ok(found)
    }
}

/// Builder for [`ConformanceHarness`]
pub struct HarnessBuilder {
    program: ProgramConfig,
    fixtures_root: PathBuf,
    layout: FixtureLayout,
    timeout: Duration,
    runner: Option<Box<dyn ProcessRunner>>,
    quiet: bool,
}

impl HarnessBuilder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(program: ProgramConfig, fixtures_root: impl Into<PathBuf>) -> Self {
        Self {
            program,
            fixtures_root: fixtures_root.into(),
            layout: FixtureLayout::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            runner: None,
            quiet: false,
        }
    }

    pub fn layout(mut self, layout: FixtureLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Wait allowed for each translator invocation
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the process runner; real processes are used otherwise
    pub fn runner(mut self, runner: impl ProcessRunner + 'static) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> Result<ConformanceHarness, ConformanceError> {
        if self.timeout.is_zero() {
            return Err(ConformanceError::Config("Timeout must be greater than 0".to_string()));
        }
        self.program.validate()?;
        self.layout.validate()?;

        let runner = match self.runner {
            Some(runner) => runner,
            None => Box::new(TokioProcessRunner::new()?),
        };
        let executor = TestExecutor::from_boxed(runner, self.program, self.layout, self.timeout);
        Ok(ConformanceHarness::new(executor, self.fixtures_root).quiet(self.quiet))
    }
}
