//! Test execution: driving the translator once per fixture and direction

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::comparison::{align, outputs_match, unified_diff, Alignment};
use crate::config::{Direction, FixtureLayout, ProgramConfig};
use crate::fixture::Fixture;
use crate::status::{StateError, Status};
use crate::ConformanceError;

/// How long to keep draining pipes after the child exited or was killed
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A single translator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// What a finished (or killed) invocation left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed or ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Capability to run one external process with a bounded wait.
///
/// Implementations make a single attempt; `Err` means the process could not
/// be started at all.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput>;
}

impl<F> ProcessRunner for F
where
    F: Fn(&Invocation) -> io::Result<ProcessOutput>,
{
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        self(invocation)
    }
}

/// Runs processes on a private current-thread tokio runtime
pub struct TokioProcessRunner {
    runtime: tokio::runtime::Runtime,
}

impl TokioProcessRunner {
    pub fn new() -> Result<Self, ConformanceError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                ConformanceError::Execution(format!("Failed to create async runtime: {}", e))
            })?;
        Ok(Self { runtime })
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        self.runtime.block_on(run_with_timeout(invocation))
    }
}

async fn run_with_timeout(invocation: &Invocation) -> io::Result<ProcessOutput> {
    let mut child = TokioCommand::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // Pipes are drained into shared buffers so a kill keeps what was written.
    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let readers = [
        child.stdout.take().map(|pipe| tokio::spawn(drain(pipe, Arc::clone(&stdout_buf)))),
        child.stderr.take().map(|pipe| tokio::spawn(drain(pipe, Arc::clone(&stderr_buf)))),
    ];

    let (exit_code, timed_out) = match timeout(invocation.timeout, child.wait()).await {
        Ok(status) => (status?.code(), false),
        Err(_) => {
            warn!("{} exceeded {:?}, killing it", invocation.program, invocation.timeout);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill {}: {}", invocation.program, e);
            }
            (None, true)
        }
    };

    for reader in readers.into_iter().flatten() {
        if timeout(DRAIN_GRACE, reader).await.is_err() {
            warn!(
                "Output of {} may be truncated: a pipe was still open {:?} after exit",
                invocation.program, DRAIN_GRACE
            );
        }
    }

    let stdout = String::from_utf8_lossy(&stdout_buf.lock().await).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_buf.lock().await).into_owned();

    Ok(ProcessOutput { exit_code, stdout, stderr, timed_out })
}

async fn drain<R: AsyncRead + Unpin>(mut pipe: R, sink: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => sink.lock().await.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Texts captured for one direction of a completed fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionResult {
    pub direction: Direction,
    pub input: String,
    pub expected: String,
    pub received: String,
}

impl DirectionResult {
    pub fn passed(&self) -> bool {
        outputs_match(&self.expected, &self.received)
    }

    /// Span alignment of expected vs received
    pub fn alignment(&self) -> Alignment {
        align(&self.expected, &self.received)
    }

    /// Line diff of expected vs received, empty when equal
    pub fn unified_diff(&self) -> String {
        unified_diff(&self.expected, &self.received)
    }
}

/// Captures of a fixture whose directions all ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub forward: DirectionResult,
    pub reverse: DirectionResult,
}

impl TestResult {
    pub fn get(&self, direction: Direction) -> &DirectionResult {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        }
    }

    pub fn directions(&self) -> impl Iterator<Item = &DirectionResult> {
        [&self.forward, &self.reverse].into_iter()
    }

    /// Every direction matched
    pub fn passed(&self) -> bool {
        self.directions().all(DirectionResult::passed)
    }

    /// Terminal status implied by the comparison
    pub fn status(&self) -> Status {
        if self.passed() {
            Status::Passed
        } else {
            Status::Failed
        }
    }
}

/// Why a fixture could not be judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Project, compiled artifacts or input file missing, or launch failed
    Precondition,
    /// The translator exceeded its time allowance and was killed
    Timeout,
    /// The translator exited non-zero
    ProcessFailure,
    /// A file could not be read or removed
    Io,
    /// A file was not valid UTF-8
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Precondition => "precondition failed",
            Self::Timeout => "timed out",
            Self::ProcessFailure => "process failed",
            Self::Io => "I/O error",
            Self::Decode => "decode error",
        };
        f.write_str(label)
    }
}

/// Terminal failure recorded on a fixture that ended in [`Status::Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub direction: Direction,
    pub message: String,
    /// Whatever results file the translator left behind, if any
    pub partial_output: Option<String>,
}

impl RunFailure {
    fn new(kind: FailureKind, direction: Direction, message: impl Into<String>) -> Self {
        Self { kind, direction, message: message.into(), partial_output: None }
    }

    fn with_partial_output(mut self, output: Option<String>) -> Self {
        self.partial_output = output;
        self
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.direction, self.message)
    }
}

/// Runs fixtures against one translator installation
pub struct TestExecutor {
    runner: Box<dyn ProcessRunner>,
    program: ProgramConfig,
    layout: FixtureLayout,
    timeout: Duration,
}

impl TestExecutor {
    pub fn new(
        runner: impl ProcessRunner + 'static,
        program: ProgramConfig,
        layout: FixtureLayout,
        timeout: Duration,
    ) -> Self {
        Self::from_boxed(Box::new(runner), program, layout, timeout)
    }

    pub(crate) fn from_boxed(
        runner: Box<dyn ProcessRunner>,
        program: ProgramConfig,
        layout: FixtureLayout,
        timeout: Duration,
    ) -> Self {
        Self { runner, program, layout, timeout }
    }

    pub fn program(&self) -> &ProgramConfig {
        &self.program
    }

    pub fn layout(&self) -> &FixtureLayout {
        &self.layout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Path the translator writes its result to for `direction`
    pub fn results_path(&self, direction: Direction) -> PathBuf {
        self.program.output_path(&self.layout).join(self.layout.result_file(direction))
    }

    /// Run every direction of `fixture` and leave it in a terminal status.
    ///
    /// Only a `Ready` fixture can be executed. Failures of the translator are
    /// recorded on the fixture rather than returned.
    pub fn execute(&self, fixture: &mut Fixture) -> Result<Status, StateError> {
        if fixture.status() != Status::Ready {
            return Err(StateError::NotReady {
                name: fixture.name().to_string(),
                status: fixture.status(),
            });
        }
        fixture.advance(Status::Running)?;

        let start = Instant::now();
        let outcome = self.run_directions(fixture);
        fixture.elapsed = Some(start.elapsed());

        match outcome {
            Ok(result) => {
                fixture.advance(Status::Complete)?;
                let status = result.status();
                fixture.result = Some(result);
                fixture.advance(status)?;
                info!("{}: {}", fixture.name(), status);
            }
            Err(failure) => {
                warn!("{}: {}", fixture.name(), failure);
                fixture.failure = Some(failure);
                fixture.advance(Status::Error)?;
            }
        }

        Ok(fixture.status())
    }

    fn run_directions(&self, fixture: &mut Fixture) -> Result<TestResult, RunFailure> {
        let forward = self.run_direction(fixture, Direction::Forward)?;
        let reverse = self.run_direction(fixture, Direction::Reverse)?;
        Ok(TestResult { forward, reverse })
    }

    fn run_direction(
        &self,
        fixture: &mut Fixture,
        direction: Direction,
    ) -> Result<DirectionResult, RunFailure> {
        let input_path = fixture.root().join(self.layout.input_file(direction));
        let expected_path = fixture.root().join(self.layout.expected_file(direction));
        let results_path = self.results_path(direction);

        self.check_preconditions(&input_path, direction)?;
        remove_stale(&results_path, direction)?;

        let invocation = self.invocation(fixture, direction, &input_path)?;
        debug!("Running {} {}", invocation.program, invocation.args.join(" "));

        let output = self.runner.run(&invocation).map_err(|e| {
            RunFailure::new(
                FailureKind::Precondition,
                direction,
                format!("Failed to launch {}: {}", invocation.program, e),
            )
        })?;
        fixture.stdout.push_str(&output.stdout);
        fixture.stderr.push_str(&output.stderr);

        if output.timed_out {
            return Err(RunFailure::new(
                FailureKind::Timeout,
                direction,
                format!("Translator did not finish within {}s", self.timeout.as_secs_f64()),
            )
            .with_partial_output(salvage(&results_path)));
        }

        if output.exit_code != Some(0) {
            let code = output.exit_code.map_or_else(|| "a signal".to_string(), |c| c.to_string());
            return Err(RunFailure::new(
                FailureKind::ProcessFailure,
                direction,
                format!("Translator exited with {}", code),
            )
            .with_partial_output(salvage(&results_path)));
        }

        let received = take_results(&results_path, direction)?;
        let input = read_text(&input_path, direction)?;
        let expected = read_text(&expected_path, direction)?;

        Ok(DirectionResult { direction, input, expected, received })
    }

    fn check_preconditions(
        &self,
        input_path: &Path,
        direction: Direction,
    ) -> Result<(), RunFailure> {
        let missing =
            |message: String| RunFailure::new(FailureKind::Precondition, direction, message);

        if !self.program.root.is_dir() {
            return Err(missing(format!(
                "Project directory not found: {}",
                self.program.root.display()
            )));
        }
        let artifacts = self.program.artifacts_path();
        if !artifacts.exists() {
            return Err(missing(format!(
                "Compiled translator not found at {}",
                artifacts.display()
            )));
        }
        if !input_path.is_file() {
            return Err(missing(format!("Input file not found: {}", input_path.display())));
        }
        Ok(())
    }

    fn invocation(
        &self,
        fixture: &Fixture,
        direction: Direction,
        input_path: &Path,
    ) -> Result<Invocation, RunFailure> {
        let absolute = input_path.canonicalize().map_err(|e| {
            RunFailure::new(
                FailureKind::Io,
                direction,
                format!("Failed to resolve {}: {}", input_path.display(), e),
            )
        })?;

        let (program, leading) = self.program.launcher.split_first().ok_or_else(|| {
            RunFailure::new(FailureKind::Precondition, direction, "Launcher is empty")
        })?;

        let mut args = leading.to_vec();
        args.push(self.program.mode_flag.clone());
        args.push(self.layout.direction_code(direction).to_string());
        args.push(fixture.level().to_string());
        args.push(absolute.to_string_lossy().into_owned());

        Ok(Invocation {
            program: program.clone(),
            args,
            cwd: self.program.root.clone(),
            timeout: self.timeout,
        })
    }
}

fn remove_stale(path: &Path, direction: Direction) -> Result<(), RunFailure> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale results file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RunFailure::new(
            FailureKind::Io,
            direction,
            format!("Failed to remove stale results {}: {}", path.display(), e),
        )),
    }
}

fn read_text(path: &Path, direction: Direction) -> Result<String, RunFailure> {
    let bytes = fs::read(path).map_err(|e| {
        let message = format!("Failed to read {}: {}", path.display(), e);
        RunFailure::new(FailureKind::Io, direction, message)
    })?;
    String::from_utf8(bytes).map_err(|e| {
        RunFailure::new(
            FailureKind::Decode,
            direction,
            format!("{} is not valid UTF-8: {}", path.display(), e),
        )
    })
}

/// Read the results file and delete it, whatever the read outcome
fn take_results(path: &Path, direction: Direction) -> Result<String, RunFailure> {
    let text = read_text(path, direction);
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove results file {}: {}", path.display(), e);
        }
    }
    text
}

/// Best-effort capture of a results file left by a failed invocation
fn salvage(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove results file {}: {}", path.display(), e);
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
