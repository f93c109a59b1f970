//! Test reporting: stable per-fixture records, tables and report formats

use chrono::{DateTime, Utc};
use console::{measure_text_width, pad_str, style, truncate_str, Style};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::PathBuf;

use crate::comparison::{escape_newlines, Alignment};
use crate::config::{Direction, OutputFormat, RenderOptions};
use crate::discovery::SkippedFixture;
use crate::execution::{DirectionResult, RunFailure, TestResult};
use crate::fixture::Fixture;
use crate::harness::{FixtureSet, StatusCounts, Summary};
use crate::status::Status;
use crate::ConformanceError;

/// Column width for texts in the narrative report
const DETAIL_WIDTH: usize = 40;

/// Everything a report needs to know about one fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub name: String,
    pub description: String,
    pub level: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub stdout: String,
    pub stderr: String,
    /// Run duration in seconds
    pub elapsed: Option<f64>,
    pub result: Option<TestResult>,
    pub failure: Option<RunFailure>,
}

impl From<&Fixture> for FixtureRecord {
    fn from(fixture: &Fixture) -> Self {
        Self {
            name: fixture.name().to_string(),
            description: fixture.description().to_string(),
            level: fixture.level().to_string(),
            tags: fixture.tags().to_vec(),
            status: fixture.status(),
            stdout: fixture.stdout().to_string(),
            stderr: fixture.stderr().to_string(),
            elapsed: fixture.elapsed().map(|d| d.as_secs_f64()),
            result: fixture.result().cloned(),
            failure: fixture.failure().cloned(),
        }
    }
}

impl FixtureRecord {
    fn visible(&self, show_passing: bool) -> bool {
        show_passing || self.status != Status::Passed
    }
}

/// One row of a breakdown table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub key: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

impl Breakdown {
    fn from_pairs<K: ToString>(pairs: Vec<(K, StatusCounts)>) -> Vec<Self> {
        pairs.into_iter().map(|(key, counts)| Self { key: key.to_string(), counts }).collect()
    }
}

/// Fixture that was left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

/// What to include when rendering a report
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub render: RenderOptions,
    /// Per-fixture texts and comparisons
    pub details: bool,
    /// Include passing fixtures in per-fixture sections
    pub show_passing: bool,
    /// Captured stdout/stderr and failure reasons
    pub diagnostics: bool,
}

/// Snapshot of a fixture set taken after a run
#[derive(Debug, Serialize)]
pub struct TestReport {
    pub timestamp: DateTime<Utc>,
    pub summary: Summary,
    pub by_level: Vec<Breakdown>,
    pub by_tag: Vec<Breakdown>,
    pub by_direction: Vec<Breakdown>,
    pub fixtures: Vec<FixtureRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl TestReport {
    pub fn new(set: &FixtureSet, skipped: &[SkippedFixture]) -> Self {
        Self {
            timestamp: Utc::now(),
            summary: set.summary(),
            by_level: Breakdown::from_pairs(set.by_level()),
            by_tag: Breakdown::from_pairs(set.by_tag()),
            by_direction: Breakdown::from_pairs(set.by_direction()),
            fixtures: set.records(),
            skipped: skipped
                .iter()
                .map(|s| SkippedRecord { path: s.path.clone(), reason: s.error.to_string() })
                .collect(),
        }
    }

    /// Render in the requested format
    pub fn render(
        &self,
        format: OutputFormat,
        view: &ViewOptions,
    ) -> Result<String, ConformanceError> {
        match format {
            OutputFormat::Table => Ok(self.render_tables(view)),
            OutputFormat::Json => Ok(self.to_json()?),
            OutputFormat::Report => Ok(self.render_narrative(view)),
        }
    }

    /// Export report as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Summary and breakdown tables, the status of every fixture and the
    /// diagnostics of errored ones; per-fixture texts on request
    pub fn render_tables(&self, view: &ViewOptions) -> String {
        let RenderOptions { color, pretty } = view.render;
        let mut out = String::new();

        if !self.skipped.is_empty() {
            out.push_str(&heading("Skipped", color));
            for skipped in &self.skipped {
                let _ = writeln!(out, "{}: {}", skipped.path.display(), skipped.reason);
            }
            out.push('\n');
        }

        out.push_str(&heading("Results", color));
        out.push_str(&render_table(&self.results_rows(color), pretty));

        let fixture_total = StatusCounts {
            passed: self.summary.passed,
            failed: self.summary.failed,
            errored: self.summary.errored,
            total: self.summary.total,
        };
        // Direction rows count a fixture once per direction run.
        let direction_total: StatusCounts = self.by_direction.iter().map(|b| &b.counts).sum();
        for (title, label, breakdown, total) in [
            ("By Level", "Level", &self.by_level, fixture_total),
            ("By Tag", "Tag", &self.by_tag, fixture_total),
            ("By Direction", "Direction", &self.by_direction, direction_total),
        ] {
            out.push('\n');
            out.push_str(&heading(title, color));
            out.push_str(&render_table(&breakdown_rows(label, breakdown, &total), pretty));
        }

        out.push('\n');
        out.push_str(&heading("Fixtures", color));
        out.push_str(&render_table(&self.status_rows(color), pretty));

        let errors = self.render_errors(view);
        if !errors.is_empty() {
            out.push('\n');
            out.push_str(&heading("Errors", color));
            out.push_str(&errors);
        }

        if view.details {
            out.push('\n');
            out.push_str(&heading("Details", color));
            out.push_str(&render_table(&self.detail_rows(view), pretty));
        }

        if view.diagnostics {
            let diagnostics = self.render_diagnostics(view);
            if !diagnostics.is_empty() {
                out.push('\n');
                out.push_str(&heading("Diagnostics", color));
                out.push_str(&diagnostics);
            }
        }

        out
    }

    fn results_rows(&self, color: bool) -> Vec<Vec<String>> {
        let s = &self.summary;
        let row = |label: &str, count: usize, status: Option<Status>| {
            let label = match status {
                Some(status) => paint(label, status_style(status), color),
                None => label.to_string(),
            };
            vec![label, count.to_string(), format!("{:.0}%", s.percentage(count))]
        };
        vec![
            vec!["Status".to_string(), "Count".to_string(), "Percentage".to_string()],
            row("Passed", s.passed, Some(Status::Passed)),
            row("Failed", s.failed, Some(Status::Failed)),
            row("Error", s.errored, Some(Status::Error)),
            vec!["Total".to_string(), s.total.to_string(), "100%".to_string()],
        ]
    }

    fn status_rows(&self, color: bool) -> Vec<Vec<String>> {
        let mut rows = vec![["Name", "Level", "Status", "Reason"].map(str::to_string).to_vec()];
        rows.extend(self.fixtures.iter().map(|record| {
            vec![
                record.name.clone(),
                record.level.clone(),
                paint(record.status.as_str(), status_style(record.status), color),
                record.failure.as_ref().map(ToString::to_string).unwrap_or_default(),
            ]
        }));
        rows
    }

    fn detail_rows(&self, view: &ViewOptions) -> Vec<Vec<String>> {
        let color = view.render.color;
        let header = ["Name", "Level", "Status", "Direction", "Expected", "Received", "Input"];
        let mut rows = vec![header.map(str::to_string).to_vec()];

        for record in self.fixtures.iter().filter(|r| r.visible(view.show_passing)) {
            let status = paint(record.status.as_str(), status_style(record.status), color);
            match &record.result {
                Some(result) => {
                    for direction in result.directions() {
                        let (expected, received) = highlight(&direction.alignment(), color);
                        rows.push(vec![
                            record.name.clone(),
                            record.level.clone(),
                            status.clone(),
                            direction.direction.to_string(),
                            expected,
                            received,
                            escape_newlines(&direction.input),
                        ]);
                    }
                }
                None => {
                    let direction = record
                        .failure
                        .as_ref()
                        .map(|f| f.direction.to_string())
                        .unwrap_or_default();
                    rows.push(vec![
                        record.name.clone(),
                        record.level.clone(),
                        status,
                        direction,
                        String::new(),
                        String::new(),
                        String::new(),
                    ]);
                }
            }
        }
        rows
    }

    /// Failure, partial output and stderr of every errored fixture
    fn render_errors(&self, view: &ViewOptions) -> String {
        let mut out = String::new();
        for record in self.fixtures.iter().filter(|r| r.status == Status::Error) {
            write_diagnostics(&mut out, record, view.diagnostics, view.render.color);
        }
        out
    }

    /// Captured output of the remaining fixtures
    fn render_diagnostics(&self, view: &ViewOptions) -> String {
        let mut out = String::new();
        for record in self.fixtures.iter().filter(|r| r.visible(view.show_passing)) {
            let quiet = record.stdout.is_empty() && record.stderr.is_empty();
            if record.status == Status::Error || quiet {
                continue;
            }
            write_diagnostics(&mut out, record, true, view.render.color);
        }
        out
    }

    /// Plain-text report in prose, modelled on a test log
    pub fn render_narrative(&self, view: &ViewOptions) -> String {
        let color = view.render.color;
        let s = &self.summary;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Report for tests run on {}",
            self.timestamp.format("%d/%m/%Y, %H:%M:%S UTC")
        );
        out.push('\n');
        let _ = writeln!(
            out,
            "{} fixtures run, {} passed, {} failed, {} ended with an error.",
            s.total, s.passed, s.failed, s.errored
        );
        let _ = writeln!(out, "Total time: {:.2?}", s.total_time);
        for skipped in &self.skipped {
            let _ = writeln!(out, "Skipped {}: {}", skipped.path.display(), skipped.reason);
        }

        if !self.fixtures.is_empty() {
            out.push_str("\nFixture summary:\n");
            let width =
                self.fixtures.iter().map(|r| measure_text_width(&r.name)).max().unwrap_or(0) + 1;
            for record in &self.fixtures {
                let _ = writeln!(
                    out,
                    "{}: {}",
                    pad_str(&record.name, width, console::Alignment::Right, None),
                    paint(record.status.as_str(), status_style(record.status), color)
                );
            }
        }

        let errors = self.render_errors(view);
        if !errors.is_empty() {
            out.push_str("\nErrors:\n");
            out.push_str(&errors);
        }

        if view.details {
            out.push_str("\nFixture details\n");
            for record in self.fixtures.iter().filter(|r| r.visible(view.show_passing)) {
                out.push('\n');
                self.narrate_fixture(&mut out, record, view);
            }
        }

        out
    }

    fn narrate_fixture(&self, out: &mut String, record: &FixtureRecord, view: &ViewOptions) {
        let color = view.render.color;
        let _ = writeln!(out, "Name       : {}", record.name);
        let _ = writeln!(out, "Description: {}", record.description);
        let _ = writeln!(out, "Level      : {}", record.level);
        let _ = writeln!(out, "Tags       : {}", record.tags.join(", "));

        let Some(result) = &record.result else {
            let _ = writeln!(
                out,
                "Status     : {}",
                paint(record.status.as_str(), status_style(record.status), color)
            );
            if let Some(failure) = &record.failure {
                let _ = writeln!(out, "Failure    : {}", failure);
            }
            return;
        };

        let pair = |f: &dyn Fn(&DirectionResult) -> String| {
            format!(
                "{} | {}",
                pad_str(&f(&result.forward), DETAIL_WIDTH, console::Alignment::Left, None),
                f(&result.reverse)
            )
        };
        let verdict = |d: &DirectionResult| {
            let status = if d.passed() { Status::Passed } else { Status::Failed };
            paint(status.as_str(), status_style(status), color)
        };
        let clip = |text: &str| {
            truncate_str(&escape_newlines(text.trim()), DETAIL_WIDTH, "...").into_owned()
        };

        let _ = writeln!(out, "Status     : {}", pair(&verdict));
        let _ = writeln!(out, "Input      : {}", pair(&|d| clip(&d.input)));
        let _ = writeln!(out, "Expected   : {}", pair(&|d| clip(&d.expected)));
        let _ = writeln!(out, "Received   : {}", pair(&|d| clip(&d.received)));

        for direction in result.directions().filter(|d| !d.passed()) {
            narrate_difference(out, direction, color);
        }
    }
}

fn breakdown_rows(
    label: &str,
    breakdown: &[Breakdown],
    total: &StatusCounts,
) -> Vec<Vec<String>> {
    let counts_row = |key: &str, c: &StatusCounts| {
        vec![
            key.to_string(),
            c.passed.to_string(),
            c.failed.to_string(),
            c.errored.to_string(),
            c.total.to_string(),
        ]
    };
    let mut rows = vec![[label, "Passed", "Failed", "Error", "Total"].map(str::to_string).to_vec()];
    rows.extend(breakdown.iter().map(|b| counts_row(&b.key, &b.counts)));
    rows.push(counts_row("Total", total));
    rows
}

fn write_diagnostics(out: &mut String, record: &FixtureRecord, with_stdout: bool, color: bool) {
    let _ = writeln!(
        out,
        "{} [{}]",
        paint(&record.name, Style::new().bold(), color),
        paint(record.status.as_str(), status_style(record.status), color)
    );
    if let Some(failure) = &record.failure {
        let _ = writeln!(out, "  Failure: {}", failure);
        if let Some(partial) = &failure.partial_output {
            let _ = writeln!(out, "  Partial output: {}", escape_newlines(partial));
        }
    }
    let streams = [("stdout", &record.stdout), ("stderr", &record.stderr)];
    for (label, text) in streams {
        if label == "stdout" && !with_stdout {
            continue;
        }
        if text.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {}:", label);
        for line in text.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
}

fn narrate_difference(out: &mut String, result: &DirectionResult, color: bool) {
    let alignment = result.alignment();
    let (expected, received) = highlight(&alignment, color);
    let _ = writeln!(out, "{} expected : {}", result.direction, expected);
    let _ = writeln!(out, "{} received : {}", result.direction, received);
    if !color {
        let _ = writeln!(out, "               {}", difference_markers(&alignment));
    }
    if result.expected.trim().contains('\n') || result.received.trim().contains('\n') {
        for line in result.unified_diff().lines() {
            let line = if !color {
                line.to_string()
            } else if line.starts_with('+') {
                style(line).green().to_string()
            } else if line.starts_with('-') {
                style(line).red().to_string()
            } else {
                style(line).dim().to_string()
            };
            let _ = writeln!(out, "    {}", line);
        }
    }
}

/// Expected and received markup, each pair of spans padded to the same width.
///
/// Common spans are shown on green, differing spans on red.
pub fn highlight(alignment: &Alignment, color: bool) -> (String, String) {
    let mut expected = String::new();
    let mut received = String::new();
    for (index, (left, right)) in alignment.expected.iter().zip(&alignment.actual).enumerate() {
        let width = alignment.column_width(index);
        let style = if left.is_common() {
            Style::new().black().on_green()
        } else {
            Style::new().white().on_red()
        };
        expected.push_str(&paint(&format!("{:<width$}", left.text), style.clone(), color));
        received.push_str(&paint(&format!("{:<width$}", right.text), style, color));
    }
    (expected, received)
}

/// A line with `^` under every differing column of [`highlight`] output
pub fn difference_markers(alignment: &Alignment) -> String {
    (0..alignment.len())
        .map(|index| {
            let marker = if alignment.expected[index].is_common() { " " } else { "^" };
            marker.repeat(alignment.column_width(index))
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Render rows as a table; the first row is the header.
///
/// Pretty tables are box-drawn, plain tables separate columns with ` | `.
pub fn render_table(rows: &[Vec<String>], pretty: bool) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            let column = rows.iter().filter_map(|row| row.get(c));
            column.map(|cell| measure_text_width(cell)).max().unwrap_or(0)
        })
        .collect();
    let cells = |row: &Vec<String>| -> Vec<String> {
        (0..columns)
            .map(|c| {
                let cell = row.get(c).map_or("", String::as_str);
                pad_str(cell, widths[c], console::Alignment::Left, None).into_owned()
            })
            .collect()
    };

    let mut out = String::new();
    if !pretty {
        for row in rows {
            out.push_str(cells(row).join(" | ").trim_end());
            out.push('\n');
        }
        return out;
    }

    let rule = |left: &str, fill: &str, mid: &str, right: &str| -> String {
        let segments: Vec<String> = widths.iter().map(|w| fill.repeat(w + 2)).collect();
        format!("{}{}{}\n", left, segments.join(mid), right)
    };

    out.push_str(&rule("╒", "═", "╤", "╕"));
    for (index, row) in rows.iter().enumerate() {
        if index == 1 {
            out.push_str(&rule("╞", "═", "╪", "╡"));
        } else if index > 1 {
            out.push_str(&rule("├", "─", "┼", "┤"));
        }
        let _ = writeln!(out, "│ {} │", cells(row).join(" │ "));
    }
    out.push_str(&rule("╘", "═", "╧", "╛"));
    out
}

/// Fixture counts for the `validate` action; more detail with `verbosity`
pub fn render_inventory(set: &FixtureSet, verbosity: u8, pretty: bool) -> String {
    let mut rows = vec![vec!["Type".to_string(), "Count".to_string()]];
    for direction in Direction::ALL {
        rows.push(vec![direction.to_string(), set.len().to_string()]);
    }
    if verbosity > 0 {
        for (level, counts) in set.by_level() {
            rows.push(vec![format!("Level {}", level), counts.total.to_string()]);
        }
        for (tag, counts) in set.by_tag() {
            rows.push(vec![format!("Tag '{}'", tag), counts.total.to_string()]);
        }
        rows.push(vec!["Total".to_string(), set.len().to_string()]);
    }

    let mut out = render_table(&rows, pretty);
    if verbosity > 1 {
        out.push('\n');
        out.push_str(&render_listing(set.iter(), pretty));
    }
    out
}

/// Name, level, tags and description of each fixture
pub fn render_listing<'a>(fixtures: impl IntoIterator<Item = &'a Fixture>, pretty: bool) -> String {
    let mut rows = vec![["Name", "Level", "Tags", "Description"].map(str::to_string).to_vec()];
    rows.extend(fixtures.into_iter().map(|fixture| {
        vec![
            fixture.name().to_string(),
            fixture.level().to_string(),
            fixture.tags().join(", "),
            fixture.description().to_string(),
        ]
    }));
    render_table(&rows, pretty)
}

fn heading(title: &str, color: bool) -> String {
    format!("{}\n", paint(&format!("| {} |", title), Style::new().bold().cyan(), color))
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Passed => Style::new().green(),
        Status::Failed => Style::new().red(),
        Status::Error => Style::new().red().bold(),
        Status::Ready | Status::Running | Status::Complete => Style::new().dim(),
    }
}

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        style.apply_to(text).to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::align;
    use crate::harness::tests::{harness, tree};

    const PLAIN: ViewOptions = ViewOptions {
        render: RenderOptions { color: false, pretty: false },
        details: false,
        show_passing: false,
        diagnostics: false,
    };

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter().map(|row| row.iter().map(|c| c.to_string()).collect()).collect()
    }

    fn sample_report() -> TestReport {
        let tree = tree(&[
            ("a-pass", "1", &["text"]),
            ("b-fail", "2", &["text", "long"]),
            ("c-error", "2", &["numbers"]),
        ]);
        let found = harness(&tree).run_all().unwrap();
        TestReport::new(&found.set, &found.skipped)
    }

    #[test]
    fn test_plain_table() {
        let data = rows(&[&["Name", "Level"], &["greeting", "1"], &["x", "4.1"]]);
        let table = render_table(&data, false);
        assert_eq!(table, "Name     | Level\ngreeting | 1\nx        | 4.1\n");
    }

    #[test]
    fn test_pretty_table() {
        let table = render_table(&rows(&[&["A", "Bb"], &["ccc", "d"]]), true);
        let expected = "\
╒═════╤════╕
│ A   │ Bb │
╞═════╪════╡
│ ccc │ d  │
╘═════╧════╛
";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_table(&[], true), "");
    }

    #[test]
    fn test_highlight_pads_pairs() {
        let alignment = align("abc", "abXYc");
        let (expected, received) = highlight(&alignment, false);
        assert_eq!(expected, "ab  c");
        assert_eq!(received, "abXYc");
        assert_eq!(difference_markers(&alignment), "  ^^");
    }

    #[test]
    fn test_highlight_single_substitution() {
        let alignment = align("hello world", "hello_world");
        assert_eq!(difference_markers(&alignment), "     ^");
    }

    #[test]
    fn test_records_reflect_fixtures() {
        let report = sample_report();
        assert_eq!(report.fixtures.len(), 3);

        let passed = &report.fixtures[0];
        assert_eq!(passed.status, Status::Passed);
        assert!(passed.elapsed.is_some());
        assert!(passed.result.is_some());
        assert!(passed.failure.is_none());

        let errored = &report.fixtures[2];
        assert_eq!(errored.status, Status::Error);
        assert!(errored.result.is_none());
        assert_eq!(errored.stderr, "translator crashed");
    }

    #[test]
    fn test_json_shape() {
        let report = sample_report();
        let json = report.render(OutputFormat::Json, &PLAIN).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["summary"]["errored"], 1);
        assert_eq!(value["fixtures"][1]["status"], "FAILED");
        assert_eq!(value["fixtures"][0]["result"]["forward"]["direction"], "forward");
        assert_eq!(value["fixtures"][2]["failure"]["kind"], "process_failure");
        assert_eq!(value["fixtures"][2]["result"], serde_json::Value::Null);
        assert_eq!(value["by_level"][0]["key"], "1");
        assert_eq!(value["by_level"][1]["total"], 2);
        assert_eq!(value["by_tag"][0]["key"], "text");
    }

    #[test]
    fn test_tables_without_color() {
        let report = sample_report();
        let out = report.render(OutputFormat::Table, &PLAIN).unwrap();

        assert!(out.contains("| Results |"));
        assert!(out.contains("Passed | 1     | 33%"));
        assert!(out.contains("Total  | 3     | 100%"));
        assert!(out.contains("| By Tag |"));
        assert!(out.contains("text    | 1      | 1      | 0     | 2"));
        assert!(!out.contains("| Details |"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_default_table_enumerates_every_fixture() {
        let report = sample_report();
        let out = report.render(OutputFormat::Table, &ViewOptions::default()).unwrap();

        for name in ["a-pass", "b-fail", "c-error"] {
            assert!(out.contains(name), "{name} missing from:\n{out}");
        }
        assert!(out.contains("| Fixtures |"));
        assert!(out.contains("| Errors |"));
        assert!(out.contains("Translator exited with 1"));
        assert!(out.contains("translator crashed"));
        assert!(!out.contains("| Details |"));
    }

    #[test]
    fn test_fixture_status_rows() {
        let report = sample_report();
        let out = report.render_tables(&PLAIN);
        let row = |name: &str| out.lines().find(|line| line.starts_with(name)).unwrap_or_default();
        assert!(row("a-pass ").contains("| PASSED"));
        assert!(row("b-fail ").contains("| FAILED"));
        let reason = "| ERROR  | process failed (T2B): Translator exited with 1";
        assert!(row("c-error ").contains(reason));
    }

    #[test]
    fn test_direction_total_sums_direction_rows() {
        let report = sample_report();
        let out = report.render_tables(&PLAIN);
        let section = &out[out.find("| By Direction |").unwrap()..];
        let total = section.lines().find(|line| line.starts_with("Total")).unwrap();
        // Two completed fixtures in each direction plus one forward error.
        assert_eq!(total, "Total     | 3      | 1      | 1     | 5");
    }

    #[test]
    fn test_details_hide_passing_by_default() {
        let report = sample_report();
        let view = ViewOptions { details: true, ..PLAIN };
        let out = report.render_tables(&view);
        let details = &out[out.find("| Details |").unwrap()..];
        assert!(!details.contains("a-pass"));
        assert!(details.contains("b-fail"));

        let view = ViewOptions { details: true, show_passing: true, ..PLAIN };
        let out = report.render_tables(&view);
        assert!(out[out.find("| Details |").unwrap()..].contains("a-pass"));
    }

    #[test]
    fn test_errors_shown_without_diagnostics_flag() {
        let report = sample_report();
        let out = report.render_tables(&PLAIN);
        let errors = &out[out.find("| Errors |").unwrap()..];
        assert!(errors.contains("c-error [ERROR]"));
        assert!(errors.contains("Failure: process failed (T2B): Translator exited with 1"));
        assert!(errors.contains("    translator crashed"));
        assert!(!errors.contains("b-fail"));
        // Nothing else captured any output.
        let view = ViewOptions { diagnostics: true, ..PLAIN };
        assert!(!report.render_tables(&view).contains("| Diagnostics |"));
    }

    #[test]
    fn test_narrative() {
        let report = sample_report();
        let view = ViewOptions { details: true, ..PLAIN };
        let out = report.render(OutputFormat::Report, &view).unwrap();

        assert!(out.starts_with("Report for tests run on "));
        assert!(out.contains("3 fixtures run, 1 passed, 1 failed, 1 ended with an error."));
        assert!(out.contains(" a-pass: PASSED"));
        assert!(out.contains(" b-fail: FAILED"));
        assert!(!out.contains("Name       : a-pass"));
        assert!(out.contains("Name       : b-fail"));
        assert!(out.contains("Tags       : text, long"));
        assert!(out.contains("B2T expected : "));
        assert!(out.contains("Failure    : process failed (T2B)"));
    }

    #[test]
    fn test_narrative_lists_errors_by_default() {
        let report = sample_report();
        let out = report.render(OutputFormat::Report, &PLAIN).unwrap();
        let errors = &out[out.find("Errors:").unwrap()..];
        assert!(errors.contains("c-error [ERROR]"));
        assert!(errors.contains("translator crashed"));
        assert!(!out.contains("Fixture details"));
    }

    #[test]
    fn test_inventory() {
        let tree = tree(&[("a", "1", &["text"]), ("b", "2", &["text", "numbers"])]);
        let found = harness(&tree).discover().unwrap();

        let brief = render_inventory(&found.set, 0, false);
        assert_eq!(brief, "Type | Count\nT2B  | 2\nB2T  | 2\n");

        let full = render_inventory(&found.set, 2, false);
        let row = |key: &str| full.lines().find(|line| line.starts_with(key)).map(str::to_string);
        assert!(row("Level 2 ").is_some_and(|line| line.ends_with("| 1")));
        assert!(row("Tag 'text' ").is_some_and(|line| line.ends_with("| 2")));
        assert!(row("Total ").is_some_and(|line| line.ends_with("| 2")));
        assert!(full.contains("Name | Level | Tags"));
    }
}
