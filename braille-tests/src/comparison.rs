//! Output comparison and two-sided alignment of expected vs received text
//!
//! [`align`] splits both texts into index-paired spans: a [`SpanKind::Common`]
//! span holds the same text on both sides, a [`SpanKind::Differing`] span holds
//! whatever each side has between two common spans (possibly nothing on one
//! side). Highlighting and padding are left to the reporting layer.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;
use std::ops::Range;

/// Classification of a span in an [`Alignment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Common,
    Differing,
}

/// A contiguous run of characters on one side of an alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub kind: SpanKind,
    pub text: String,
}

impl Span {
    /// Width in characters
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_common(&self) -> bool {
        self.kind == SpanKind::Common
    }
}

/// Paired spans for the expected and the received text.
///
/// `expected[i]` and `actual[i]` always have the same kind; both lists have
/// the same length.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub expected: Vec<Span>,
    pub actual: Vec<Span>,
}

impl Alignment {
    /// Number of span pairs
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    /// True when no differing span exists
    pub fn is_identical(&self) -> bool {
        self.expected.iter().all(Span::is_common)
    }

    /// Width both sides of pair `index` need to line up
    pub fn column_width(&self, index: usize) -> usize {
        let left = self.expected.get(index).map_or(0, Span::width);
        let right = self.actual.get(index).map_or(0, Span::width);
        left.max(right)
    }

    /// Total characters marked differing on (expected, actual)
    pub fn differing_width(&self) -> (usize, usize) {
        let sum = |spans: &[Span]| -> usize {
            spans.iter().filter(|s| !s.is_common()).map(Span::width).sum()
        };
        (sum(&self.expected), sum(&self.actual))
    }

    fn push(&mut self, kind: SpanKind, expected: String, actual: String) {
        self.expected.push(Span { kind, text: expected });
        self.actual.push(Span { kind, text: actual });
    }
}

/// Normalize line endings and render each newline as the two characters `\n`
pub fn escape_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\\n")
}

/// Received output counts as correct when it equals the expected output after
/// trimming whitespace at both ends of the whole text
pub fn outputs_match(expected: &str, received: &str) -> bool {
    expected.trim() == received.trim()
}

enum Task {
    Align(Range<usize>, Range<usize>),
    Common(Range<usize>),
}

/// Align `expected` against `actual` by repeatedly taking the longest common
/// substring and aligning what lies left and right of it.
pub fn align(expected: &str, actual: &str) -> Alignment {
    let a: Vec<char> = escape_newlines(expected).chars().collect();
    let b: Vec<char> = escape_newlines(actual).chars().collect();

    let mut alignment = Alignment::default();
    let mut stack = vec![Task::Align(0..a.len(), 0..b.len())];

    while let Some(task) = stack.pop() {
        match task {
            Task::Common(range) => {
                let text: String = a[range].iter().collect();
                alignment.push(SpanKind::Common, text.clone(), text);
            }
            Task::Align(ra, rb) => {
                if ra.is_empty() && rb.is_empty() {
                    continue;
                }
                match longest_match(&a[ra.clone()], &b[rb.clone()]) {
                    None => {
                        alignment.push(
                            SpanKind::Differing,
                            a[ra].iter().collect(),
                            b[rb].iter().collect(),
                        );
                    }
                    Some((i, j, k)) => {
                        // Pushed in reverse so the left side is emitted first.
                        stack.push(Task::Align(ra.start + i + k..ra.end, rb.start + j + k..rb.end));
                        stack.push(Task::Common(ra.start + i..ra.start + i + k));
                        stack.push(Task::Align(ra.start..ra.start + i, rb.start..rb.start + j));
                    }
                }
            }
        }
    }

    alignment
}

/// Longest common contiguous run as `(start_a, start_b, len)`.
///
/// Ties go to the earliest start in `a`, then the earliest start in `b`.
/// Runs in time linear in `a.len() + b.len()`.
fn longest_match(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let automaton = SuffixAutomaton::new(b);
    let mut best: Option<(usize, usize, usize)> = None;
    let (mut state, mut len) = (0, 0);

    for (i, &c) in a.iter().enumerate() {
        loop {
            if let Some(next) = automaton.step(state, c) {
                state = next;
                len += 1;
                break;
            }
            match automaton.states[state].link {
                Some(link) => {
                    state = link;
                    len = automaton.states[state].len;
                }
                None => {
                    len = 0;
                    break;
                }
            }
        }
        // Strictly greater keeps the earliest end in `a`; the state's first
        // end position is the earliest occurrence in `b`.
        if len > best.map_or(0, |(_, _, k)| k) {
            best = Some((i + 1 - len, automaton.states[state].first_end + 1 - len, len));
        }
    }

    best
}

#[derive(Clone)]
struct State {
    len: usize,
    link: Option<usize>,
    /// End index in `b` of the first occurrence of this state's substrings
    first_end: usize,
    next: Vec<(char, usize)>,
}

/// Suffix automaton of one text, recognizing all of its substrings
struct SuffixAutomaton {
    states: Vec<State>,
}

impl SuffixAutomaton {
    fn new(text: &[char]) -> Self {
        let root = State { len: 0, link: None, first_end: 0, next: Vec::new() };
        let mut states = Vec::with_capacity(text.len() * 2 + 1);
        states.push(root);
        let mut automaton = Self { states };
        let mut last = 0;
        for (pos, &c) in text.iter().enumerate() {
            last = automaton.extend(last, pos, c);
        }
        automaton
    }

    fn step(&self, state: usize, c: char) -> Option<usize> {
        self.states[state].next.iter().find(|(ch, _)| *ch == c).map(|&(_, to)| to)
    }

    fn extend(&mut self, last: usize, pos: usize, c: char) -> usize {
        let cur = self.states.len();
        self.states.push(State {
            len: self.states[last].len + 1,
            link: None,
            first_end: pos,
            next: Vec::new(),
        });

        let mut p = Some(last);
        let mut hit = None;
        while let Some(s) = p {
            if let Some(q) = self.step(s, c) {
                hit = Some((s, q));
                break;
            }
            self.states[s].next.push((c, cur));
            p = self.states[s].link;
        }

        let link = match hit {
            None => 0,
            Some((p, q)) if self.states[p].len + 1 == self.states[q].len => q,
            Some((p, q)) => {
                let clone = self.states.len();
                let mut copy = self.states[q].clone();
                copy.len = self.states[p].len + 1;
                self.states.push(copy);

                let mut s = Some(p);
                while let Some(x) = s {
                    match self.states[x].next.iter_mut().find(|(ch, _)| *ch == c) {
                        Some(edge) if edge.1 == q => edge.1 = clone,
                        _ => break,
                    }
                    s = self.states[x].link;
                }
                self.states[q].link = Some(clone);
                clone
            }
        };
        self.states[cur].link = Some(link);
        cur
    }
}

/// Line-based unified diff of `expected` vs `actual`; empty when equal
pub fn unified_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::new();
    }

    let diff = TextDiff::from_lines(expected, actual);
    let mut output = String::from("--- expected\n+++ received\n");

    for group in diff.grouped_ops(3) {
        if let Some((first, last)) = group.first().zip(group.last()) {
            let old_start = first.old_range().start;
            let new_start = first.new_range().start;
            let _ = writeln!(
                output,
                "@@ -{},{} +{},{} @@",
                old_start + 1,
                last.old_range().end - old_start,
                new_start + 1,
                last.new_range().end - new_start,
            );
        }

        for op in group {
            for change in diff.iter_changes(&op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(prefix);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}
