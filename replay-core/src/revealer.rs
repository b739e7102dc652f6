//! Output revealer
//!
//! The backend replays the whole program on every call, so the transcript is
//! never appended to. Each call re-derives the visible prefix of the latest
//! full output:
//!
//! ```text
//! output:   "Enter a:\n1\nEnter b:\n"     (stdin = "1", one answered prompt)
//! lines:    ["Enter a:", "1", "Enter b:", ""]
//!             ^ answered     ^ first open prompt on a non-last line
//! reveal:   ["Enter a:", "1", "Enter b:"]  waiting = true
//! ```
//!
//! Prompt detection is a content heuristic. A program that prints the prompt
//! word outside an input context will be treated as waiting; the markers are
//! configurable for that reason.

use serde::{Deserialize, Serialize};

/// Substrings that classify output lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    /// A line containing any of these is an input prompt
    pub prompt: Vec<String>,
    /// A line containing any of these ends the session as failed
    pub error: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            prompt: vec!["Enter".to_string()],
            error: vec!["error:".to_string()],
        }
    }
}

impl MarkerSet {
    pub fn is_prompt(&self, line: &str) -> bool {
        self.prompt.iter().any(|m| !m.is_empty() && line.contains(m.as_str()))
    }

    pub fn is_error(&self, line: &str) -> bool {
        self.error.iter().any(|m| !m.is_empty() && line.contains(m.as_str()))
    }
}

/// Result of revealing one output blob. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RevealDecision {
    /// The transcript to show, replacing whatever was shown before
    pub lines: Vec<String>,
    /// The program is blocked on an unanswered prompt
    pub now_waiting: bool,
    /// An error marker was found
    pub failed: bool,
}

/// Where the scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    End,
    Error,
    Prompt(usize),
}

#[derive(Debug, Clone, Default)]
pub struct Revealer {
    markers: MarkerSet,
}

impl Revealer {
    pub fn new(markers: MarkerSet) -> Self {
        Self { markers }
    }

    /// Reveal `output` for a session that already answered `answered` prompts.
    ///
    /// The first `answered` prompts are consumed by the replayed stdin and do
    /// not stop the scan. A prompt on the last line of the blob never counts:
    /// without a newline after it the program has not asked for anything yet.
    pub fn reveal(&self, output: &str, answered: usize) -> RevealDecision {
        let lines: Vec<&str> = output
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        let last = lines.len() - 1;

        let boundary = self.scan(&lines, last, answered);
        let (shown, now_waiting, failed) = match boundary {
            Boundary::End => (lines.len(), false, false),
            Boundary::Error => (lines.len(), false, true),
            Boundary::Prompt(index) => (index + 1, true, false),
        };

        RevealDecision {
            lines: lines[..shown]
                .iter()
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.to_string())
                .collect(),
            now_waiting,
            failed,
        }
    }

    fn scan(&self, lines: &[&str], last: usize, answered: usize) -> Boundary {
        let mut skipped = 0;
        for (index, line) in lines.iter().enumerate() {
            if self.markers.is_error(line) {
                return Boundary::Error;
            }
            if index < last && self.markers.is_prompt(line) {
                if skipped < answered {
                    skipped += 1;
                    continue;
                }
                return Boundary::Prompt(index);
            }
        }
        Boundary::End
    }
}
