//! Terminal rendering of console snapshots
//!
//! The console replaces its transcript on every round trip. The terminal
//! cannot un-print, so only the lines past what is already on screen are
//! written.

use colored::*;
use replay_core::{ConsoleSnapshot, Phase, Termination};

/// Lines to print for a new transcript.
#[derive(Debug, PartialEq, Eq)]
pub enum Delta<'a> {
    /// The new transcript extends what is on screen
    Append(&'a [String]),
    /// A replay produced different earlier output; everything is reprinted
    Diverged(&'a [String]),
}

pub fn delta<'a>(printed: &[String], transcript: &'a [String]) -> Delta<'a> {
    if transcript.starts_with(printed) {
        Delta::Append(&transcript[printed.len()..])
    } else {
        Delta::Diverged(transcript)
    }
}

#[derive(Debug, Default)]
pub struct Renderer {
    printed: Vec<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snapshot: &ConsoleSnapshot) {
        match snapshot.phase {
            Phase::Terminal(Termination::CompileError) => {
                for line in &snapshot.transcript {
                    println!("{}", line.red());
                }
            }
            Phase::Terminal(Termination::TransportError) => {
                if let Some(line) = snapshot.transcript.last() {
                    println!("{}", line.red().bold());
                }
            }
            _ => {
                match delta(&self.printed, &snapshot.transcript) {
                    Delta::Append(lines) => {
                        for line in lines {
                            println!("{}", line);
                        }
                    }
                    Delta::Diverged(lines) => {
                        println!("{}", "── output changed on replay ──".dimmed());
                        for line in lines {
                            println!("{}", line);
                        }
                    }
                }
                self.printed = snapshot.transcript.clone();
            }
        }
    }
}
