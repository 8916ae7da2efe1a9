use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use std::fmt::Write;
use std::time::Duration;

use crate::size::format_gigabytes;
use crate::sync::RepoOutcome;

/// Exit code when `--strict` is set and at least one repository failed
pub const EXIT_REPO_FAILURES: i32 = 2;

/// Exit code after Ctrl-C stopped the batch
pub const EXIT_INTERRUPTED: i32 = 130;

/// A repository that could not be mirrored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRepo {
    pub name: String,
    pub reason: String,
}

/// Results from a complete mirror run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Repositories processed (interrupted runs stop short of the full list)
    pub total: usize,
    pub cloned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub cloned_repos: Vec<String>,
    pub updated_repos: Vec<String>,
    pub unchanged_repos: Vec<String>,
    pub failed_repos: Vec<FailedRepo>,
    /// Repositories skipped because the run was interrupted
    pub remaining: usize,
    pub interrupted: bool,
    /// On-disk size of the mirror root after the run
    pub size_bytes: u64,
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl BatchSummary {
    /// Fold one repository outcome into the summary
    pub fn record(&mut self, name: &str, outcome: &RepoOutcome) {
        self.total += 1;
        match outcome {
            RepoOutcome::Cloned { .. } => {
                self.cloned += 1;
                self.cloned_repos.push(name.to_string());
            }
            RepoOutcome::Updated => {
                self.updated += 1;
                self.updated_repos.push(name.to_string());
            }
            RepoOutcome::Unchanged => {
                self.unchanged += 1;
                self.unchanged_repos.push(name.to_string());
            }
            RepoOutcome::Failed { reason } => {
                self.failed += 1;
                self.failed_repos.push(FailedRepo {
                    name: name.to_string(),
                    reason: reason.clone(),
                });
            }
        }
    }

    pub fn mark_interrupted(&mut self, remaining: usize) {
        self.interrupted = true;
        self.remaining = remaining;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit code for this run.
    ///
    /// Repository failures only change the exit code when `strict` is set.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if strict && self.has_failures() {
            EXIT_REPO_FAILURES
        } else {
            0
        }
    }

    /// Human readable report printed at the end of a run
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(out, "====== SUMMARY ======");
        let _ = writeln!(out, "Total repositories:     {}", self.total);
        let _ = writeln!(out, "Cloned repositories:    {}", self.cloned);
        let _ = writeln!(out, "Updated repositories:   {}", self.updated);
        let _ = writeln!(out, "Unchanged repositories: {}", self.unchanged);
        let _ = writeln!(out, "Failed repositories:    {}", self.failed);

        if !self.cloned_repos.is_empty() {
            let _ = writeln!(out, "\n====== Cloned repositories ======");
            for name in &self.cloned_repos {
                let _ = writeln!(out, "- {}", name);
            }
        }

        if !self.updated_repos.is_empty() {
            let _ = writeln!(out, "\n====== Updated repositories ======");
            for name in &self.updated_repos {
                let _ = writeln!(out, "- {}", name);
            }
        }

        if !self.failed_repos.is_empty() {
            let _ = writeln!(out, "\n====== Repositories with ERRORS ======");
            for failed in &self.failed_repos {
                let _ = writeln!(out, "- {}: {}", failed.name, failed.reason);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Mirror size: {}", format_gigabytes(self.size_bytes));
        let _ = writeln!(out, "Duration: {:.2}s", self.duration.as_secs_f64());

        if self.interrupted {
            let _ = writeln!(
                out,
                "Interrupted: {} repositories were not processed",
                self.remaining
            );
        }

        if self.has_failures() {
            let _ = writeln!(
                out,
                "====== WARNING: finished with {} failed repositories ======",
                self.failed
            );
        } else if self.interrupted {
            let _ = writeln!(out, "====== WARNING: run interrupted ======");
        } else {
            let _ = writeln!(out, "====== OK: finished without errors ======");
        }

        out
    }

    /// JSON rendering for scripts
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize summary")
    }
}
