//! Default branch detection
//!
//! Mirrors only ever track `main` or `master`. The checked-out branch of a
//! clone is read from `git branch` output and must be exactly one of the
//! two; anything else is reported so the caller can fail the repository.

use std::fmt;

/// The two default branch names a mirror can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultBranch {
    Main,
    Master,
}

impl DefaultBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultBranch::Main => "main",
            DefaultBranch::Master => "master",
        }
    }

    /// Remote-tracking ref the working tree is reset to
    pub fn remote_ref(&self) -> String {
        format!("origin/{}", self.as_str())
    }
}

impl fmt::Display for DefaultBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of inspecting a branch listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDetection {
    Detected(DefaultBranch),
    /// Both `main` and `master` are marked as checked out
    Ambiguous,
    /// Neither `main` nor `master` is checked out
    NotFound,
}

impl BranchDetection {
    pub fn branch(&self) -> Option<DefaultBranch> {
        match self {
            BranchDetection::Detected(branch) => Some(*branch),
            _ => None,
        }
    }

    /// Human readable reason for an undetermined result
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            BranchDetection::Detected(_) => None,
            BranchDetection::Ambiguous => {
                Some("both 'main' and 'master' are marked as the current branch")
            }
            BranchDetection::NotFound => {
                Some("current branch is neither 'main' nor 'master'")
            }
        }
    }
}

/// Inspect `git branch` output for a checked-out `main` or `master`
pub fn detect_default_branch(listing: &str) -> BranchDetection {
    let mut has_main = false;
    let mut has_master = false;

    for line in listing.lines() {
        match line.trim() {
            "* main" => has_main = true,
            "* master" => has_master = true,
            _ => {}
        }
    }

    match (has_main, has_master) {
        (true, true) => BranchDetection::Ambiguous,
        (true, false) => BranchDetection::Detected(DefaultBranch::Main),
        (false, true) => BranchDetection::Detected(DefaultBranch::Master),
        (false, false) => BranchDetection::NotFound,
    }
}
