//! Deterministic line-based three-way merge.
//!
//! Reconciles two divergent edits of a text field using their common
//! ancestor to decide which side's change to keep per line. This is
//! deliberately the simplest correct strategy: strict index-by-index
//! comparison with no diff alignment and no move detection. Inputs are
//! short content fields, not source files, so an inserted line shows up as
//! a run of conflicts rather than a shifted diff; that is a known
//! limitation, not a bug.

use serde::{Deserialize, Serialize};

use crate::constants::{MERGE_MARKER_LOCAL, MERGE_MARKER_REMOTE, MERGE_MARKER_SEPARATOR};

/// One line where both sides changed divergently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeHunk {
    /// Zero-based line index into the longest input.
    pub line: usize,
    pub local: String,
    pub remote: String,
}

/// Outcome of a three-way merge attempt.
///
/// Ephemeral: produced and consumed within one resolution attempt, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// The merged text, with conflict markers inlined for every hunk.
    pub merged_text: String,
    pub has_conflicts: bool,
    pub hunks: Vec<MergeHunk>,
}

impl MergeResult {
    /// A clean result carrying `text` unchanged.
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            merged_text: text.into(),
            has_conflicts: false,
            hunks: Vec::new(),
        }
    }
}

/// Merges `local` and `remote` against their common ancestor `base`.
///
/// Per line index up to the longest input, with absent lines treated as
/// absent (not empty): identical sides are emitted once; a line changed on
/// only one side takes that side; divergent changes emit
/// `<<<<<<< LOCAL` / `=======` / `>>>>>>> REMOTE` markers into the merged
/// text and are recorded as hunks. A line deleted by the only side that
/// touched it is dropped from the output.
pub fn merge(base: &str, local: &str, remote: &str) -> MergeResult {
    let base_lines: Vec<&str> = base.split('\n').collect();
    let local_lines: Vec<&str> = local.split('\n').collect();
    let remote_lines: Vec<&str> = remote.split('\n').collect();
    let line_count = base_lines
        .len()
        .max(local_lines.len())
        .max(remote_lines.len());

    let mut merged: Vec<&str> = Vec::with_capacity(line_count);
    let mut hunks = Vec::new();

    for i in 0..line_count {
        let b = base_lines.get(i).copied();
        let l = local_lines.get(i).copied();
        let r = remote_lines.get(i).copied();

        if l == r {
            // Converged (or both absent): nothing to reconcile.
            if let Some(line) = l {
                merged.push(line);
            }
        } else if l == b {
            // Only remote changed this line.
            if let Some(line) = r {
                merged.push(line);
            }
        } else if r == b {
            // Only local changed this line.
            if let Some(line) = l {
                merged.push(line);
            }
        } else {
            let local_line = l.unwrap_or("");
            let remote_line = r.unwrap_or("");
            merged.push(MERGE_MARKER_LOCAL);
            merged.push(local_line);
            merged.push(MERGE_MARKER_SEPARATOR);
            merged.push(remote_line);
            merged.push(MERGE_MARKER_REMOTE);
            hunks.push(MergeHunk {
                line: i,
                local: local_line.to_string(),
                remote: remote_line.to_string(),
            });
        }
    }

    MergeResult {
        merged_text: merged.join("\n"),
        has_conflicts: !hunks.is_empty(),
        hunks,
    }
}
