// Word Diff
// Feature: Proposal Review (032-proposal-review)
//
// Word-level comparison of a proposed document against its frozen baseline.
// Produces typed segments for a caller to render; rendering itself is not
// this crate's concern.

use serde::{Deserialize, Serialize};

/// Classification of one diff segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Unchanged,
    Added,
    Removed,
}

/// A run of text that is unchanged, added, or removed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffSegment {
    pub kind: DiffKind,
    pub text: String,
}

/// Compare two texts word by word.
///
/// Tokens are alternating runs of whitespace and non-whitespace, so the
/// original spacing survives in the output. Adjacent segments of the same
/// kind are merged.
pub fn diff_words(baseline: &str, proposed: &str) -> Vec<DiffSegment> {
    let old: Vec<&str> = tokenize(baseline);
    let new: Vec<&str> = tokenize(proposed);

    // LCS length table
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    // Walk the table emitting segments
    let mut segments: Vec<DiffSegment> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            push(&mut segments, DiffKind::Unchanged, old[i]);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            push(&mut segments, DiffKind::Removed, old[i]);
            i += 1;
        } else {
            push(&mut segments, DiffKind::Added, new[j]);
            j += 1;
        }
    }
    while i < old.len() {
        push(&mut segments, DiffKind::Removed, old[i]);
        i += 1;
    }
    while j < new.len() {
        push(&mut segments, DiffKind::Added, new[j]);
        j += 1;
    }
    segments
}

fn push(segments: &mut Vec<DiffSegment>, kind: DiffKind, text: &str) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(text),
        _ => segments.push(DiffSegment {
            kind,
            text: text.to_string(),
        }),
    }
}

/// Split into alternating whitespace / non-whitespace runs
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev_is_ws: Option<bool> = None;
    for (i, c) in s.char_indices() {
        let is_ws = c.is_whitespace();
        if let Some(prev) = prev_is_ws {
            if prev != is_ws {
                tokens.push(&s[start..i]);
                start = i;
            }
        }
        prev_is_ws = Some(is_ws);
    }
    if start < s.len() {
        tokens.push(&s[start..]);
    }
    tokens
}
