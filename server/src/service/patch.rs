//! Exact-match text patching
//!
//! Literal (non-regex) find/replace over in-memory content. Occurrences are
//! counted non-overlapping, left to right, the same way `str::matches` does.
//! Nothing here touches the filesystem; callers get a fresh `String` back and
//! the input is never modified, so a rejected edit leaves nothing to undo.

use thiserror::Error;

use crate::domain::types::EditOperation;
use crate::error::Error;

/// Why a single replacement was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("old_string must not be empty")]
    EmptyPattern,

    #[error("old_string not found")]
    NoMatch,

    #[error("old_string found {0} times")]
    AmbiguousMatch(usize),
}

/// A rejected step of an edit sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edit #{index}: {source}")]
pub struct SequenceError {
    /// 0-based position of the failing edit
    pub index: usize,
    pub source: PatchError,
}

/// Patched content plus how many replacements were made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub content: String,
    pub replacements: usize,
}

/// Apply one replacement.
///
/// With `replace_all == false` the pattern has to occur exactly once; more
/// than one occurrence is rejected rather than patching the first.
pub fn apply_one(content: &str, edit: &EditOperation) -> Result<Patched, PatchError> {
    if edit.old_string.is_empty() {
        return Err(PatchError::EmptyPattern);
    }

    let occurrences = content.matches(edit.old_string.as_str()).count();
    match occurrences {
        0 => Err(PatchError::NoMatch),
        n if n > 1 && !edit.replace_all => Err(PatchError::AmbiguousMatch(n)),
        n => {
            let content = if edit.replace_all {
                content.replace(&edit.old_string, &edit.new_string)
            } else {
                content.replacen(&edit.old_string, &edit.new_string, 1)
            };
            Ok(Patched {
                content,
                replacements: n,
            })
        }
    }
}

/// Apply edits in order, each against the previous step's output.
///
/// All or nothing: the first failing step aborts the whole sequence.
pub fn apply_sequence(content: &str, edits: &[EditOperation]) -> Result<Patched, SequenceError> {
    let mut current = Patched {
        content: content.to_string(),
        replacements: 0,
    };

    for (index, edit) in edits.iter().enumerate() {
        let step = apply_one(&current.content, edit).map_err(|source| SequenceError { index, source })?;
        current = Patched {
            content: step.content,
            replacements: current.replacements + step.replacements,
        };
    }

    Ok(current)
}

impl PatchError {
    /// Lift into the server error, naming what was being edited
    pub fn into_error(self, target: &str) -> Error {
        match self {
            PatchError::EmptyPattern => {
                Error::InvalidArgument(format!("old_string must not be empty ({})", target))
            }
            PatchError::NoMatch => Error::NoMatch(format!("old_string not found in {}", target)),
            PatchError::AmbiguousMatch(count) => Error::AmbiguousMatch {
                count,
                detail: format!("old_string is not unique in {}", target),
            },
        }
    }
}

impl SequenceError {
    pub fn into_error(self, target: &str) -> Error {
        self.source
            .into_error(&format!("{} (edit #{})", target, self.index))
    }
}
