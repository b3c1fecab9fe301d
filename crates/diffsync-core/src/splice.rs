//! Plain-text splice synchronizer
//!
//! A minimal [`Synchronizer`] for `String` content, used by tests and
//! simulations. The diff is a single splice: the common prefix and suffix
//! of the two texts are kept and the middle is replaced. Offsets count
//! `char`s, not bytes.

use serde::{Deserialize, Serialize};

use crate::checksum;
use crate::error::PatchError;
use crate::traits::Synchronizer;

/// Replace `delete` chars at `start` with `insert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splice {
    pub start: usize,
    pub delete: usize,
    pub insert: String,
}

impl Splice {
    /// Whether applying the splice leaves content unchanged
    pub fn is_noop(&self) -> bool {
        self.delete == 0 && self.insert.is_empty()
    }
}

/// [`Synchronizer`] for `String` content using [`Splice`] diffs
#[derive(Debug, Clone, Copy, Default)]
pub struct SpliceSynchronizer;

impl Synchronizer<String> for SpliceSynchronizer {
    type Diff = Splice;

    fn diff(&self, old: &String, new: &String) -> Splice {
        let old: Vec<char> = old.chars().collect();
        let new: Vec<char> = new.chars().collect();

        let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        Splice {
            start: prefix,
            delete: old.len() - prefix - suffix,
            insert: new[prefix..new.len() - suffix].iter().collect(),
        }
    }

    fn patch(&self, content: &String, diff: &Splice) -> Result<String, PatchError> {
        let chars: Vec<char> = content.chars().collect();
        let end = diff
            .start
            .checked_add(diff.delete)
            .filter(|end| *end <= chars.len())
            .ok_or_else(|| {
                PatchError::conflict(format!(
                    "splice {}+{} out of bounds for length {}",
                    diff.start,
                    diff.delete,
                    chars.len()
                ))
            })?;

        let mut patched = String::with_capacity(content.len() + diff.insert.len());
        patched.extend(&chars[..diff.start]);
        patched.push_str(&diff.insert);
        patched.extend(&chars[end..]);
        Ok(patched)
    }

    fn checksum(&self, content: &String) -> String {
        checksum(content.as_bytes())
    }
}
