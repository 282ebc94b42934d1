//! Output of one successful generation.

use serde::{Deserialize, Serialize};

/// Generated test-case text for the specification at `index`.
///
/// `index` is the 0-based position of the specification in the input
/// sequence; a finished suite has `results[i].index == i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub index: usize,
    pub text: String,
}

impl GenerationResult {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// 1-based label used when the suite is written out.
    #[must_use]
    pub fn label(&self) -> usize {
        self.index + 1
    }
}
