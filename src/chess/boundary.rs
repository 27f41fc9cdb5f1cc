/// Lines between one game's last tag and the next game's first tag:
/// blank, movetext (or result-only), blank.
pub const SEPARATOR_LINES: u32 = 2;

/// Tracks consecutive non-tag lines to find where one game ends.
///
/// The detector is consulted before each line is applied: once more than
/// [`SEPARATOR_LINES`] non-tag lines have gone by, the record accumulated so
/// far is complete and the incoming line belongs to a fresh record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryDetector {
    non_tag_lines: u32,
    armed: bool,
}

impl BoundaryDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the current record is complete. Resets the counter
    /// when it fires.
    pub fn check(&mut self) -> bool {
        if self.armed {
            self.non_tag_lines = 0;
            self.armed = false;
            true
        } else {
            false
        }
    }

    /// Record the classification of the line just applied.
    pub fn observe(&mut self, is_tag: bool) {
        if is_tag {
            self.non_tag_lines = 0;
        } else {
            self.non_tag_lines = self.non_tag_lines.saturating_add(1);
        }
        self.armed = self.non_tag_lines > SEPARATOR_LINES;
    }

    pub fn non_tag_lines(&self) -> u32 {
        self.non_tag_lines
    }
}
