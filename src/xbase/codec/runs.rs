//! Column-subset decode plans.
//!
//! A plan is a sequence of runs over one record's data bytes. In its encoded
//! form each entry is either a non-negative column index to decode or a
//! negative byte count to skip:
//!
//! ```text
//! widths:   [7, 10, 1, 8, 7, 10, 1, 8]
//! selected: {2, 3, 4, 5}
//! runs:     [-17, 2, 3, 4, 5, -9]
//! ```
//!
//! Adjacent skips are merged so a reader performs one cursor move per gap.

use crate::xbase::types::error::{Result, XbaseError};
use crate::xbase::types::models::DbfColumn;

/// Builds the encoded run list for the selected columns, given every column's width.
///
/// Selected indices outside `widths` are ignored; unselected zero-width
/// columns contribute nothing.
pub fn build_runs(widths: &[usize], selected: &[usize]) -> Vec<i32> {
    let runs: Vec<i32> = widths
        .iter()
        .enumerate()
        .filter_map(|(index, &width)| {
            if selected.contains(&index) {
                Some(index as i32)
            } else if width > 0 {
                Some(-(width as i32))
            } else {
                None
            }
        })
        .collect();
    compact_runs(&runs)
}

/// Merges adjacent negative (skip) entries; decode entries pass through unchanged.
pub fn compact_runs(runs: &[i32]) -> Vec<i32> {
    let mut compacted: Vec<i32> = Vec::with_capacity(runs.len());
    for &run in runs {
        match compacted.last_mut() {
            Some(last) if run < 0 && *last < 0 => *last += run,
            _ => compacted.push(run),
        }
    }
    compacted
}

/// One step of a decode plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run {
    /// Decode the column with this index.
    Decode(usize),
    /// Move the cursor forward this many bytes.
    Skip(usize),
}

/// A validated decode plan for a table's column subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRuns {
    runs: Vec<Run>,
    selected: usize,
}

impl ColumnRuns {
    /// Plans a read of `selected` out of `columns`.
    ///
    /// Indices may be given in any order and may repeat; columns are always
    /// decoded in table order.
    ///
    /// # Errors
    /// [`XbaseError::ColumnIndexOutOfRange`] for an index past the last column.
    pub fn new(columns: &[DbfColumn], selected: &[usize]) -> Result<Self> {
        if let Some(&index) = selected.iter().find(|&&index| index >= columns.len()) {
            return Err(XbaseError::ColumnIndexOutOfRange {
                index,
                count: columns.len(),
            });
        }
        let widths: Vec<usize> = columns.iter().map(DbfColumn::data_length).collect();
        let encoded = build_runs(&widths, selected);
        Ok(Self::from_encoded(&encoded))
    }

    /// Builds a plan from its encoded form.
    pub fn from_encoded(encoded: &[i32]) -> Self {
        let runs: Vec<Run> = encoded
            .iter()
            .map(|&run| {
                if run < 0 {
                    Run::Skip(run.unsigned_abs() as usize)
                } else {
                    Run::Decode(run as usize)
                }
            })
            .collect();
        let selected = runs.iter().filter(|run| matches!(run, Run::Decode(_))).count();
        Self { runs, selected }
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of columns the plan decodes.
    pub fn selected_count(&self) -> usize {
        self.selected
    }

    /// The plan in its encoded form.
    pub fn encoded(&self) -> Vec<i32> {
        self.runs
            .iter()
            .map(|run| match *run {
                Run::Decode(index) => index as i32,
                Run::Skip(bytes) => -(bytes as i32),
            })
            .collect()
    }
}
