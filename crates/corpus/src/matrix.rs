use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric corpus matrix: one row per file, columns in feature order.
///
/// Column order is the schema; row order carries no meaning. Rows are
/// width-checked on the way in and again after deserialization, so a
/// loaded matrix is always rectangular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl CorpusMatrix {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// The default schema: the feature extractor's column list.
    pub fn with_feature_columns() -> Self {
        Self::new(
            midi_features::FIELD_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, enforcing the width invariant.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::SchemaMismatch {
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Write the matrix as a JSON artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a matrix artifact back, revalidating every row's width.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let matrix: Self = serde_json::from_slice(&bytes)?;
        for row in &matrix.rows {
            if row.len() != matrix.columns.len() {
                return Err(Error::SchemaMismatch {
                    got: row.len(),
                    expected: matrix.columns.len(),
                });
            }
        }
        Ok(matrix)
    }
}
