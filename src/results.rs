use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

use crate::config::Config;
use crate::datavalue::DataValue;
use crate::error::QueryError;
use crate::file::{from_json_file, open_file_writer};

/// Rows with named columns, as returned by a [`crate::GraphStore`] or merged from several partitions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<DataValue>>,
}

impl ResultTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, its width must match the number of columns
    pub fn push_row(&mut self, row: Vec<DataValue>) -> Result<(), QueryError> {
        if row.len() != self.columns.len() {
            return Err(QueryError::SerializationError(format!(
                "Row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: Vec<DataValue>) -> Result<Self, QueryError> {
        self.push_row(row)?;
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> std::slice::Iter<Vec<DataValue>> {
        self.rows.iter()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns a cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&DataValue> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|row| row.get(index))
    }

    /// Returns all cells of a single column
    pub fn column(&self, name: &str) -> Option<Vec<&DataValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }

    /// Appends all rows of `other`, rearranged to this table's column order by name.
    /// Cells for columns `other` lacks are `Null`, columns this table lacks are dropped.
    pub fn append(&mut self, other: ResultTable) {
        if other.columns == self.columns {
            self.rows.extend(other.rows);
            return;
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| other.column_index(name))
            .collect();
        if other.columns.iter().any(|c| !self.columns.contains(c)) {
            debug!(
                header = ?self.columns,
                columns = ?other.columns,
                "dropping columns not in the merged header"
            );
        }
        for mut row in other.rows {
            self.rows.push(
                mapping
                    .iter()
                    .map(|index| match index {
                        Some(index) => std::mem::take(&mut row[*index]),
                        None => DataValue::Null,
                    })
                    .collect(),
            );
        }
    }

    /// Writes the table as CSV, `Null` becomes an empty cell and lists are joined with `|`
    #[cfg(feature = "csv")]
    pub fn to_csv_writer<W>(&self, writer: W) -> Result<(), QueryError>
    where
        W: Write,
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(&self.columns)
            .map_err(|e| QueryError::CsvError(e, "Writing header"))?;
        for row in self.rows.iter() {
            writer
                .write_record(row.iter().map(|cell| cell.to_string()))
                .map_err(|e| QueryError::CsvError(e, "Writing row"))?;
        }
        writer.flush().map_err(|e| {
            QueryError::IOError(e, "(csv writer)".to_string(), "Flushing CSV output")
        })?;
        Ok(())
    }

    /// Writes the table as CSV to a file (`-` is stdout)
    #[cfg(feature = "csv")]
    pub fn to_csv_file(&self, filename: &str, config: &Config) -> Result<(), QueryError> {
        debug!(filename, rows = self.len(), "writing result table as CSV");
        let writer = open_file_writer(filename, config)?;
        self.to_csv_writer(writer)
    }

    pub fn to_json_writer<W>(&self, writer: W, compact: bool) -> Result<(), QueryError>
    where
        W: Write,
    {
        let result = if compact {
            serde_json::to_writer(writer, &self)
        } else {
            serde_json::to_writer_pretty(writer, &self)
        };
        result.map_err(|e| {
            QueryError::SerializationError(format!("Writing result table to JSON: {}", e))
        })
    }

    pub fn to_json_string(&self) -> Result<String, QueryError> {
        serde_json::to_string_pretty(&self).map_err(|e| {
            QueryError::SerializationError(format!("Writing result table to JSON: {}", e))
        })
    }

    /// Writes the table as JSON to a file (`-` is stdout)
    pub fn to_json_file(&self, filename: &str, config: &Config) -> Result<(), QueryError> {
        debug!(filename, rows = self.len(), "writing result table as JSON");
        let writer = open_file_writer(filename, config)?;
        self.to_json_writer(writer, false)
    }

    pub fn from_json_file(filename: &str, config: &Config) -> Result<Self, QueryError> {
        let table: Self = from_json_file(filename, config, "Reading result table from file")?;
        for row in table.rows.iter() {
            if row.len() != table.columns.len() {
                return Err(QueryError::SerializationError(format!(
                    "Row in {} has {} cells, table has {} columns",
                    filename,
                    row.len(),
                    table.columns.len()
                )));
            }
        }
        Ok(table)
    }
}
