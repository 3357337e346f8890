//! Numeric CSV data for lookup tables.
//!
//! Every non-empty, non-comment line after the skipped header lines must be
//! a list of numbers split by the separator character.

use crate::error::{UtilError, UtilResult};
use std::path::Path;
use tlm_core::Real;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    pub separator: char,
    /// Lines dropped from the top before parsing starts.
    pub skip_lines: usize,
    /// Lines starting with this character are ignored.
    pub comment: Option<char>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            skip_lines: 0,
            comment: None,
        }
    }
}

/// Parsed rows of numbers. Rows may differ in length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvData {
    rows: Vec<Vec<Real>>,
}

impl CsvData {
    pub fn parse(text: &str, options: &CsvOptions) -> UtilResult<Self> {
        let mut rows = Vec::new();
        for (n, line) in text.lines().enumerate().skip(options.skip_lines) {
            let line = line.trim();
            if line.is_empty() || options.comment.is_some_and(|c| line.starts_with(c)) {
                continue;
            }
            let row = line
                .split(options.separator)
                .map(|field| {
                    let field = field.trim();
                    field.parse::<Real>().map_err(|_| UtilError::Parse {
                        line: n + 1,
                        field: field.to_string(),
                    })
                })
                .collect::<UtilResult<Vec<Real>>>()?;
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(UtilError::InvalidArg {
                what: "CSV data has no data rows",
            });
        }
        Ok(Self { rows })
    }

    pub fn read(path: &Path, options: &CsvOptions) -> UtilResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| UtilError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, options)
    }

    pub fn rows(&self) -> &[Vec<Real>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn max_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Column `col` of every row; fails on the first row that is too short.
    pub fn column(&self, col: usize) -> UtilResult<Vec<Real>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, values)| {
                values
                    .get(col)
                    .copied()
                    .ok_or(UtilError::MissingColumn { column: col, row })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_header_comments_and_separator() {
        let text = "x;y\n# measured\n0;1.5\n\n 1 ; 2.5 \n";
        let options = CsvOptions {
            separator: ';',
            skip_lines: 1,
            comment: Some('#'),
        };
        let data = CsvData::parse(text, &options).unwrap();
        assert_eq!(data.num_rows(), 2);
        assert_eq!(data.max_cols(), 2);
        assert_eq!(data.column(1).unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn bad_field_reports_its_line() {
        let err = CsvData::parse("0,1\n1,abc\n", &CsvOptions::default()).unwrap_err();
        assert_eq!(
            err,
            UtilError::Parse {
                line: 2,
                field: "abc".into()
            }
        );
        assert!(CsvData::parse("# only a comment", &CsvOptions {
            comment: Some('#'),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn short_row_is_a_missing_column() {
        let data = CsvData::parse("0,1\n2\n", &CsvOptions::default()).unwrap();
        assert_eq!(
            data.column(1),
            Err(UtilError::MissingColumn { column: 1, row: 1 })
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("tlm_utilities_no_such_table.csv");
        let err = CsvData::read(&path, &CsvOptions::default()).unwrap_err();
        assert!(matches!(err, UtilError::Io { .. }));
        assert!(err.to_string().contains("no_such_table"));
    }
}
