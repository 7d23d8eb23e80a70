//! Error types for catalog washing.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Number of offending rows listed by name before the rest are summarised.
const MAX_LISTED_ISSUES: usize = 10;

/// Errors that can abort a washing run.
///
/// Finding no duplicates or no reference matches is the normal outcome of a
/// run and is never reported through this type.
#[derive(Error, Debug)]
pub enum WashError {
    /// One or more rows lack usable position fields; the whole catalog is rejected.
    #[error("{}: {} malformed record(s): {}", path.display(), issues.len(), RowIssues(issues))]
    MalformedRecords { path: PathBuf, issues: Vec<RowIssue> },

    /// The reference catalog is missing, unreadable or has the wrong schema.
    #[error("reference catalog {} is unreadable: {reason}", path.display())]
    ReferenceCatalogUnreadable { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("position out of range: ra={ra}, dec={dec}")]
    InvalidPosition { ra: f64, dec: f64 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl WashError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WashError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WashError>;

/// What went wrong with a single catalog row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowProblem {
    /// The row has fewer fields than the position column requires
    MissingColumn { column: usize, fields: usize },
    /// A position field does not parse as a number
    NotNumeric { column: usize, value: String },
    /// Position parsed but lies outside ra `[0, 360]` or dec `[-90, 90]`
    OutOfRange { ra: f64, dec: f64 },
    /// The row's field count differs from the first record's
    ArityMismatch { expected: usize, found: usize },
}

impl fmt::Display for RowProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowProblem::MissingColumn { column, fields } => {
                write!(f, "column {column} missing (row has {fields} fields)")
            }
            RowProblem::NotNumeric { column, value } => {
                write!(f, "column {column} is not numeric ({value:?})")
            }
            RowProblem::OutOfRange { ra, dec } => {
                write!(f, "position out of range (ra={ra}, dec={dec})")
            }
            RowProblem::ArityMismatch { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
        }
    }
}

/// A problem with one row, identified by its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub line: usize,
    pub problem: RowProblem,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.problem)
    }
}

struct RowIssues<'a>(&'a [RowIssue]);

impl fmt::Display for RowIssues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().take(MAX_LISTED_ISSUES).enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        if self.0.len() > MAX_LISTED_ISSUES {
            write!(f, "; and {} more", self.0.len() - MAX_LISTED_ISSUES)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_lines() {
        let err = WashError::MalformedRecords {
            path: PathBuf::from("new.dmc"),
            issues: vec![
                RowIssue {
                    line: 3,
                    problem: RowProblem::NotNumeric {
                        column: 10,
                        value: "abc".to_string(),
                    },
                },
                RowIssue {
                    line: 7,
                    problem: RowProblem::MissingColumn {
                        column: 11,
                        fields: 4,
                    },
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 malformed record(s)"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("line 7"));
    }

    #[test]
    fn test_malformed_message_truncates_long_lists() {
        let issues = (1..=25)
            .map(|line| RowIssue {
                line,
                problem: RowProblem::ArityMismatch {
                    expected: 12,
                    found: 11,
                },
            })
            .collect();
        let err = WashError::MalformedRecords {
            path: PathBuf::from("big.dmc"),
            issues,
        };
        let msg = err.to_string();
        assert!(msg.contains("line 10:"));
        assert!(!msg.contains("line 11:"));
        assert!(msg.contains("and 15 more"));
    }
}
