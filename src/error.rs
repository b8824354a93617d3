use std::path::PathBuf;

use crate::entry_date::{EntryDate, ParseEntryDateError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the dataset file failed.
    #[error("{op} dataset {}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file exists but is not a valid titles table.
    #[error("malformed dataset {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// The title source could not produce a row for `date`.
    #[error("fetch titles for {date}")]
    Source {
        date: EntryDate,
        #[source]
        source: anyhow::Error,
    },

    /// Cancellation was observed before `date` could be fetched.
    #[error("cancelled before fetching {date}")]
    Cancelled { date: EntryDate },
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The date being fetched when the error happened, if any.
    pub fn date(&self) -> Option<EntryDate> {
        match self {
            Self::Source { date, .. } | Self::Cancelled { date } => Some(*date),
            Self::Io { .. } | Self::Format { .. } => None,
        }
    }
}

/// Problems with the contents of a titles table. Rows count from 1, header excluded.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("dataset is empty")]
    Empty,

    #[error("unexpected header row: {found:?}")]
    Header { found: Vec<String> },

    #[error("row {row}: expected 31 fields, found {found}")]
    FieldCount { row: usize, found: usize },

    #[error("row {row}")]
    Date {
        row: usize,
        #[source]
        source: ParseEntryDateError,
    },

    #[error("row {row}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
}
