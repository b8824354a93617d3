use std::collections::BTreeMap;
use std::io::Write as _;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::entry_date::EntryDate;
use crate::error::{Error, Result};
use crate::pacer::PacedFetcher;
use crate::title_row::TitleRow;

/// Titles per day, bound to the file they are loaded from and saved to.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    entries: BTreeMap<EntryDate, TitleRow>,
}

impl Dataset {
    /// Reads the dataset at `path`, or starts an empty one if nothing is there yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no dataset yet; starting empty");
                return Ok(Self {
                    path,
                    entries: BTreeMap::new(),
                });
            }
            Err(source) => {
                return Err(Error::Io {
                    op: "read",
                    path,
                    source,
                });
            }
        };

        let entries = match codec::decode(&data) {
            Ok(entries) => entries,
            Err(source) => return Err(Error::Format { path, source }),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryDate, &TitleRow)> {
        self.entries.iter().map(|(date, titles)| (*date, titles))
    }

    /// Fetches every day in `start..=end` that has no entry yet, oldest first.
    ///
    /// Stops at the first failure. Rows fetched before it stay in the dataset so the
    /// caller can still [`save`](Self::save) them. Returns how many rows were added.
    pub async fn gap_fill(
        &mut self,
        start: EntryDate,
        end: EntryDate,
        fetcher: &mut PacedFetcher,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut added = 0_usize;
        let mut current = Some(start);

        while let Some(date) = current {
            if date > end {
                break;
            }

            if !self.entries.contains_key(&date) {
                let titles = fetcher.fetch_titles(date, cancel).await?;
                self.entries.insert(date, titles);
                added += 1;
            }

            current = date.next_day();
        }

        Ok(added)
    }

    /// Writes every entry, oldest first, replacing whatever the file held before.
    ///
    /// The table goes to a temporary file next to the target, which is then renamed over it.
    pub fn save(&self) -> Result<()> {
        let io_err = |source: std::io::Error| Error::Io {
            op: "write",
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // New files follow the umask; an existing file keeps its mode across the rename.
        let mut builder = tempfile::Builder::new();
        #[cfg(unix)]
        builder.permissions(std::fs::Permissions::from_mode(0o666));
        let mut tmp = builder.tempfile_in(parent).map_err(io_err)?;
        match std::fs::metadata(&self.path) {
            Ok(meta) => tmp
                .as_file()
                .set_permissions(meta.permissions())
                .map_err(io_err)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(io_err(source)),
        }

        codec::encode(tmp.as_file_mut(), &self.entries).map_err(|err| io_err(err.into()))?;
        tmp.as_file_mut().flush().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|err| io_err(err.error))?;

        Ok(())
    }
}
