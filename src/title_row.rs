use std::ops::Index;

pub const TITLES_PER_DAY: usize = 30;

/// The ranked titles of one day's front page, rank 1 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRow([String; TITLES_PER_DAY]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TitleRowError {
    #[error("expected 30 titles, found {0}")]
    Count(usize),
    #[error("title at rank {rank} is empty")]
    Empty { rank: usize },
}

impl TitleRow {
    pub fn new(titles: [String; TITLES_PER_DAY]) -> Self {
        Self(titles)
    }

    /// Builds a row from exactly [`TITLES_PER_DAY`] non-empty titles.
    ///
    /// Never truncates or pads.
    pub fn from_titles(titles: Vec<String>) -> Result<Self, TitleRowError> {
        if let Some(rank) = titles.iter().position(|t| t.is_empty()) {
            return Err(TitleRowError::Empty { rank: rank + 1 });
        }
        let titles: [String; TITLES_PER_DAY] = titles
            .try_into()
            .map_err(|rejected: Vec<String>| TitleRowError::Count(rejected.len()))?;
        Ok(Self(titles))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl Index<usize> for TitleRow {
    type Output = String;

    fn index(&self, index: usize) -> &String {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a TitleRow {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
