//! The on-disk titles table: a `Date` column followed by one column per rank.

use std::collections::BTreeMap;
use std::io;

use crate::entry_date::EntryDate;
use crate::error::FormatError;
use crate::title_row::{TITLES_PER_DAY, TitleRow};

pub const COLUMNS: usize = TITLES_PER_DAY + 1;

pub fn header() -> Vec<String> {
    let mut header = Vec::with_capacity(COLUMNS);
    header.push("Date".to_owned());
    header.extend((1..=TITLES_PER_DAY).map(|rank| format!("Title {rank}")));
    header
}

/// Writes the header and one row per entry, in iteration order.
pub fn encode<'a, W, I>(writer: W, entries: I) -> csv::Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = (&'a EntryDate, &'a TitleRow)>,
{
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(header())?;

    for (date, titles) in entries {
        let date = date.to_string();
        let fields = std::iter::once(date.as_str()).chain(titles.iter().map(String::as_str));
        writer.write_record(fields)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn decode(data: &[u8]) -> Result<BTreeMap<EntryDate, TitleRow>, FormatError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut records = reader.records();

    let header_record = match records.next() {
        None => return Err(FormatError::Empty),
        Some(record) => record.map_err(|source| FormatError::Csv { row: 0, source })?,
    };
    let expected = header();
    if !header_record
        .iter()
        .eq(expected.iter().map(String::as_str))
    {
        return Err(FormatError::Header {
            found: header_record.iter().map(str::to_owned).collect(),
        });
    }

    let mut entries = BTreeMap::new();
    for (index, record) in records.enumerate() {
        let row = index + 1;
        let record = record.map_err(|source| FormatError::Csv { row, source })?;
        if record.len() != COLUMNS {
            return Err(FormatError::FieldCount {
                row,
                found: record.len(),
            });
        }

        let date = EntryDate::parse(&record[0]).map_err(|source| FormatError::Date { row, source })?;
        let titles: [String; TITLES_PER_DAY] = std::array::from_fn(|i| record[i + 1].to_owned());

        if entries.insert(date, TitleRow::new(titles)).is_some() {
            tracing::warn!(%date, row, "duplicate date in dataset; keeping the later row");
        }
    }

    Ok(entries)
}
