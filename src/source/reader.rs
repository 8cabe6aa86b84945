//! Streaming row reader for source lists.

use tokio::io::{AsyncBufReadExt, Lines};

use crate::error_handling::{GenerationError, StorageError};
use crate::source::{SourceFormat, SourceRef};
use crate::storage::{LineReader, Storage};

/// Decomposition of a domain, as found in the parts variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParts {
    pub registrable_domain: String,
    /// Label directly left of the public suffix; identifies the organization
    pub second_level: String,
    pub subdomain: String,
    pub public_suffix: String,
    pub tld: String,
    pub is_registrable: bool,
}

/// One line of a source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub rank: u64,
    pub domain: String,
    /// Present for parts-format sources
    pub parts: Option<DomainParts>,
}

/// Parses one line. `Err` carries the reason the line is malformed.
pub fn parse_row(line: &str, format: SourceFormat) -> Result<SourceRow, String> {
    let fields: Vec<&str> = line.trim_end().split(',').collect();
    if fields.len() != format.columns() {
        return Err(format!(
            "expected {} columns, found {}",
            format.columns(),
            fields.len()
        ));
    }

    let rank = match fields[0].trim().parse::<u64>() {
        Ok(0) | Err(_) => return Err(format!("invalid rank {:?}", fields[0])),
        Ok(rank) => rank,
    };

    let parts = match format {
        SourceFormat::Raw => None,
        SourceFormat::Parts => Some(DomainParts {
            registrable_domain: fields[2].to_string(),
            second_level: fields[3].to_string(),
            subdomain: fields[4].to_string(),
            public_suffix: fields[5].to_string(),
            tld: fields[6].to_string(),
            is_registrable: match fields[7] {
                "True" => true,
                "False" => false,
                other => return Err(format!("invalid registrable flag {other:?}")),
            },
        }),
    };

    Ok(SourceRow {
        rank,
        domain: fields[1].to_string(),
        parts,
    })
}

/// Reads a source list line by line, stopping after an optional number of rows.
///
/// Rows are parsed lazily, so a million-row list is never held as text.
pub struct RowReader {
    key: String,
    format: SourceFormat,
    lines: Lines<LineReader>,
    limit: Option<usize>,
    rows_read: usize,
}

impl RowReader {
    pub async fn open(
        storage: &dyn Storage,
        source: &SourceRef,
        limit: Option<usize>,
    ) -> Result<Self, GenerationError> {
        let reader = storage.open(&source.key).await.map_err(|e| match e {
            StorageError::NotFound(_) => GenerationError::SourceNotFound {
                provider: source.provider.clone(),
                date: source.date,
            },
            other => GenerationError::Storage(other),
        })?;
        Ok(Self {
            key: source.key.clone(),
            format: source.format,
            lines: reader.lines(),
            limit,
            rows_read: 0,
        })
    }

    /// Next row, or `None` at end of file or once the limit is reached.
    ///
    /// A malformed line fails the whole read.
    pub async fn next_row(&mut self) -> Result<Option<SourceRow>, GenerationError> {
        if self.limit.is_some_and(|limit| self.rows_read >= limit) {
            return Ok(None);
        }
        let line = match self
            .lines
            .next_line()
            .await
            .map_err(|e| StorageError::io(&self.key, e))?
        {
            Some(line) => line,
            None => return Ok(None),
        };
        self.rows_read += 1;

        parse_row(&line, self.format)
            .map(Some)
            .map_err(|reason| GenerationError::MalformedRow {
                source_key: self.key.clone(),
                line: self.rows_read,
                reason,
            })
    }

    /// Rows returned so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

/// Reads up to `limit` rows of `source` (all rows if `None`).
pub async fn read_prefix(
    storage: &dyn Storage,
    source: &SourceRef,
    limit: Option<usize>,
) -> Result<Vec<SourceRow>, GenerationError> {
    let mut reader = RowReader::open(storage, source, limit).await?;
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row().await? {
        rows.push(row);
    }
    Ok(rows)
}
