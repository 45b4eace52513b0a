use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use common::{Catalog, Record, DELIMITER, QUOTE};
use tracing::{debug, info, warn};

use crate::CatalogError;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordError {
    UnterminatedQuote { column: usize },
    UnexpectedCharacter { column: usize, found: char },
    MissingField,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::UnterminatedQuote { column } => {
                write!(f, "quote opened at column {} is never closed", column)
            }
            RecordError::UnexpectedCharacter { column, found } => {
                write!(f, "unexpected {:?} after closing quote at column {}", found, column)
            }
            RecordError::MissingField => write!(f, "expected two comma-separated fields"),
        }
    }
}

#[derive(Debug)]
pub(crate) enum ParseError {
    Io(io::Error),
    Malformed { line: usize, reason: RecordError },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "io error: {}", err),
            ParseError::Malformed { line, reason } => write!(f, "line {}: {}", line, reason),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldState {
    Start,
    InQuoted,
    InUnquoted,
    FieldDone,
}

pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_catalog(BufReader::new(file)).map_err(|err| match err {
        ParseError::Io(source) => CatalogError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Malformed { line, reason } => CatalogError::MalformedRecord {
            path: path.to_path_buf(),
            line,
            reason,
        },
    })?;

    info!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Reads records until end of input or the first blank line.
pub(crate) fn parse_catalog<R: BufRead>(reader: R) -> Result<Catalog, ParseError> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let mut text = line.as_str();
        if index == 0 {
            text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        }
        let text = text.strip_suffix('\r').unwrap_or(text);

        if text.trim().is_empty() {
            debug!("Blank line {} ends the catalog", index + 1);
            break;
        }

        let record = decode_line(text).map_err(|reason| ParseError::Malformed {
            line: index + 1,
            reason,
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Decodes the first two fields of a line. Anything after the second
/// field's delimiter is ignored.
pub(crate) fn decode_line(line: &str) -> Result<Record, RecordError> {
    let mut fields: Vec<String> = Vec::with_capacity(2);
    let mut current = String::new();
    let mut state = FieldState::Start;
    let mut quote_column = 0;

    for (index, ch) in line.chars().enumerate() {
        let column = index + 1;
        match state {
            FieldState::Start if ch == QUOTE => {
                quote_column = column;
                state = FieldState::InQuoted;
            }
            FieldState::Start if ch == DELIMITER => fields.push(String::new()),
            FieldState::Start => {
                current.push(ch);
                state = FieldState::InUnquoted;
            }
            FieldState::InQuoted if ch == QUOTE => state = FieldState::FieldDone,
            FieldState::InQuoted => current.push(ch),
            FieldState::InUnquoted | FieldState::FieldDone if ch == DELIMITER => {
                fields.push(std::mem::take(&mut current));
                state = FieldState::Start;
            }
            FieldState::InUnquoted => current.push(ch),
            FieldState::FieldDone => {
                return Err(RecordError::UnexpectedCharacter { column, found: ch })
            }
        }

        if fields.len() == 2 {
            break;
        }
    }

    if fields.len() < 2 {
        match state {
            FieldState::InQuoted => {
                return Err(RecordError::UnterminatedQuote {
                    column: quote_column,
                })
            }
            FieldState::InUnquoted | FieldState::FieldDone => fields.push(current),
            // A trailing delimiter leaves an empty final field.
            FieldState::Start if !fields.is_empty() => fields.push(current),
            FieldState::Start => {}
        }
    }

    let mut fields = fields.into_iter();
    match (fields.next(), fields.next()) {
        (Some(artist), Some(album)) => Ok(Record::new(artist, album)),
        _ => Err(RecordError::MissingField),
    }
}

pub(crate) fn write_catalog<W: Write>(writer: &mut W, records: &[Record]) -> io::Result<()> {
    for record in records {
        writeln!(writer, "{}", record)?;
    }
    Ok(())
}

/// Refuses the whole catalog, before the destination is opened, when any
/// record could not be read back.
pub fn save_catalog(path: &Path, records: &[Record]) -> Result<(), CatalogError> {
    let unavailable = |source: io::Error| CatalogError::DestinationUnavailable {
        path: path.to_path_buf(),
        source,
    };

    if let Some(record) = records.iter().find(|record| !record.is_storable()) {
        warn!("Refusing to write unreadable record {:?}", record);
        return Err(unavailable(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "artist {:?} / album {:?} contains a quote or line break",
                record.artist(),
                record.album()
            ),
        )));
    }

    let file = File::create(path).map_err(unavailable)?;
    let mut writer = BufWriter::new(file);
    write_catalog(&mut writer, records).map_err(unavailable)?;
    writer.flush().map_err(unavailable)?;

    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
