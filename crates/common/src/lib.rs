use std::fmt;

pub const QUOTE: char = '"';
pub const DELIMITER: char = ',';

/// An (artist, album) pair as it appears in a catalog line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    artist: String,
    album: String,
}

pub type Catalog = Vec<Record>;

impl Record {
    pub fn new(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
        }
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    /// Quoted fields are not escaped, so a quote or line break inside a
    /// field would not read back as the same record.
    pub fn is_storable(&self) -> bool {
        let unstorable = |ch: char| ch == QUOTE || ch == '\n' || ch == '\r';
        !self.artist.contains(unstorable) && !self.album.contains(unstorable)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{q}{}{q}{d}{q}{}{q}",
            self.artist,
            self.album,
            q = QUOTE,
            d = DELIMITER
        )
    }
}
