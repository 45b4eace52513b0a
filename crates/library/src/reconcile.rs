use std::collections::HashSet;
use std::io::{self, Write};

use common::{Catalog, Record};
use tracing::info;

use crate::CatalogError;

const NEW_SECTION: &str = "NEW-DATA";
const MISSING_SECTION: &str = "MISSING-DATA";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortMode {
    #[default]
    None,
    ByArtist,
    ByAlbum,
}

impl SortMode {
    pub fn from_flags(by_artist: bool, by_album: bool) -> Result<Self, CatalogError> {
        match (by_artist, by_album) {
            (true, true) => Err(CatalogError::ConflictingSortOptions),
            (true, false) => Ok(Self::ByArtist),
            (false, true) => Ok(Self::ByAlbum),
            (false, false) => Ok(Self::None),
        }
    }

    /// Stable ordinal sort; records with equal keys keep their order.
    pub fn sort(self, records: &mut [Record]) {
        match self {
            SortMode::None => {}
            SortMode::ByArtist => records.sort_by(|a, b| a.artist().cmp(b.artist())),
            SortMode::ByAlbum => records.sort_by(|a, b| a.album().cmp(b.album())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    pub new: Vec<Record>,
    pub missing: Vec<Record>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    found: Catalog,
    comparison: Option<Comparison>,
}

impl Reconciliation {
    pub fn found(&self) -> &[Record] {
        &self.found
    }

    /// `None` when no previous catalog was supplied.
    pub fn comparison(&self) -> Option<&Comparison> {
        self.comparison.as_ref()
    }

    pub fn write_report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(comparison) = &self.comparison else {
            return Ok(());
        };
        write_section(out, NEW_SECTION, &comparison.new)?;
        write_section(out, MISSING_SECTION, &comparison.missing)?;
        out.flush()
    }
}

pub fn reconcile(
    mut current: Catalog,
    previous: Option<Catalog>,
    sort_mode: SortMode,
) -> Reconciliation {
    sort_mode.sort(&mut current);

    let comparison = previous.map(|mut previous| {
        sort_mode.sort(&mut previous);

        let known: HashSet<&Record> = previous.iter().collect();
        let present: HashSet<&Record> = current.iter().collect();
        let new: Vec<Record> = current
            .iter()
            .filter(|record| !known.contains(record))
            .cloned()
            .collect();
        let missing: Vec<Record> = previous
            .iter()
            .filter(|record| !present.contains(record))
            .cloned()
            .collect();

        info!(
            "Compared {} found against {} previous: {} new, {} missing",
            current.len(),
            previous.len(),
            new.len(),
            missing.len()
        );
        Comparison { new, missing }
    });

    Reconciliation {
        found: current,
        comparison,
    }
}

fn write_section<W: Write>(out: &mut W, label: &str, records: &[Record]) -> io::Result<()> {
    writeln!(out, "{}", label)?;
    for record in records {
        writeln!(out, "{}", record)?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use common::Record;

    use super::{reconcile, Reconciliation, SortMode};
    use crate::CatalogError;

    fn record(artist: &str, album: &str) -> Record {
        Record::new(artist, album)
    }

    fn new_of(result: &Reconciliation) -> &[Record] {
        &result.comparison().unwrap().new
    }

    fn missing_of(result: &Reconciliation) -> &[Record] {
        &result.comparison().unwrap().missing
    }

    #[test]
    fn classifies_new_and_missing() {
        let previous = vec![record("ArtistA", "Album1"), record("ArtistC", "Album1")];
        let current = vec![record("ArtistA", "Album1"), record("ArtistA", "Album2")];

        let result = reconcile(current.clone(), Some(previous), SortMode::None);
        assert_eq!(result.found(), current.as_slice());
        assert_eq!(new_of(&result), &[record("ArtistA", "Album2")]);
        assert_eq!(missing_of(&result), &[record("ArtistC", "Album1")]);
    }

    #[test]
    fn no_previous_catalog_means_no_comparison() {
        let current = vec![record("ArtistA", "Album1")];
        let result = reconcile(current, None, SortMode::None);
        assert!(result.comparison().is_none());

        let mut out: Vec<u8> = Vec::new();
        result.write_report(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn matching_requires_both_fields() {
        let previous = vec![record("Low", "Secret Name")];
        let current = vec![record("Low", "Secret name")];
        let result = reconcile(current, Some(previous), SortMode::None);
        assert_eq!(new_of(&result), &[record("Low", "Secret name")]);
        assert_eq!(missing_of(&result), &[record("Low", "Secret Name")]);
    }

    #[test]
    fn every_record_lands_in_one_class() {
        let previous = vec![record("A", "1"), record("B", "1"), record("C", "1")];
        let current = vec![record("C", "1"), record("D", "1"), record("A", "1")];
        let result = reconcile(current.clone(), Some(previous.clone()), SortMode::None);

        for item in new_of(&result) {
            assert!(current.contains(item));
            assert!(!previous.contains(item));
            assert!(!missing_of(&result).contains(item));
        }
        for item in missing_of(&result) {
            assert!(previous.contains(item));
            assert!(!current.contains(item));
        }
        let unchanged = current.iter().filter(|r| previous.contains(r)).count();
        assert_eq!(unchanged + new_of(&result).len(), current.len());
        assert_eq!(unchanged + missing_of(&result).len(), previous.len());
    }

    #[test]
    fn sorts_all_outputs_by_artist() {
        let previous = vec![record("Zed", "Old"), record("Abba", "Gone")];
        let current = vec![
            record("Mew", "Frengers"),
            record("Abba", "Arrival"),
            record("Zed", "New"),
        ];
        let result = reconcile(current, Some(previous), SortMode::ByArtist);
        assert_eq!(
            result.found(),
            &[
                record("Abba", "Arrival"),
                record("Mew", "Frengers"),
                record("Zed", "New"),
            ]
        );
        assert_eq!(
            new_of(&result),
            &[
                record("Abba", "Arrival"),
                record("Mew", "Frengers"),
                record("Zed", "New"),
            ]
        );
        assert_eq!(
            missing_of(&result),
            &[record("Abba", "Gone"), record("Zed", "Old")]
        );
    }

    #[test]
    fn album_sort_is_stable_and_ordinal() {
        let mut records = vec![
            record("B", "same"),
            record("A", "Same"),
            record("C", "same"),
            record("D", "Éclair"),
            record("E", "apple"),
        ];
        SortMode::ByAlbum.sort(&mut records);
        assert_eq!(
            records,
            vec![
                record("A", "Same"),
                record("E", "apple"),
                record("B", "same"),
                record("C", "same"),
                record("D", "Éclair"),
            ]
        );

        let again = {
            let mut copy = records.clone();
            SortMode::ByAlbum.sort(&mut copy);
            copy
        };
        assert_eq!(again, records);
    }

    #[test]
    fn report_lists_sections_in_order() {
        let previous = vec![record("ArtistC", "Album1")];
        let current = vec![record("ArtistA", "Album2")];
        let result = reconcile(current, Some(previous), SortMode::None);

        let mut out: Vec<u8> = Vec::new();
        result.write_report(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "NEW-DATA\n\"ArtistA\",\"Album2\"\n\nMISSING-DATA\n\"ArtistC\",\"Album1\"\n\n"
        );
    }

    #[test]
    fn empty_sections_are_still_labelled() {
        let catalog = vec![record("A", "1")];
        let result = reconcile(catalog.clone(), Some(catalog), SortMode::None);

        let mut out: Vec<u8> = Vec::new();
        result.write_report(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "NEW-DATA\n\nMISSING-DATA\n\n");
    }

    #[test]
    fn sort_flags_are_exclusive() {
        assert_eq!(SortMode::from_flags(false, false).unwrap(), SortMode::None);
        assert_eq!(SortMode::from_flags(true, false).unwrap(), SortMode::ByArtist);
        assert_eq!(SortMode::from_flags(false, true).unwrap(), SortMode::ByAlbum);
        assert!(matches!(
            SortMode::from_flags(true, true),
            Err(CatalogError::ConflictingSortOptions)
        ));
    }
}
