//src/taxdb.rs

use std::io::{self, BufRead};
use std::path::Path;

use ahash::AHashMap;

use crate::error::{MalformedTaxonomyError, TaxonomyError};
use crate::reader::open_text;

/// Borrowed view of one taxonomy block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonRecord<'a> {
    pub taxid: &'a str,
    pub parent_id: &'a str,
    pub rank: &'a str,
    pub name: &'a str,
}

/// In-memory taxonomy: taxid -> ordered attribute values of its block.
///
/// Immutable once loaded, so it can be shared freely across rayon workers.
#[derive(Debug, Default, Clone)]
pub struct TaxonomyStore {
    entries: AHashMap<String, Vec<String>>,
}

impl TaxonomyStore {
    /// Loads a taxonomy dump (optionally gzipped) in the format:
    /// ```text
    /// //
    /// ID                        : 562
    /// PARENT ID                 : 561
    /// RANK                      : species
    /// SCIENTIFIC NAME           : Escherichia coli
    /// ```
    /// Attribute values are stored positionally, whatever their label:
    /// index 0 is the parent, 1 the rank, 2 the scientific name.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let store = Self::from_reader(open_text(path)?)?;
        log::info!(
            "Loaded {} taxa from taxonomy dump {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut entries: AHashMap<String, Vec<String>> = AHashMap::new();
        let mut current: Option<String> = None;
        let mut orphans = 0usize;

        for line_result in reader.lines() {
            let line = line_result?;
            // Only "<label> : <value>" lines matter; separators like "//" are skipped
            let mut parts = line.split(" : ");
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key == "ID" {
                entries.entry(value.to_string()).or_default();
                current = Some(value.to_string());
            } else if let Some(taxid) = &current {
                if let Some(values) = entries.get_mut(taxid) {
                    values.push(value.to_string());
                }
            } else {
                orphans += 1;
            }
        }

        if orphans > 0 {
            log::debug!("Skipped {orphans} attribute line(s) preceding the first ID line");
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, taxid: &str) -> bool {
        self.entries.contains_key(taxid)
    }

    /// Look up a taxon, failing if it is absent or its block is truncated.
    pub fn record(&self, taxid: &str) -> Result<TaxonRecord<'_>, TaxonomyError> {
        let (key, values) = self
            .entries
            .get_key_value(taxid)
            .ok_or_else(|| TaxonomyError::UnknownTaxon(taxid.to_string()))?;

        match values.as_slice() {
            [parent_id, rank, name, ..] => Ok(TaxonRecord {
                taxid: key,
                parent_id,
                rank,
                name,
            }),
            _ => Err(MalformedTaxonomyError {
                taxid: taxid.to_string(),
                found: values.len(),
            }
            .into()),
        }
    }

    pub fn parent_of(&self, taxid: &str) -> Option<&str> {
        self.record(taxid).ok().map(|rec| rec.parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
//
ID                        : 1
PARENT ID                 : 1
RANK                      : no rank
SCIENTIFIC NAME           : root
//
ID                        : 2
PARENT ID                 : 131567
RANK                      : superkingdom
SCIENTIFIC NAME           : Bacteria
//
ID                        : 77
PARENT ID                 : 2
//
";

    #[test]
    fn test_positional_attributes() {
        let store = TaxonomyStore::from_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(store.len(), 3);

        let rec = store.record("2").unwrap();
        assert_eq!(rec.taxid, "2");
        assert_eq!(rec.parent_id, "131567");
        assert_eq!(rec.rank, "superkingdom");
        assert_eq!(rec.name, "Bacteria");
        assert_eq!(store.parent_of("1"), Some("1"));
    }

    #[test]
    fn test_truncated_block_is_malformed_on_lookup() {
        let store = TaxonomyStore::from_reader(DUMP.as_bytes()).unwrap();
        assert!(store.contains("77"));
        assert_eq!(
            store.record("77"),
            Err(TaxonomyError::Malformed(MalformedTaxonomyError {
                taxid: "77".to_string(),
                found: 1,
            }))
        );
        assert_eq!(store.parent_of("77"), None);
    }

    #[test]
    fn test_unknown_taxon() {
        let store = TaxonomyStore::from_reader(DUMP.as_bytes()).unwrap();
        assert_eq!(
            store.record("9606"),
            Err(TaxonomyError::UnknownTaxon("9606".to_string()))
        );
    }

    #[test]
    fn test_lines_before_first_id_are_ignored() {
        let dump = "RANK : species\nID : 5\nPARENT : 1\nRANK : genus\nNAME : G\n";
        let store = TaxonomyStore::from_reader(dump.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.record("5").unwrap().rank, "genus");
    }
}
