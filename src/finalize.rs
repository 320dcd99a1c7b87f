//src/finalize.rs

use std::io::{Read, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::blast::group_by_query;
use crate::error::MultitaxError;
use crate::lineage::{LineageCache, Rank};
use crate::reader::open_text;
use crate::types::{AlignmentHit, FinalizedRecord, UNRESOLVED};

/// Collapse the best hits to one record per query.
///
/// The first hit of each query stands for the group (query id, bitscore and
/// species name); the lineage columns are those of the resolved LCA taxid, not
/// of any individual hit.
pub fn finalize(
    hits: &[AlignmentHit],
    lca_by_query: &AHashMap<String, String>,
    lineages: &LineageCache,
) -> Vec<FinalizedRecord> {
    let groups = group_by_query(hits);

    lineages.populate(lca_by_query.values().map(String::as_str));

    groups
        .iter()
        .map(|(query_id, group)| {
            let representative = group[0];
            let lca_taxid = lca_by_query
                .get(*query_id)
                .cloned()
                .unwrap_or_else(|| UNRESOLVED.to_string());
            let hit_lineage = lineages.get(&representative.taxid);
            let lin = lineages.get(&lca_taxid);

            FinalizedRecord {
                query_id: query_id.to_string(),
                bitscore: representative.bitscore,
                species_name: hit_lineage.name(Rank::Species).to_string(),
                strain: lin.name(Rank::Strain).to_string(),
                species: lin.name(Rank::Species).to_string(),
                genus: lin.name(Rank::Genus).to_string(),
                family: lin.name(Rank::Family).to_string(),
                order: lin.name(Rank::Order).to_string(),
                class: lin.name(Rank::Class).to_string(),
                phylum: lin.name(Rank::Phylum).to_string(),
                superkingdom: lin.name(Rank::Superkingdom).to_string(),
                lca_taxid,
            }
        })
        .collect()
}

/// Write the finalized records as CSV with a header row.
pub fn write_results_csv<W: Write>(
    records: &[FinalizedRecord],
    writer: W,
) -> Result<(), MultitaxError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_results_csv<R: Read>(reader: R) -> Result<Vec<FinalizedRecord>, MultitaxError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let records = rdr
        .deserialize()
        .collect::<Result<Vec<FinalizedRecord>, csv::Error>>()?;
    Ok(records)
}

/// Load a results table written by a previous run.
pub fn load_results_csv<P: AsRef<Path>>(path: P) -> Result<Vec<FinalizedRecord>, MultitaxError> {
    read_results_csv(open_text(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::tests::store;
    use crate::lineage::DEFAULT_CLIMB_BOUND;

    fn hit(query: &str, taxid: &str, bitscore: f64) -> AlignmentHit {
        AlignmentHit {
            query_id: query.to_string(),
            target_id: format!("{query}_{taxid}"),
            pident: 100.0,
            length: 100,
            mismatch: 0,
            gapopen: 0,
            qstart: 1,
            qend: 100,
            sstart: 1,
            send: 100,
            evalue: 0.0,
            bitscore,
            taxid: taxid.to_string(),
        }
    }

    #[test]
    fn test_one_record_per_query_with_lca_lineage() {
        let store = store();
        let cache = LineageCache::new(&store, DEFAULT_CLIMB_BOUND);
        let hits = vec![
            hit("Q1", "562", 90.0),
            hit("Q1", "623", 90.0),
            hit("Q2", "1133852", 70.0),
        ];
        let lca: AHashMap<String, String> = [("Q1", "543"), ("Q2", "1133852")]
            .into_iter()
            .map(|(q, t)| (q.to_string(), t.to_string()))
            .collect();

        let records = finalize(&hits, &lca, &cache);
        assert_eq!(records.len(), 2);

        let q1 = &records[0];
        assert_eq!(q1.query_id, "Q1");
        assert_eq!(q1.bitscore, 90.0);
        assert_eq!(q1.lca_taxid, "543");
        // from the representative hit, not the LCA
        assert_eq!(q1.species_name, "Escherichia coli");
        assert_eq!(q1.species, UNRESOLVED);
        assert_eq!(q1.genus, UNRESOLVED);
        assert_eq!(q1.family, "Enterobacteriaceae");
        assert_eq!(q1.superkingdom, "Bacteria");

        let q2 = &records[1];
        assert_eq!(q2.strain, "Escherichia coli O104:H4 str. 2011C-3493");
        assert_eq!(q2.species, "Escherichia coli");
    }

    #[test]
    fn test_unknown_taxon_gives_unresolved_record() {
        let store = store();
        let cache = LineageCache::new(&store, DEFAULT_CLIMB_BOUND);
        let hits = vec![hit("Q9", "424242", 40.0)];
        let lca: AHashMap<String, String> =
            [("Q9".to_string(), UNRESOLVED.to_string())].into_iter().collect();

        let records = finalize(&hits, &lca, &cache);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.lca_taxid, UNRESOLVED);
        for field in r.hierarchy_path().iter().chain([&r.strain, &r.species_name]) {
            assert_eq!(field, UNRESOLVED);
        }
    }

    #[test]
    fn test_csv_header_and_reload() {
        let store = store();
        let cache = LineageCache::new(&store, DEFAULT_CLIMB_BOUND);
        let hits = vec![hit("Q1", "562", 88.5)];
        let lca: AHashMap<String, String> =
            [("Q1".to_string(), "562".to_string())].into_iter().collect();
        let records = finalize(&hits, &lca, &cache);

        let mut buf = Vec::new();
        write_results_csv(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("qseqid,bitscore,taxid_LCA,SpeciesName,Strain,Species,Genus,Family,Order,Class,Phylum,Superkingdom")
        );
        assert_eq!(
            lines.next(),
            Some("Q1,88.5,562,Escherichia coli,None,Escherichia coli,Escherichia,Enterobacteriaceae,Enterobacterales,Gammaproteobacteria,Proteobacteria,Bacteria")
        );

        let reloaded = read_results_csv(buf.as_slice()).unwrap();
        assert_eq!(reloaded, records);
    }
}
