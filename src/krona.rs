//src/krona.rs

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::types::{FinalizedRecord, HierarchyCount};

/// Count queries per (superkingdom, ..., species) path, ordered by path.
pub fn aggregate(records: &[FinalizedRecord]) -> Vec<HierarchyCount> {
    let mut counts: BTreeMap<[String; 7], usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.hierarchy_path()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(path, count)| HierarchyCount { count, path })
        .collect()
}

/// Write `count<TAB>superkingdom<TAB>...<TAB>species` lines, the text input
/// expected by `ktImportText`.
pub fn write_krona_text<W: Write>(counts: &[HierarchyCount], mut writer: W) -> io::Result<()> {
    for row in counts {
        writeln!(writer, "{}\t{}", row.count, row.path.join("\t"))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(query: &str, path: [&str; 7]) -> FinalizedRecord {
        let [superkingdom, phylum, class, order, family, genus, species] = path.map(String::from);
        FinalizedRecord {
            query_id: query.to_string(),
            bitscore: 50.0,
            lca_taxid: "0".to_string(),
            species_name: species.clone(),
            strain: "None".to_string(),
            species,
            genus,
            family,
            order,
            class,
            phylum,
            superkingdom,
        }
    }

    const ECOLI: [&str; 7] = [
        "Bacteria",
        "Proteobacteria",
        "Gammaproteobacteria",
        "Enterobacterales",
        "Enterobacteriaceae",
        "Escherichia",
        "Escherichia coli",
    ];
    const NONE: [&str; 7] = ["None"; 7];

    #[test]
    fn test_counts_sum_to_records() {
        let records = vec![
            record("r1", ECOLI),
            record("r2", NONE),
            record("r3", ECOLI),
            record("r4", ECOLI),
        ];
        let counts = aggregate(&records);

        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), records.len());

        let expected: BTreeSet<[String; 7]> = records.iter().map(|r| r.hierarchy_path()).collect();
        let got: BTreeSet<[String; 7]> = counts.iter().map(|c| c.path.clone()).collect();
        assert_eq!(got, expected);

        let ecoli = counts.iter().find(|c| c.path[6] == "Escherichia coli").unwrap();
        assert_eq!(ecoli.count, 3);
    }

    #[test]
    fn test_krona_text_layout() {
        let counts = aggregate(&[record("r1", ECOLI), record("r2", NONE)]);
        let mut buf = Vec::new();
        write_krona_text(&counts, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "1\tBacteria\tProteobacteria\tGammaproteobacteria\tEnterobacterales\t\
             Enterobacteriaceae\tEscherichia\tEscherichia coli\n\
             1\tNone\tNone\tNone\tNone\tNone\tNone\tNone\n"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }
}
