//src/blast.rs

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;

use crate::error::{MalformedHitError, MultitaxError};
use crate::reader::open_text;
use crate::types::{AlignmentHit, MISSING_TAXID};

/// Column names of the tabular format requested from blast, in order.
pub const BLAST_COLUMNS: [&str; 13] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore", "staxids",
];

/// Parse a BLAST tabular file (13 fixed columns, no header, optionally gzipped).
pub fn parse_blast<P: AsRef<Path>>(path: P) -> Result<Vec<AlignmentHit>, MultitaxError> {
    let path = path.as_ref();
    let hits = parse_blast_reader(open_text(path)?)?;
    log::info!("Parsed {} alignment hits from {}", hits.len(), path.display());
    Ok(hits)
}

pub fn parse_blast_reader<R: Read>(reader: R) -> Result<Vec<AlignmentHit>, MultitaxError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut hits = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        hits.push(parse_record(&record, line)?);
    }
    Ok(hits)
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<AlignmentHit, MalformedHitError> {
    let malformed = |reason: String| MalformedHitError {
        line,
        row: record.iter().collect::<Vec<_>>().join("\t"),
        reason,
    };

    // The taxid column may be absent entirely; everything before it is required
    if record.len() < BLAST_COLUMNS.len() - 1 || record.len() > BLAST_COLUMNS.len() {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            BLAST_COLUMNS.len(),
            record.len()
        )));
    }

    fn num<T: FromStr>(
        record: &csv::StringRecord,
        idx: usize,
        malformed: &dyn Fn(String) -> MalformedHitError,
    ) -> Result<T, MalformedHitError> {
        let raw = record.get(idx).unwrap_or("").trim();
        raw.parse()
            .map_err(|_| malformed(format!("{} is not numeric: {raw:?}", BLAST_COLUMNS[idx])))
    }

    // f64 parsing accepts nan/inf, which would poison the best-score comparison
    fn real(
        record: &csv::StringRecord,
        idx: usize,
        malformed: &dyn Fn(String) -> MalformedHitError,
    ) -> Result<f64, MalformedHitError> {
        let value: f64 = num(record, idx, malformed)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(malformed(format!("{} is not finite: {value}", BLAST_COLUMNS[idx])))
        }
    }

    Ok(AlignmentHit {
        query_id: record[0].to_string(),
        target_id: record[1].to_string(),
        pident: real(record, 2, &malformed)?,
        length: num(record, 3, &malformed)?,
        mismatch: num(record, 4, &malformed)?,
        gapopen: num(record, 5, &malformed)?,
        qstart: num(record, 6, &malformed)?,
        qend: num(record, 7, &malformed)?,
        sstart: num(record, 8, &malformed)?,
        send: num(record, 9, &malformed)?,
        evalue: real(record, 10, &malformed)?,
        bitscore: real(record, 11, &malformed)?,
        taxid: normalize_taxid(record.get(12)),
    })
}

/// Keep the first of several `;`-joined taxids (they share a lineage); map
/// empty and NA-like values to the `"nan"` sentinel.
pub fn normalize_taxid(raw: Option<&str>) -> String {
    let first = raw
        .and_then(|s| s.split(';').next())
        .map(str::trim)
        .unwrap_or("");
    match first {
        "" | "nan" | "NaN" | "NA" | "N/A" => MISSING_TAXID.to_string(),
        other => other.to_string(),
    }
}

/// Keep, for every query, all hits whose bitscore equals the best bitscore of
/// that query. Ties are kept on purpose: the LCA needs the whole tie set.
/// Input order is preserved.
pub fn select_best_per_query(hits: Vec<AlignmentHit>) -> Vec<AlignmentHit> {
    let mut best: AHashMap<String, f64> = AHashMap::new();
    for hit in &hits {
        best.entry(hit.query_id.clone())
            .and_modify(|b| *b = b.max(hit.bitscore))
            .or_insert(hit.bitscore);
    }

    let total = hits.len();
    let kept: Vec<AlignmentHit> = hits
        .into_iter()
        .filter(|hit| best.get(&hit.query_id).is_some_and(|&b| hit.bitscore >= b))
        .collect();

    log::info!(
        "Kept {} of {} hits at the best bitscore of {} queries",
        kept.len(),
        total,
        best.len()
    );
    kept
}

/// Group hits by query id, queries in order of first appearance.
pub fn group_by_query(hits: &[AlignmentHit]) -> Vec<(&str, Vec<&AlignmentHit>)> {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut groups: Vec<(&str, Vec<&AlignmentHit>)> = Vec::new();

    for hit in hits {
        let slot = *index.entry(hit.query_id.as_str()).or_insert_with(|| {
            groups.push((hit.query_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(hit);
    }
    groups
}
