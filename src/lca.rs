//src/lca.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;

use crate::lineage::{Lineage, LineageCache, Rank, RANK_LADDER};
use crate::types::{AlignmentHit, UNRESOLVED};

/// "synthetic construct"
pub const SYNTHETIC_CONSTRUCT_TAXID: &str = "111789";
/// "Homo sapiens"
pub const HUMAN_TAXID: &str = "9606";
/// Hominidae, where ambiguous human / synthetic construct calls are collapsed.
pub const HOMINIDAE_TAXID: &str = "9604";
/// Bacteria, for tie sets of uncultured organisms that never agree below superkingdom.
pub const BACTERIA_TAXID: &str = "2";

/// Resolve one taxid for the tie set of a query.
///
/// Walking from strain up to superkingdom, the first rank at which every tied
/// hit carries the same resolved taxid wins. Two overrides short-circuit the
/// walk on disagreement:
///  - a human or synthetic construct taxid among the candidates -> Hominidae
///  - disagreement still at superkingdom with an "uncultured" species -> Bacteria
pub fn resolve_lca(query_id: &str, tied: &[&AlignmentHit], lineages: &LineageCache) -> String {
    let tied_lineages: Vec<Arc<Lineage>> = tied.iter().map(|hit| lineages.get(&hit.taxid)).collect();
    resolve_lca_from_lineages(query_id, &tied_lineages)
}

pub fn resolve_lca_from_lineages(query_id: &str, tied_lineages: &[Arc<Lineage>]) -> String {
    let uncultured = tied_lineages
        .iter()
        .any(|lin| lin.name(Rank::Species).contains("uncultured"));

    for rank in RANK_LADDER {
        let distinct: BTreeSet<&str> = tied_lineages.iter().map(|lin| lin.taxid(rank)).collect();

        match distinct.len() {
            0 => break,
            1 => {
                if let Some(&taxid) = distinct.first() {
                    if taxid != UNRESOLVED {
                        return taxid.to_string();
                    }
                }
            }
            _ => {
                if distinct.contains(SYNTHETIC_CONSTRUCT_TAXID) || distinct.contains(HUMAN_TAXID) {
                    log::debug!("{query_id}: human/synthetic hit among {rank} candidates, using {HOMINIDAE_TAXID}");
                    return HOMINIDAE_TAXID.to_string();
                }
                if rank == Rank::Superkingdom && uncultured {
                    log::debug!("{query_id}: uncultured species disagreeing at {rank}, using {BACTERIA_TAXID}");
                    return BACTERIA_TAXID.to_string();
                }
            }
        }
    }
    UNRESOLVED.to_string()
}

/// Resolve the LCA of every query group in parallel, keeping group order.
pub fn resolve_all(
    groups: &[(&str, Vec<&AlignmentHit>)],
    lineages: &LineageCache,
) -> Vec<(String, String)> {
    groups
        .par_iter()
        .map(|(query_id, tied)| (query_id.to_string(), resolve_lca(query_id, tied, lineages)))
        .collect()
}
