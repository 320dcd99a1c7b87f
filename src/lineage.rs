//src/lineage.rs

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::taxdb::{TaxonRecord, TaxonomyStore};
use crate::types::{MISSING_TAXID, UNRESOLVED};

/// How many ancestors a single climb inspects before giving up on a rank.
pub const DEFAULT_CLIMB_BOUND: usize = 20;

/// Canonical ranks reported in a lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Strain,
    Species,
    Genus,
    Family,
    Order,
    Class,
    Phylum,
    Superkingdom,
}

/// Finest to coarsest.
pub const RANK_LADDER: [Rank; 8] = [
    Rank::Strain,
    Rank::Species,
    Rank::Genus,
    Rank::Family,
    Rank::Order,
    Rank::Class,
    Rank::Phylum,
    Rank::Superkingdom,
];

impl Rank {
    /// Rank label as spelled in the taxonomy dump.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Strain => "strain",
            Rank::Species => "species",
            Rank::Genus => "genus",
            Rank::Family => "family",
            Rank::Order => "order",
            Rank::Class => "class",
            Rank::Phylum => "phylum",
            Rank::Superkingdom => "superkingdom",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (taxid, scientific name) pair per canonical rank, in ladder order.
/// Unresolved slots hold `"None"` in both positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    slots: [(String, String); 8],
}

impl Lineage {
    pub fn unresolved() -> Self {
        Self {
            slots: std::array::from_fn(|_| (UNRESOLVED.to_string(), UNRESOLVED.to_string())),
        }
    }

    pub fn taxid(&self, rank: Rank) -> &str {
        &self.slots[rank.index()].0
    }

    pub fn name(&self, rank: Rank) -> &str {
        &self.slots[rank.index()].1
    }

    pub fn is_unresolved(&self) -> bool {
        self.slots
            .iter()
            .all(|(id, name)| id == UNRESOLVED && name == UNRESOLVED)
    }

    /// The 16 flat values: taxid, name, taxid, name, ... finest first.
    pub fn flatten(&self) -> Vec<&str> {
        self.slots
            .iter()
            .flat_map(|(id, name)| [id.as_str(), name.as_str()])
            .collect()
    }
}

/// Walk up from `taxid`'s parent, inspecting at most `bound` ancestors, and
/// return the first one whose rank is `target`. A missing or truncated
/// ancestor ends the climb.
pub fn climb<'a>(
    taxid: &str,
    store: &'a TaxonomyStore,
    target: Rank,
    bound: usize,
) -> Option<TaxonRecord<'a>> {
    let mut node = store.parent_of(taxid)?;
    for _ in 0..bound {
        let rec = store.record(node).ok()?;
        if rec.rank == target.as_str() {
            return Some(rec);
        }
        node = rec.parent_id;
    }
    None
}

/// Reduce the ancestry of `taxid` to one representative per canonical rank.
///
/// The cursor only moves when a rank is found: it jumps to the parent of the
/// matched taxon, and the next rank is searched from there. A failed climb
/// leaves the cursor in place.
pub fn resolve_lineage(taxid: Option<&str>, store: &TaxonomyStore, bound: usize) -> Lineage {
    let Some(taxid) = taxid else {
        return Lineage::unresolved();
    };
    if taxid == MISSING_TAXID || !store.contains(taxid) {
        return Lineage::unresolved();
    }

    let mut lineage = Lineage::unresolved();
    let mut cursor: &str = taxid;

    for rank in RANK_LADDER {
        let found = match store.record(cursor) {
            Ok(rec) if rec.rank == rank.as_str() => Some(rec),
            Ok(_) => climb(cursor, store, rank, bound),
            Err(e) => {
                log::debug!("Lineage of {taxid} stops at {rank}: {e}");
                None
            }
        };

        if let Some(rec) = found {
            lineage.slots[rank.index()] = (rec.taxid.to_string(), rec.name.to_string());
            cursor = rec.parent_id;
        }
    }
    lineage
}

/// Memoized lineages for one batch, shared read-mostly between rayon workers.
pub struct LineageCache<'a> {
    store: &'a TaxonomyStore,
    bound: usize,
    lineages: RwLock<AHashMap<String, Arc<Lineage>>>,
}

impl<'a> LineageCache<'a> {
    pub fn new(store: &'a TaxonomyStore, bound: usize) -> Self {
        Self {
            store,
            bound,
            lineages: RwLock::new(AHashMap::new()),
        }
    }

    pub fn get(&self, taxid: &str) -> Arc<Lineage> {
        if let Some(lineage) = self.lineages.read().get(taxid) {
            return Arc::clone(lineage);
        }
        let lineage = Arc::new(resolve_lineage(Some(taxid), self.store, self.bound));
        Arc::clone(
            self.lineages
                .write()
                .entry(taxid.to_string())
                .or_insert(lineage),
        )
    }

    /// Resolve every not-yet-cached taxid in parallel.
    pub fn populate<'t, I>(&self, taxids: I)
    where
        I: IntoIterator<Item = &'t str>,
    {
        let missing: Vec<&str> = {
            let cached = self.lineages.read();
            let mut seen = ahash::AHashSet::new();
            taxids
                .into_iter()
                .filter(|t| !cached.contains_key(*t) && seen.insert(*t))
                .collect()
        };
        if missing.is_empty() {
            return;
        }

        let resolved: Vec<(String, Arc<Lineage>)> = missing
            .par_iter()
            .map(|&t| {
                let lineage = resolve_lineage(Some(t), self.store, self.bound);
                (t.to_string(), Arc::new(lineage))
            })
            .collect();

        let unresolved = resolved.iter().filter(|(_, l)| l.is_unresolved()).count();
        log::info!(
            "Resolved lineages of {} taxa ({} without any canonical rank)",
            resolved.len(),
            unresolved
        );
        self.lineages.write().extend(resolved);
    }

    pub fn len(&self) -> usize {
        self.lineages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
