// src/lib.rs
pub mod types;
pub mod error;
pub mod reader;
pub mod taxdb;
pub mod blast;
pub mod lineage;
pub mod lca;
pub mod finalize;
pub mod krona;

use ahash::AHashMap;
use std::path::{Path, PathBuf};

pub use crate::error::{MultitaxError, Result};
use crate::blast::{group_by_query, parse_blast, select_best_per_query};
use crate::finalize::{finalize, write_results_csv};
use crate::krona::{aggregate, write_krona_text};
use crate::lca::resolve_all;
use crate::lineage::{LineageCache, DEFAULT_CLIMB_BOUND};
use crate::taxdb::TaxonomyStore;
use crate::types::{FinalizedRecord, HierarchyCount, UNRESOLVED};

/// Everything a refinement run needs besides the blast table itself.
#[derive(Debug, Clone)]
pub struct RefineConfig {
    /// Taxonomy dump (`ID : <taxid>` blocks), plain or gzipped
    pub taxonomy_path: PathBuf,
    /// Ancestors inspected per rank when climbing the taxonomy
    pub climb_bound: usize,
    /// Size of a dedicated rayon pool; `None` runs on the global pool
    pub threads: Option<usize>,
}

impl RefineConfig {
    pub fn new<P: Into<PathBuf>>(taxonomy_path: P) -> Self {
        Self {
            taxonomy_path: taxonomy_path.into(),
            climb_bound: DEFAULT_CLIMB_BOUND,
            threads: None,
        }
    }
}

/// Finalized calls of one run plus the hierarchy counts derived from them.
pub struct RefinementResults {
    /// One record per query, in order of first appearance in the blast table
    pub records: Vec<FinalizedRecord>,
    pub hierarchy: Vec<HierarchyCount>,
}

impl RefinementResults {
    pub fn from_records(records: Vec<FinalizedRecord>) -> Self {
        let hierarchy = aggregate(&records);
        Self { records, hierarchy }
    }

    /// Queries whose tie set could not be resolved to any taxon.
    pub fn unresolved_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.lca_taxid == UNRESOLVED)
            .count()
    }

    /// Generate the results CSV on demand
    pub fn get_results_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        write_results_csv(&self.records, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Generate the Krona text export on demand
    pub fn get_krona_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        write_krona_text(&self.hierarchy, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write_results<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        write_results_csv(&self.records, std::io::BufWriter::new(file))
    }

    pub fn write_krona<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        write_krona_text(&self.hierarchy, std::io::BufWriter::new(file))?;
        Ok(())
    }
}

/// Default results path for a blast table: `<blast>_Results.csv`.
pub fn default_results_path<P: AsRef<Path>>(blast_path: P) -> PathBuf {
    let mut name = blast_path.as_ref().as_os_str().to_owned();
    name.push("_Results.csv");
    PathBuf::from(name)
}

/// Refine a blast table into one LCA call per query.
pub fn refine_hits<P: AsRef<Path>>(blast_path: P, config: &RefineConfig) -> Result<RefinementResults> {
    // 1. Taxonomy
    let store = TaxonomyStore::load(&config.taxonomy_path)?;

    // 2. Best hits
    let hits = parse_blast(blast_path)?;

    match config.threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            Ok(pool.install(|| refine_with_store(hits, &store, config.climb_bound)))
        }
        None => Ok(refine_with_store(hits, &store, config.climb_bound)),
    }
}

/// The in-memory part of the pipeline, for callers holding parsed hits and a store.
pub fn refine_with_store(
    hits: Vec<types::AlignmentHit>,
    store: &TaxonomyStore,
    climb_bound: usize,
) -> RefinementResults {
    let best = select_best_per_query(hits);

    // 3. Lineage of every taxid referenced by a best hit
    let lineages = LineageCache::new(store, climb_bound);
    lineages.populate(best.iter().map(|h| h.taxid.as_str()));

    // 4. LCA over each tie set
    let groups = group_by_query(&best);
    let lca_by_query: AHashMap<String, String> = resolve_all(&groups, &lineages).into_iter().collect();

    // 5. One record per query, lineage taken from the LCA
    let records = finalize(&best, &lca_by_query, &lineages);

    let results = RefinementResults::from_records(records);
    log::info!(
        "Finalized {} queries ({} unresolved) into {} lineage paths",
        results.records.len(),
        results.unresolved_count(),
        results.hierarchy.len()
    );
    results
}
