//src/types.rs

use serde::{Deserialize, Serialize};

/// Sentinel written wherever no taxon could be resolved.
pub const UNRESOLVED: &str = "None";

/// Sentinel taxon id for a missing or unparseable taxid field in the blast table.
pub const MISSING_TAXID: &str = "nan";

/// One row of the BLAST tabular output (`-outfmt "6 ... staxids"`).
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_id: String,
    pub target_id: String,
    pub pident: f64,
    pub length: u64,
    pub mismatch: u64,
    pub gapopen: u64,
    pub qstart: u64,
    pub qend: u64,
    pub sstart: u64,
    pub send: u64,
    pub evalue: f64,
    pub bitscore: f64,
    /// First `;`-delimited taxon id, or `"nan"`.
    pub taxid: String,
}

/// One finalized call per query. Lineage fields hold scientific names of the
/// LCA lineage; `species_name` is taken from the representative hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedRecord {
    #[serde(rename = "qseqid")]
    pub query_id: String,
    pub bitscore: f64,
    #[serde(rename = "taxid_LCA")]
    pub lca_taxid: String,
    #[serde(rename = "SpeciesName")]
    pub species_name: String,
    #[serde(rename = "Strain")]
    pub strain: String,
    #[serde(rename = "Species")]
    pub species: String,
    #[serde(rename = "Genus")]
    pub genus: String,
    #[serde(rename = "Family")]
    pub family: String,
    #[serde(rename = "Order")]
    pub order: String,
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Phylum")]
    pub phylum: String,
    #[serde(rename = "Superkingdom")]
    pub superkingdom: String,
}

impl FinalizedRecord {
    /// The (superkingdom, phylum, class, order, family, genus, species) path.
    pub fn hierarchy_path(&self) -> [String; 7] {
        [
            self.superkingdom.clone(),
            self.phylum.clone(),
            self.class.clone(),
            self.order.clone(),
            self.family.clone(),
            self.genus.clone(),
            self.species.clone(),
        ]
    }
}

/// A lineage path (coarsest first) and how many queries landed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyCount {
    pub count: usize,
    pub path: [String; 7],
}
