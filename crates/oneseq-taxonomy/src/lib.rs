//! oneseq-taxonomy — NCBI-style taxonomy table.
//!
//! The data root ships `taxonomy/nodes.tsv` with one node per line:
//! `tax_id <TAB> parent_id <TAB> rank <TAB> name`. The root node is its own
//! parent. The table answers the questions the core-compilation step asks:
//! lineage of a taxon, lowest common ancestor of two taxa, and the rank
//! distance between them.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use oneseq_common::error::{OneSeqError, Result};

/// Ranks ordered from most to least specific. `rank_distance` maps an LCA to
/// one of these; `Superkingdom` is the catch-all for anything above kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRank {
    Species,
    Genus,
    Family,
    Order,
    Class,
    Phylum,
    Kingdom,
    Superkingdom,
}

impl TaxRank {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "species" => Some(Self::Species),
            "genus" => Some(Self::Genus),
            "family" => Some(Self::Family),
            "order" => Some(Self::Order),
            "class" => Some(Self::Class),
            "phylum" => Some(Self::Phylum),
            "kingdom" => Some(Self::Kingdom),
            "superkingdom" | "domain" => Some(Self::Superkingdom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Genus => "genus",
            Self::Family => "family",
            Self::Order => "order",
            Self::Class => "class",
            Self::Phylum => "phylum",
            Self::Kingdom => "kingdom",
            Self::Superkingdom => "superkingdom",
        }
    }
}

impl fmt::Display for TaxRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: u32,
    rank: Option<TaxRank>,
    name: String,
}

/// In-memory taxonomy table keyed by NCBI taxonomy id.
#[derive(Debug, Default)]
pub struct TaxonomyTable {
    nodes: HashMap<u32, Node>,
}

impl TaxonomyTable {
    /// Parses `tax_id <TAB> parent_id <TAB> rank <TAB> name` lines.
    /// Ranks outside the eight canonical ones are kept as unranked.
    pub fn from_tsv(text: &str) -> Result<Self> {
        let mut nodes = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 4 {
                return Err(OneSeqError::Taxonomy(format!(
                    "line {}: expected 4 tab-separated fields, got {}",
                    lineno + 1,
                    fields.len()
                )));
            }
            let tax_id: u32 = fields[0].parse().map_err(|_| {
                OneSeqError::Taxonomy(format!("line {}: bad tax_id '{}'", lineno + 1, fields[0]))
            })?;
            let parent: u32 = fields[1].parse().map_err(|_| {
                OneSeqError::Taxonomy(format!("line {}: bad parent_id '{}'", lineno + 1, fields[1]))
            })?;
            nodes.insert(
                tax_id,
                Node {
                    parent,
                    rank: TaxRank::from_name(fields[2]),
                    name: fields[3].to_string(),
                },
            );
        }
        Ok(Self { nodes })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_tsv(&text)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, tax_id: u32) -> bool {
        self.nodes.contains_key(&tax_id)
    }

    pub fn name_of(&self, tax_id: u32) -> Option<&str> {
        self.nodes.get(&tax_id).map(|n| n.name.as_str())
    }

    pub fn rank_of(&self, tax_id: u32) -> Option<TaxRank> {
        self.nodes.get(&tax_id).and_then(|n| n.rank)
    }

    /// Path from the taxon to the root, inclusive on both ends.
    /// Returns an error for unknown ids or broken parent chains.
    pub fn lineage(&self, tax_id: u32) -> Result<Vec<u32>> {
        let mut path = Vec::new();
        let mut current = tax_id;
        loop {
            let node = self.nodes.get(&current).ok_or_else(|| {
                OneSeqError::Taxonomy(format!("unknown tax_id {current} in lineage of {tax_id}"))
            })?;
            path.push(current);
            if node.parent == current {
                return Ok(path);
            }
            if path.len() > self.nodes.len() {
                return Err(OneSeqError::Taxonomy(format!(
                    "cycle in parent chain of tax_id {tax_id}"
                )));
            }
            current = node.parent;
        }
    }

    /// Lowest common ancestor of two taxa.
    pub fn lca(&self, a: u32, b: u32) -> Result<u32> {
        let lineage_a = self.lineage(a)?;
        let lineage_b = self.lineage(b)?;
        let ancestors_b: std::collections::HashSet<u32> = lineage_b.into_iter().collect();
        lineage_a
            .into_iter()
            .find(|id| ancestors_b.contains(id))
            .ok_or_else(|| OneSeqError::Taxonomy(format!("no common ancestor of {a} and {b}")))
    }

    /// Rank of the lowest common ancestor of `a` and `b`. An unranked LCA
    /// maps to the rank of its next ranked ancestor.
    pub fn rank_distance(&self, a: u32, b: u32) -> Result<TaxRank> {
        let lca = self.lca(a, b)?;
        for id in self.lineage(lca)? {
            if let Some(rank) = self.rank_of(id) {
                return Ok(rank);
            }
        }
        // Nothing ranked all the way to the root.
        Ok(TaxRank::Superkingdom)
    }
}
