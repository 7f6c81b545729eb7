//! Core ortholog group compilation.
//!
//! The seed alone is a weak query; the core group broadens it with orthologs
//! from taxonomically informative species before the real search starts.
//! Candidate core taxa are ranked by descending rank distance from the
//! reference (most informative first); each accepted member is folded into
//! the profile before the next taxon is tried.

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info, warn};

use oneseq_align::SequenceProfile;
use oneseq_common::fasta::{self, FastaRecord};
use oneseq_common::taxon::TaxonSpec;
use oneseq_data::{CoreGroupRepository, DataRoot};
use oneseq_taxonomy::TaxonomyTable;

use crate::backend::{is_reciprocal, profile_hits, TaxonData};
use crate::job::SearchJob;

#[derive(Debug, Clone)]
pub struct CoreMember {
    pub taxon: TaxonSpec,
    pub record: FastaRecord,
}

#[derive(Debug, Clone)]
pub struct CoreGroup {
    pub name: String,
    pub seed: FastaRecord,
    pub ref_taxon: TaxonSpec,
    /// Recruited members, seed excluded.
    pub members: Vec<CoreMember>,
    pub profile: SequenceProfile,
}

impl CoreGroup {
    /// Group FASTA records; ids carry the member taxon as `TAXSPEC|protid`
    /// so a stored group can be reloaded with its taxa intact.
    pub fn to_records(&self) -> Vec<FastaRecord> {
        let mut records =
            vec![FastaRecord::new(format!("{}|{}", self.ref_taxon, self.seed.id), self.seed.seq.clone())];
        for m in &self.members {
            records.push(FastaRecord::new(
                format!("{}|{}", m.taxon, m.record.id),
                m.record.seq.clone(),
            ));
        }
        records
    }

    fn from_records(name: &str, records: Vec<FastaRecord>, profile: SequenceProfile) -> Result<Self> {
        let mut iter = records.into_iter();
        let seed_rec = iter.next().ok_or_else(|| anyhow!("core group {name} is empty"))?;
        let (ref_taxon, seed) = split_member_id(&seed_rec)?;
        let mut members = Vec::new();
        for rec in iter {
            let (taxon, record) = split_member_id(&rec)?;
            members.push(CoreMember { taxon, record });
        }
        Ok(Self { name: name.to_string(), seed, ref_taxon, members, profile })
    }

    /// Taxa whose proteomes vouch for the group: reference plus members.
    pub fn member_taxa(&self) -> Vec<TaxonSpec> {
        let mut taxa = vec![self.ref_taxon.clone()];
        for m in &self.members {
            if !taxa.contains(&m.taxon) {
                taxa.push(m.taxon.clone());
            }
        }
        taxa
    }
}

fn split_member_id(rec: &FastaRecord) -> Result<(TaxonSpec, FastaRecord)> {
    let (taxon, id) = rec
        .id
        .split_once('|')
        .ok_or_else(|| anyhow!("malformed core member id '{}'", rec.id))?;
    Ok((
        taxon.parse()?,
        FastaRecord { id: id.to_string(), desc: rec.desc.clone(), seq: rec.seq.clone() },
    ))
}

/// Reads the seed protein from the job's FASTA file.
pub fn load_seed(job: &SearchJob) -> Result<FastaRecord> {
    let records = fasta::read_file(&job.seed_path)
        .with_context(|| format!("reading seed file {}", job.seed_path.display()))?;
    match &job.seed_id {
        Some(id) => records
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| anyhow!("seed id '{id}' not found in {}", job.seed_path.display())),
        None => records
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} holds no sequences", job.seed_path.display())),
    }
}

/// Compiles (or reloads) the core group for a job.
///
/// Pure CPU + filesystem work; the pipeline calls this under
/// `spawn_blocking`.
pub fn compile_core(
    root: &DataRoot,
    job: &SearchJob,
    taxonomy: &TaxonomyTable,
    group_name: &str,
    seed: &FastaRecord,
) -> Result<CoreGroup> {
    let repo = CoreGroupRepository::new(root.clone());
    if repo.exists(group_name) && !job.force_core {
        info!(group = group_name, "reusing existing core group");
        let records = repo.load_members(group_name)?;
        let profile = repo.load_profile(group_name)?;
        return CoreGroup::from_records(group_name, records, profile);
    }

    let registered = root.list_taxa()?;
    if !registered.contains(&job.ref_taxon) {
        bail!("reference taxon {} is not registered", job.ref_taxon);
    }

    // Candidate core taxa, most distant rank first, stable by code.
    let mut candidates: Vec<(TaxonSpec, oneseq_taxonomy::TaxRank)> = Vec::new();
    for taxon in &registered {
        if taxon == &job.ref_taxon {
            continue;
        }
        match taxonomy.rank_distance(job.ref_taxon.ncbi_id, taxon.ncbi_id) {
            Ok(dist) if dist >= job.core.min_dist && dist <= job.core.max_dist => {
                candidates.push((taxon.clone(), dist));
            }
            Ok(_) => {}
            Err(e) => warn!(taxon = %taxon, "no rank distance to reference: {e}"),
        }
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.code.cmp(&b.0.code)));

    let mut group = CoreGroup {
        name: group_name.to_string(),
        seed: seed.clone(),
        ref_taxon: job.ref_taxon.clone(),
        members: Vec::new(),
        profile: SequenceProfile::build(seed, &[]),
    };
    let reference = TaxonData::load(root, &job.ref_taxon)?;

    for (taxon, dist) in candidates {
        if 1 + group.members.len() >= job.core.size {
            break;
        }
        let data = match TaxonData::load(root, &taxon) {
            Ok(data) => data,
            Err(e) => {
                warn!(taxon = %taxon, "core candidate unusable: {e:#}");
                continue;
            }
        };
        let hits = profile_hits(&group.profile, &data, job.search.accept_threshold);
        let Some(best) = hits.first() else {
            debug!(taxon = %taxon, "no hit above threshold");
            continue;
        };
        let record = data.records[best.record_index].clone();
        if !is_reciprocal(&record.seq, &reference, seed, &job.search) {
            debug!(taxon = %taxon, id = %record.id, "best hit is not reciprocal");
            continue;
        }
        info!(taxon = %taxon, id = %record.id, rank = %dist, norm = best.norm_score, "core member recruited");
        group.members.push(CoreMember { taxon, record });
        let member_records: Vec<FastaRecord> =
            group.members.iter().map(|m| m.record.clone()).collect();
        group.profile = SequenceProfile::build(seed, &member_records);
    }

    repo.save(group_name, &group.to_records(), &group.profile)?;
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_records_roundtrip() {
        let seed = FastaRecord::new("seedprot", b"MKVLLTAEWQRSDD".to_vec());
        let member = FastaRecord::new("m1", b"MKVLLTAEWQRSDE".to_vec());
        let group = CoreGroup {
            name: "grp".to_string(),
            seed: seed.clone(),
            ref_taxon: "HUMAN@9606@3".parse().unwrap(),
            members: vec![CoreMember { taxon: "MOUSE@10090@1".parse().unwrap(), record: member }],
            profile: SequenceProfile::build(&seed, &[]),
        };
        let records = group.to_records();
        assert_eq!(records[0].id, "HUMAN@9606@3|seedprot");
        assert_eq!(records[1].id, "MOUSE@10090@1|m1");

        let back = CoreGroup::from_records("grp", records, group.profile.clone()).unwrap();
        assert_eq!(back.seed.id, "seedprot");
        assert_eq!(back.ref_taxon.to_string(), "HUMAN@9606@3");
        assert_eq!(back.members.len(), 1);
        assert_eq!(back.members[0].taxon.to_string(), "MOUSE@10090@1");
        assert_eq!(
            back.member_taxa(),
            vec!["HUMAN@9606@3".parse().unwrap(), "MOUSE@10090@1".parse().unwrap()]
        );
    }
}
