//! The oneSeq search pipeline.
//!
//! Orchestrates the full flow for one job:
//!   1. Load the seed protein and the taxonomy table
//!   2. Compile (or reuse) the core ortholog group
//!   3. Search every selected target proteome with the group profile
//!   4. Confirm candidate hits by reciprocity against the reference
//!   5. Pick the representative ortholog and its co-orthologs per taxon
//!   6. Score accepted orthologs against the seed by FAS
//!   7. Write the phyloprofile, extended FASTA, and domains tables
//!
//! Per-taxon failures are collected into the result, not raised; progress
//! events go out over a broadcast channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use oneseq_annotation::{annotate_record, Architecture};
use oneseq_common::taxon::TaxonSpec;
use oneseq_data::{AnnotationRepository, DataRoot};
use oneseq_fas::{FasConfig, FasScorer, WeightMode};
use oneseq_profile::writers::{write_outputs, OrthologEntry, OutputPaths};

use crate::backend::{is_reciprocal, profile_hits, TaxonData};
use crate::core::{compile_core, load_seed, CoreGroup};
use crate::job::SearchJob;

// ── Progress events ───────────────────────────────────────────────────────────

/// Progress event emitted during a pipeline run (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct SearchProgress {
    pub job_id: Uuid,
    pub stage: String,
    pub taxon: Option<String>,
    pub message: String,
    pub orthologs: usize,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub job_id: Uuid,
    pub group: String,
    pub core_members: usize,
    pub taxa_searched: usize,
    pub orthologs_accepted: usize,
    pub rejected_below_threshold: usize,
    pub rejected_not_reciprocal: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
    pub output_dir: PathBuf,
}

// ── Per-taxon outcome (internal) ──────────────────────────────────────────────

struct TaxonOutcome {
    entries: Vec<OrthologEntry>,
    rejected_below_threshold: usize,
    rejected_not_reciprocal: usize,
}

/// Shared read-only state for the per-taxon workers.
struct SearchContext {
    root: DataRoot,
    job: SearchJob,
    group: CoreGroup,
    seed_arch: Architecture,
    /// Reference taxon data for reciprocity.
    reference: TaxonData,
    /// Core member taxa data, loaded only in strict mode.
    strict_targets: Vec<(TaxonData, oneseq_common::fasta::FastaRecord)>,
    weights: WeightMode,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Runs one search job end to end and writes the outputs.
///
/// Only environmental failures (missing data root, unreadable seed or
/// taxonomy) abort; anything going wrong inside a single taxon is logged,
/// counted, and reported in `errors`.
#[instrument(skip(job, root, progress_tx), fields(group))]
pub async fn run_search(
    job: SearchJob,
    root: DataRoot,
    progress_tx: Option<broadcast::Sender<SearchProgress>>,
) -> Result<SearchResult> {
    let job_id = Uuid::new_v4();
    let t0 = std::time::Instant::now();
    job.validate()?;

    let emit = |stage: &str, taxon: Option<&TaxonSpec>, message: String, orthologs: usize| {
        if let Some(tx) = &progress_tx {
            let _ = tx.send(SearchProgress {
                job_id,
                stage: stage.to_string(),
                taxon: taxon.map(|t| t.to_string()),
                message,
                orthologs,
            });
        }
    };

    let seed = load_seed(&job)?;
    let group_name = job.group_name.clone().unwrap_or_else(|| seed.id.clone());
    tracing::Span::current().record("group", group_name.as_str());
    info!(job_id = %job_id, group = %group_name, seed = %seed.id, "starting ortholog search");

    let taxonomy = root.load_taxonomy().context("loading taxonomy table")?;

    // ── Core compilation ─────────────────────────────────────────────────────
    emit("core", None, format!("compiling core group {group_name}"), 0);
    let group = {
        let root = root.clone();
        let job = job.clone();
        let name = group_name.clone();
        let seed = seed.clone();
        tokio::task::spawn_blocking(move || compile_core(&root, &job, &taxonomy, &name, &seed))
            .await
            .context("core compilation task failed")??
    };
    info!(members = 1 + group.members.len(), "core group ready");
    emit("core", None, format!("core group has {} members", 1 + group.members.len()), 0);

    // ── Shared search context ────────────────────────────────────────────────
    let registered = root.list_taxa()?;
    let targets: Vec<TaxonSpec> = match &job.search_taxa {
        Some(taxa) => taxa.clone(),
        None => registered.clone(),
    };

    let (seed_arch, weights) = load_seed_architecture(&root, &job, &seed);
    let context = {
        let root_clone = root.clone();
        let job_clone = job.clone();
        let group_clone = group.clone();
        tokio::task::spawn_blocking(move || -> Result<SearchContext> {
            let reference = TaxonData::load(&root_clone, &job_clone.ref_taxon)?;
            let mut strict_targets = Vec::new();
            if job_clone.search.strict {
                for member in &group_clone.members {
                    let data = TaxonData::load(&root_clone, &member.taxon)?;
                    strict_targets.push((data, member.record.clone()));
                }
            }
            Ok(SearchContext {
                root: root_clone,
                job: job_clone,
                group: group_clone,
                seed_arch,
                reference,
                strict_targets,
                weights,
            })
        })
        .await
        .context("loading search context failed")??
    };
    let context = Arc::new(context);

    // ── Fan out per taxon ────────────────────────────────────────────────────
    let workers = if job.workers == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    } else {
        job.workers
    };
    let mut result = SearchResult {
        job_id,
        group: group_name.clone(),
        core_members: 1 + group.members.len(),
        taxa_searched: 0,
        orthologs_accepted: 0,
        rejected_below_threshold: 0,
        rejected_not_reciprocal: 0,
        errors: Vec::new(),
        duration_ms: 0,
        output_dir: job.output_dir.clone(),
    };

    let outcomes: Vec<(TaxonSpec, Result<TaxonOutcome>)> = stream::iter(targets)
        .map(|taxon| {
            let ctx = Arc::clone(&context);
            async move {
                let spec = taxon.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || search_taxon(&ctx, &taxon)).await;
                let outcome = match outcome {
                    Ok(r) => r,
                    Err(join) => Err(anyhow::anyhow!("worker panicked: {join}")),
                };
                (spec, outcome)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut entries: Vec<OrthologEntry> = Vec::new();
    for (taxon, outcome) in outcomes {
        result.taxa_searched += 1;
        match outcome {
            Ok(out) => {
                emit(
                    "search",
                    Some(&taxon),
                    format!("{} ortholog(s)", out.entries.len()),
                    out.entries.len(),
                );
                result.orthologs_accepted += out.entries.len();
                result.rejected_below_threshold += out.rejected_below_threshold;
                result.rejected_not_reciprocal += out.rejected_not_reciprocal;
                entries.extend(out.entries);
            }
            Err(e) => {
                let msg = format!("{taxon}: {e:#}");
                warn!("{msg}");
                result.errors.push(msg);
            }
        }
    }

    // Stable output order: taxon, representative first, then id.
    entries.sort_by(|a, b| {
        a.taxon
            .cmp(&b.taxon)
            .then(b.representative.cmp(&a.representative))
            .then(a.protein_id.cmp(&b.protein_id))
    });

    emit("output", None, "writing outputs".to_string(), result.orthologs_accepted);
    let paths: OutputPaths = {
        let dir = job.output_dir.clone();
        let group_name = group_name.clone();
        tokio::task::spawn_blocking(move || write_outputs(&dir, &group_name, &group_name, &entries))
            .await
            .context("output task failed")??
    };
    info!(
        orthologs = result.orthologs_accepted,
        taxa = result.taxa_searched,
        profile = %paths.phyloprofile.display(),
        "search finished"
    );

    result.duration_ms = t0.elapsed().as_millis() as u64;
    Ok(result)
}

/// Seed architecture and FAS weights from the reference annotation, falling
/// back to on-the-fly annotation and uniform weights.
fn load_seed_architecture(
    root: &DataRoot,
    job: &SearchJob,
    seed: &oneseq_common::fasta::FastaRecord,
) -> (Architecture, WeightMode) {
    let repo = AnnotationRepository::new(root.clone());
    match repo.load(&job.ref_taxon) {
        Ok(anno) => {
            let arch = anno
                .architectures
                .get(&seed.id)
                .cloned()
                .unwrap_or_else(|| annotate_record(seed));
            (arch, WeightMode::ReferenceCounts(anno.feature_counts))
        }
        Err(e) => {
            warn!("no reference annotation, using uniform FAS weights: {e}");
            (annotate_record(seed), WeightMode::Uniform)
        }
    }
}

/// Searches one taxon. Blocking: alignment DP plus repository reads.
fn search_taxon(ctx: &SearchContext, taxon: &TaxonSpec) -> Result<TaxonOutcome> {
    let data = TaxonData::load(&ctx.root, taxon)?;
    let opts = &ctx.job.search;

    // Score everything the prefilter surfaces, then split on the threshold.
    let all_hits = profile_hits(&ctx.group.profile, &data, 0.0);
    let mut outcome = TaxonOutcome {
        entries: Vec::new(),
        rejected_below_threshold: 0,
        rejected_not_reciprocal: 0,
    };

    let mut accepted = Vec::new();
    for hit in all_hits {
        if hit.norm_score < opts.accept_threshold {
            outcome.rejected_below_threshold += 1;
            continue;
        }
        let record = &data.records[hit.record_index];
        let reciprocal = is_reciprocal(&record.seq, &ctx.reference, &ctx.group.seed, opts)
            && ctx
                .strict_targets
                .iter()
                .all(|(core_data, member)| is_reciprocal(&record.seq, core_data, member, opts));
        if reciprocal {
            accepted.push(hit);
        } else {
            outcome.rejected_not_reciprocal += 1;
        }
    }

    let Some(representative) = accepted.first().cloned() else {
        return Ok(outcome);
    };

    let annotation = AnnotationRepository::new(ctx.root.clone()).load(taxon).ok();
    let scorer = ctx.job.fas.then(|| {
        FasScorer::new(FasConfig { weights: ctx.weights.clone(), ..FasConfig::default() })
    });

    for hit in &accepted {
        let is_rep = hit.record_index == representative.record_index;
        if !is_rep {
            if opts.representative_only {
                continue;
            }
            if hit.raw_score < opts.coortholog_factor * representative.raw_score {
                continue;
            }
        }
        let record = &data.records[hit.record_index];
        let mut entry = OrthologEntry {
            taxon: taxon.clone(),
            protein_id: record.id.clone(),
            seq: record.seq.clone(),
            representative: is_rep,
            fas_forward: None,
            fas_reverse: None,
            forward_rows: Vec::new(),
            reverse_rows: Vec::new(),
        };
        if let Some(scorer) = &scorer {
            let arch = annotation
                .as_ref()
                .and_then(|a| a.architectures.get(&record.id).cloned())
                .unwrap_or_else(|| annotate_record(record));
            let scores = scorer.score_pair(&ctx.seed_arch, &arch);
            entry.fas_forward = Some(scores.forward.score);
            entry.fas_reverse = Some(scores.reverse.score);
            entry.forward_rows = scores.forward.rows;
            entry.reverse_rows = scores.reverse.rows;
        }
        outcome.entries.push(entry);
    }
    Ok(outcome)
}
