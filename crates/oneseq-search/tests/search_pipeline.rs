//! End-to-end pipeline test on a synthetic three-taxon data root.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

use oneseq_common::fasta::{self, FastaRecord};
use oneseq_data::DataRoot;
use oneseq_search::{run_search, SearchJob};
use oneseq_test_utils::{diverge, unrelated, TestDataRoot, SEED_SEQ};

/// Human carries the seed, mouse and yeast carry diverged orthologs, every
/// taxon carries an unrelated decoy of the same length.
fn fixture() -> (TestDataRoot, PathBuf) {
    let fixture = TestDataRoot::new().unwrap();
    fixture.write_default_taxonomy().unwrap();

    let decoy = unrelated(SEED_SEQ.len());
    fixture
        .add_taxon("HUMAN@9606@3", &[("seedp", SEED_SEQ), ("hdecoy", decoy.as_str())])
        .unwrap();
    let mouse_ortholog = diverge(SEED_SEQ, 7);
    fixture
        .add_taxon("MOUSE@10090@1", &[("mortho", mouse_ortholog.as_str()), ("mdecoy", decoy.as_str())])
        .unwrap();
    let yeast_ortholog = diverge(SEED_SEQ, 5);
    fixture
        .add_taxon("YEAST@559292@1", &[("yortho", yeast_ortholog.as_str()), ("ydecoy", decoy.as_str())])
        .unwrap();

    let seed_path = fixture.path().join("seed.fa");
    fasta::write_file(&seed_path, &[FastaRecord::new("seedp", SEED_SEQ.as_bytes().to_vec())])
        .unwrap();
    (fixture, seed_path)
}

fn job(fixture: &TestDataRoot, seed_path: PathBuf) -> SearchJob {
    SearchJob {
        seed_path,
        seed_id: Some("seedp".to_string()),
        group_name: Some("grp".to_string()),
        ref_taxon: "HUMAN@9606@3".parse().unwrap(),
        output_dir: fixture.path().join("out"),
        workers: 1,
        ..SearchJob::default()
    }
}

#[tokio::test]
async fn test_search_finds_planted_orthologs() {
    let (fixture, seed_path) = fixture();
    let job = job(&fixture, seed_path);
    let out_dir = job.output_dir.clone();

    let result = run_search(job, fixture.root(), None).await.unwrap();

    assert!(result.errors.is_empty(), "per-taxon errors: {:?}", result.errors);
    assert_eq!(result.taxa_searched, 3);
    // Seed plus the mouse member; yeast is beyond the kingdom cutoff.
    assert_eq!(result.core_members, 2);
    assert!(result.orthologs_accepted >= 3);

    let fasta_text = std::fs::read_to_string(out_dir.join("grp.extended.fa")).unwrap();
    assert!(fasta_text.contains(">grp|HUMAN@9606@3|seedp|1"));
    assert!(fasta_text.contains(">grp|MOUSE@10090@1|mortho|1"));
    assert!(fasta_text.contains(">grp|YEAST@559292@1|yortho|1"));
    assert!(!fasta_text.contains("decoy"));

    let profile_text = std::fs::read_to_string(out_dir.join("grp.phyloprofile")).unwrap();
    let mut lines = profile_text.lines();
    assert_eq!(lines.next(), Some("geneID\tncbiID\torthoID\tFAS_F\tFAS_R"));
    assert!(profile_text.contains("ncbi10090"));
    assert!(profile_text.contains("ncbi559292"));
    // Self-comparison of the seed scores a full FAS of 1.
    let seed_row = profile_text
        .lines()
        .find(|l| l.contains("|seedp|"))
        .expect("seed row present");
    assert!(seed_row.ends_with("1.0000\t1.0000"), "unexpected row: {seed_row}");

    for suffix in ["_forward.domains", "_reverse.domains"] {
        let text = std::fs::read_to_string(out_dir.join(format!("grp{suffix}"))).unwrap();
        assert!(text.starts_with("pairID\torthoID\tseqLen\tfeature\tstart\tend\tweight\tpathFlag"));
    }
}

#[tokio::test]
async fn test_search_emits_progress_and_reuses_core() {
    let (fixture, seed_path) = fixture();
    let (tx, mut rx) = broadcast::channel(64);

    let first = run_search(job(&fixture, seed_path.clone()), fixture.root(), Some(tx.clone()))
        .await
        .unwrap();
    assert!(first.orthologs_accepted >= 3);

    let mut stages = Vec::new();
    while let Ok(event) = rx.try_recv() {
        stages.push(event.stage);
    }
    assert!(stages.iter().any(|s| s == "core"));
    assert!(stages.iter().any(|s| s == "search"));
    assert!(stages.iter().any(|s| s == "output"));

    // The stored group is picked up on the second run.
    let second = run_search(job(&fixture, seed_path), fixture.root(), None).await.unwrap();
    assert_eq!(second.core_members, first.core_members);
    assert_eq!(second.orthologs_accepted, first.orthologs_accepted);
}

#[tokio::test]
async fn test_search_restricted_taxa_and_no_fas() {
    let (fixture, seed_path) = fixture();
    let mut job = job(&fixture, seed_path);
    job.fas = false;
    job.search_taxa = Some(vec!["MOUSE@10090@1".parse().unwrap()]);
    job.output_dir = fixture.path().join("out_mouse");
    let out_dir = job.output_dir.clone();

    let result = run_search(job, fixture.root(), None).await.unwrap();
    assert_eq!(result.taxa_searched, 1);

    let profile_text = std::fs::read_to_string(out_dir.join("grp.phyloprofile")).unwrap();
    let row = profile_text.lines().nth(1).expect("one data row");
    assert!(row.starts_with("grp\tncbi10090\t"));
    assert!(row.ends_with("NA\tNA"));
}

#[tokio::test]
async fn test_missing_reference_taxon_fails() {
    let fixture = TestDataRoot::new().unwrap();
    fixture.write_default_taxonomy().unwrap();
    fixture.add_taxon("MOUSE@10090@1", &[("p1", SEED_SEQ)]).unwrap();
    let seed_path = fixture.path().join("seed.fa");
    fasta::write_file(&seed_path, &[FastaRecord::new("seedp", SEED_SEQ.as_bytes().to_vec())])
        .unwrap();

    let job = job(&fixture, seed_path);
    let err = run_search(job, fixture.root(), None).await.unwrap_err();
    assert!(format!("{err:#}").contains("HUMAN@9606@3"));
}

#[tokio::test]
async fn test_open_rejects_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(DataRoot::open(dir.path()).is_err());
}
