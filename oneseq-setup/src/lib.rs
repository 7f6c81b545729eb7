//! Library half of `setup1s`: checksum verification, archive unpacking, and
//! the offline install path. Everything here works without network access so
//! it can be tested against local fixtures.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use tar::Archive;
use tracing::{info, warn};

use oneseq_data::layout::{CORE_DIR, GENOME_DIR, SEARCH_DIR, TAXONOMY_FILE, WEIGHT_DIR};
use oneseq_data::DataRoot;

/// Directories a complete data package must provide.
pub const EXPECTED_DIRS: &[&str] = &[GENOME_DIR, SEARCH_DIR, WEIGHT_DIR, CORE_DIR];

// ── Scratch directory ─────────────────────────────────────────────────────────

/// Download scratch next to the install target, so the archive and the
/// install land on the same filesystem. Removed on drop, so a failed
/// download or checksum mismatch does not leave partial files behind.
#[derive(Debug)]
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn create(data_root: &Path) -> Result<Self> {
        let parent = data_root.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent.join(".oneseq-setup-tmp")
            }
            None => PathBuf::from(".oneseq-setup-tmp"),
        };
        std::fs::create_dir_all(&dir)?;
        Ok(Self(dir))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

// ── Checksums ─────────────────────────────────────────────────────────────────

/// SHA-256 of a file, as lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compares the archive digest against an expected hex string.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = file_sha256(path)?;
    let expected = expected.trim().to_ascii_lowercase();
    if actual != expected {
        bail!(
            "checksum mismatch for {}: expected {expected}, got {actual}",
            path.display()
        );
    }
    Ok(())
}

/// First token of a `.sha256` sidecar file (`<hex>  <filename>` format).
pub fn parse_sidecar(text: &str) -> Option<String> {
    text.split_whitespace().next().map(str::to_string)
}

// ── Archive handling ──────────────────────────────────────────────────────────

/// Unpacks a `.tar.gz` into `dest`, rejecting entries that would escape it.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    std::fs::create_dir_all(dest)?;

    let mut unpacked = 0;
    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let escapes = path.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            bail!("archive entry escapes the target directory: {}", path.display());
        }
        if entry.unpack_in(dest)? {
            unpacked += 1;
        } else {
            warn!(entry = %path.display(), "skipped unsafe archive entry");
        }
    }
    Ok(unpacked)
}

/// Unpacks a verified archive into the data root and checks the layout.
pub fn install_from_archive(archive: &Path, data_root: &Path, force: bool) -> Result<DataRoot> {
    if data_root.join(GENOME_DIR).exists() && !force {
        bail!(
            "{} already holds installed data (re-run with --force to replace it)",
            data_root.display()
        );
    }
    let entries = unpack_archive(archive, data_root)?;
    info!(entries, root = %data_root.display(), "package unpacked");

    for dir in EXPECTED_DIRS {
        if !data_root.join(dir).is_dir() {
            bail!("package is incomplete: missing {dir}/ under {}", data_root.display());
        }
    }
    if !data_root.join(TAXONOMY_FILE).is_file() {
        bail!("package is incomplete: missing {TAXONOMY_FILE}");
    }
    let root = DataRoot::open(data_root)?;
    root.ensure_layout()?;
    Ok(root)
}

// ── Download ──────────────────────────────────────────────────────────────────

/// Streams `url` to `dest` with a progress bar on stderr.
pub async fn download_package(url: &str, dest: &Path) -> Result<PathBuf> {
    let response = reqwest::get(url).await.with_context(|| format!("requesting {url}"))?;
    let response = response.error_for_status().with_context(|| format!("downloading {url}"))?;

    let bar = match response.content_length() {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "{prefix} [{bar:30}] {bytes}/{total_bytes} ({eta})",
            ) {
                bar.set_style(style);
            }
            bar
        }
        None => ProgressBar::new_spinner(),
    };
    bar.set_prefix("setup1s");

    let mut out = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk)?;
        bar.inc(chunk.len() as u64);
    }
    bar.finish_and_clear();
    Ok(dest.to_path_buf())
}

/// Fetches the `.sha256` sidecar next to the package URL, if the server has
/// one.
pub async fn fetch_sidecar_checksum(url: &str) -> Option<String> {
    let sidecar = format!("{url}.sha256");
    let response = reqwest::get(&sidecar).await.ok()?.error_for_status().ok()?;
    let text = response.text().await.ok()?;
    parse_sidecar(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn fixture_archive(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("package.tar.gz");
        let gz = GzEncoder::new(File::create(&path).unwrap(), Compression::fast());
        let mut tar = tar::Builder::new(gz);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            if header.set_path(name).is_ok() {
                header.set_cksum();
                tar.append_data(&mut header, name, content.as_bytes()).unwrap();
            } else {
                // `set_path` refuses `..`; write the raw name bytes so the
                // archive really contains the traversal entry.
                header.as_gnu_mut().unwrap().name[..name.len()]
                    .copy_from_slice(name.as_bytes());
                header.set_cksum();
                tar.append(&header, content.as_bytes()).unwrap();
            }
        }
        tar.into_inner().unwrap().finish().unwrap();
        path
    }

    fn data_package(dir: &Path) -> PathBuf {
        fixture_archive(
            dir,
            &[
                ("genome_dir/HUMAN@9606@3/HUMAN@9606@3.fa", ">p1\nMKWVTF\n"),
                ("search_dir/HUMAN@9606@3.idx.json", "{}"),
                ("weight_dir/HUMAN@9606@3.json", "{}"),
                ("core_orthologs/.keep", ""),
                ("taxonomy/nodes.tsv", "9606\t9605\tspecies\tHomo sapiens\n"),
            ],
        )
    }

    #[test]
    fn test_verify_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let archive = data_package(dir.path());
        let digest = file_sha256(&archive).unwrap();

        assert!(verify_checksum(&archive, &digest).is_ok());
        assert!(verify_checksum(&archive, &digest.to_uppercase()).is_ok());
        let flipped = if digest.ends_with('0') { "1" } else { "0" };
        let wrong = format!("{}{flipped}", &digest[..63]);
        assert!(verify_checksum(&archive, &wrong).is_err());
    }

    #[test]
    fn test_parse_sidecar_takes_first_token() {
        assert_eq!(parse_sidecar("abc123  package.tar.gz\n"), Some("abc123".to_string()));
        assert_eq!(parse_sidecar("   "), None);
    }

    #[test]
    fn test_install_from_archive_builds_data_root() {
        let dir = tempfile::tempdir().unwrap();
        let archive = data_package(dir.path());
        let target = dir.path().join("data");

        let root = install_from_archive(&archive, &target, false).unwrap();
        assert!(root.genome_dir().join("HUMAN@9606@3/HUMAN@9606@3.fa").is_file());
        assert!(root.taxonomy_file().is_file());

        // A second install without --force must refuse.
        assert!(install_from_archive(&archive, &target, false).is_err());
        assert!(install_from_archive(&archive, &target, true).is_ok());
    }

    #[test]
    fn test_incomplete_package_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_archive(dir.path(), &[("genome_dir/.keep", "")]);
        let err = install_from_archive(&archive, &dir.path().join("data"), false).unwrap_err();
        assert!(err.to_string().contains("incomplete"));
    }

    #[test]
    fn test_scratch_dir_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data");
        let scratch_path;
        {
            let scratch = ScratchDir::create(&target).unwrap();
            scratch_path = scratch.path().to_path_buf();
            assert_eq!(scratch_path.parent(), Some(dir.path()));
            // A failed download leaves a partial archive in the scratch.
            std::fs::write(scratch.path().join("partial.tar.gz"), "x").unwrap();
        }
        assert!(!scratch_path.exists());
    }

    #[test]
    fn test_traversal_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = fixture_archive(dir.path(), &[("../evil.txt", "x")]);
        assert!(unpack_archive(&archive, &dir.path().join("data")).is_err());
    }
}
