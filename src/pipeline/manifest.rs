use std::{collections::BTreeMap, fs::File, io::{BufReader, Read}, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RiskConfig;
use crate::network::Stage;

/// File name of the manifest inside an output directory.
pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
    pub bytes: u64,
}

/// Index of an output directory: what was produced, from what settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub version: String,
    /// CRS of every written geometry.
    pub crs: String,
    /// Metric CRS used for distance work.
    pub projection: String,
    /// Last stage whose attributes are present in the newest artifact.
    pub stage: Option<Stage>,
    pub seed: Option<u64>,
    pub config: RiskConfig,
    pub counts: BTreeMap<String, usize>,
    pub files: BTreeMap<String, FileHash>,
}

impl Manifest {
    /// Describe `dir`, hashing every file of `names` that exists in it.
    pub(crate) fn new(
        dir: &Path,
        names: &[&str],
        projection: &str,
        stage: Option<Stage>,
        seed: Option<u64>,
        config: &RiskConfig,
        counts: BTreeMap<&'static str, usize>,
    ) -> Result<Self> {
        let mut files = BTreeMap::new();
        for name in names {
            if dir.join(name).is_file() {
                let (key, hash) = sha256_file(name, dir)?;
                files.insert(key, hash);
            }
        }

        Ok(Self {
            run_id: dir.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown-run")
                .to_string(),
            version: env!("CARGO_PKG_VERSION").into(),
            crs: "EPSG:4326".into(),
            projection: projection.into(),
            stage,
            seed,
            config: config.clone(),
            counts: counts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            files,
        })
    }

    /// Read `manifest.json` from an output directory.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_NAME);
        let file = File::open(&path)
            .with_context(|| format!("[pipeline::manifest] Failed to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[pipeline::manifest] Failed to parse {}", path.display()))
    }

    /// Recompute the hash of every listed file and return the names that no longer match.
    pub fn verify(&self, dir: &Path) -> Result<Vec<String>> {
        let mut stale = Vec::new();
        for (name, expected) in &self.files {
            if !dir.join(name).is_file() {
                stale.push(name.clone());
                continue;
            }
            let (_, actual) = sha256_file(name, dir)?;
            if &actual != expected { stale.push(name.clone()); }
        }
        Ok(stale)
    }
}

/// Computes the SHA-256 hash and size of a file located at `root/rel_path`.
pub(crate) fn sha256_file(rel_path: &str, root: &Path) -> Result<(String, FileHash)> {
    let full = root.join(rel_path);
    let mut file = File::open(&full)
        .with_context(|| format!("[pipeline::manifest] open for hash {}", full.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    let mut bytes = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes += n as u64;
    }
    let sha256 = hex::encode(hasher.finalize());
    Ok((rel_path.to_string(), FileHash { sha256, bytes }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_existing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let manifest = Manifest::new(
            dir.path(), &["a.txt", "missing.txt"], "identity", None, Some(7), &RiskConfig::default(), BTreeMap::new(),
        ).unwrap();

        assert_eq!(manifest.files.len(), 1);
        let hash = &manifest.files["a.txt"];
        assert_eq!(hash.sha256, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(hash.bytes, 3);
        assert_eq!(manifest.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn verify_reports_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        let manifest = Manifest::new(
            dir.path(), &["a.txt"], "identity", None, None, &RiskConfig::default(), BTreeMap::new(),
        ).unwrap();
        assert!(manifest.verify(dir.path()).unwrap().is_empty());

        std::fs::write(dir.path().join("a.txt"), b"abd").unwrap();
        assert_eq!(manifest.verify(dir.path()).unwrap(), vec!["a.txt".to_string()]);
    }
}
