//! Single-file checkpoints of the field network parameters.
//!
//! Layout, all integers little endian:
//!
//! ```text
//! "PFVC" | u32 version | u32 header_len | JSON metadata | f32 values
//! ```
//!
//! Values follow [`ParameterSet::flatten`] order. Files are written to a
//! temporary file in the target directory and renamed into place, so a
//! checkpoint is either complete or absent.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, VesicleError};
use crate::field::ParameterSet;

/// File magic.
pub const CHECKPOINT_MAGIC: [u8; 4] = *b"PFVC";

/// Current format version.
pub const CHECKPOINT_VERSION: u32 = 1;

const PREAMBLE_LEN: usize = 12;

/// Checkpoint metadata stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Format version.
    pub version: u32,
    /// Optimizer steps behind these parameters.
    pub step: usize,
    /// Loss at the last step, if finite.
    pub loss: Option<f32>,
    /// Layer widths of the network.
    pub layer_dims: Vec<usize>,
    /// Number of stored values.
    pub parameter_count: usize,
    /// Constraint the parameters were trained under.
    pub constraint: String,
}

impl CheckpointMetadata {
    /// Metadata describing `params`.
    pub fn new(params: &ParameterSet, step: usize, loss: f32, constraint: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            step,
            loss: loss.is_finite().then_some(loss),
            layer_dims: params.layer_dims.clone(),
            parameter_count: params.parameter_count(),
            constraint: constraint.into(),
        }
    }
}

/// Atomically write `params` to `path`.
pub fn save_checkpoint(path: &Path, params: &ParameterSet, metadata: &CheckpointMetadata) -> Result<()> {
    params.validate().map_err(VesicleError::config)?;
    if metadata.layer_dims != params.layer_dims || metadata.parameter_count != params.parameter_count() {
        return Err(VesicleError::config(format!(
            "metadata describes {:?} ({} values) but parameters are {:?} ({} values)",
            metadata.layer_dims,
            metadata.parameter_count,
            params.layer_dims,
            params.parameter_count()
        )));
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let header = serde_json::to_vec(metadata).map_err(std::io::Error::from)?;
    let values = params.flatten();

    let mut bytes = Vec::with_capacity(PREAMBLE_LEN + header.len() + 4 * values.len());
    bytes.extend_from_slice(&CHECKPOINT_MAGIC);
    bytes.extend_from_slice(&CHECKPOINT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&header);
    for v in &values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log::info!(
        "Saved checkpoint to {:?} (step {}, {} parameters)",
        path,
        metadata.step,
        values.len()
    );
    Ok(())
}

/// Load a checkpoint written by [`save_checkpoint`].
///
/// Fails with [`VesicleError::CheckpointCorrupt`] unless the stored network
/// has exactly `expected_layer_dims`.
pub fn load_checkpoint(
    path: &Path,
    expected_layer_dims: &[usize],
) -> Result<(ParameterSet, CheckpointMetadata)> {
    if !path.is_file() {
        return Err(VesicleError::CheckpointNotFound {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path)?;
    let corrupt = |reason: String| VesicleError::corrupt(path, reason);

    if bytes.len() < PREAMBLE_LEN {
        return Err(corrupt(format!("{} bytes is shorter than the preamble", bytes.len())));
    }
    if bytes[0..4] != CHECKPOINT_MAGIC {
        return Err(corrupt("bad magic".to_string()));
    }
    let version = read_u32(&bytes[4..8]);
    if version != CHECKPOINT_VERSION {
        return Err(corrupt(format!("unsupported version {}", version)));
    }
    let header_len = read_u32(&bytes[8..12]) as usize;
    let header_end = PREAMBLE_LEN
        .checked_add(header_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| corrupt(format!("header length {} exceeds file size", header_len)))?;

    let metadata: CheckpointMetadata = serde_json::from_slice(&bytes[PREAMBLE_LEN..header_end])
        .map_err(|e| corrupt(format!("unreadable header: {}", e)))?;
    if metadata.version != version {
        return Err(corrupt(format!(
            "header version {} does not match preamble version {}",
            metadata.version, version
        )));
    }
    if metadata.layer_dims != expected_layer_dims {
        return Err(corrupt(format!(
            "network {:?} does not match configured network {:?}",
            metadata.layer_dims, expected_layer_dims
        )));
    }

    let payload = &bytes[header_end..];
    let expected_count = ParameterSet::count_for(expected_layer_dims);
    if metadata.parameter_count != expected_count {
        return Err(corrupt(format!(
            "header claims {} parameters, network has {}",
            metadata.parameter_count, expected_count
        )));
    }
    if payload.len() != 4 * expected_count {
        return Err(corrupt(format!(
            "payload holds {} bytes, expected {}",
            payload.len(),
            4 * expected_count
        )));
    }

    let values: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let params = ParameterSet::unflatten(expected_layer_dims, &values)
        .ok_or_else(|| corrupt("payload does not split into layers".to_string()))?;

    log::info!(
        "Loaded checkpoint from {:?} (step {}, constraint {})",
        path,
        metadata.step,
        metadata.constraint
    );
    Ok((params, metadata))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// True if `path` is a file starting with the checkpoint magic.
pub fn checkpoint_exists(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| magic == CHECKPOINT_MAGIC)
        .unwrap_or(false)
}

/// `dir/stage_N.ckpt`.
pub fn stage_checkpoint_path(dir: &Path, stage: usize) -> PathBuf {
    dir.join(format!("stage_{}.ckpt", stage))
}

/// The `stage_N.ckpt` in `dir` with the highest `N`.
pub fn find_latest_checkpoint(dir: &Path) -> Option<(usize, PathBuf)> {
    let entries = fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let stage = path
                .file_name()?
                .to_str()?
                .strip_prefix("stage_")?
                .strip_suffix(".ckpt")?
                .parse::<usize>()
                .ok()?;
            checkpoint_exists(&path).then_some((stage, path))
        })
        .max_by_key(|(stage, _)| *stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params() -> ParameterSet {
        let dims = [3, 4, 1];
        let values: Vec<f32> = (0..ParameterSet::count_for(&dims))
            .map(|i| (i as f32 * 0.37).sin() * 1e-3 + i as f32)
            .collect();
        ParameterSet::unflatten(&dims, &values).unwrap()
    }

    #[test]
    fn test_roundtrip_is_bit_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("stage_1.ckpt");
        let params = params();
        let metadata = CheckpointMetadata::new(&params, 120, 3.5, "volume=3.9");

        save_checkpoint(&path, &params, &metadata).unwrap();
        assert!(checkpoint_exists(&path));

        let (loaded, loaded_meta) = load_checkpoint(&path, &[3, 4, 1]).unwrap();
        assert_eq!(loaded_meta, metadata);
        let bits = |p: &ParameterSet| p.flatten().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&loaded), bits(&params));
    }

    #[test]
    fn test_non_finite_loss_is_omitted() {
        let metadata = CheckpointMetadata::new(&params(), 0, f32::NAN, "none");
        assert_eq!(metadata.loss, None);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.ckpt");
        assert!(!checkpoint_exists(&path));
        assert!(matches!(
            load_checkpoint(&path, &[3, 4, 1]),
            Err(VesicleError::CheckpointNotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_checkpoints() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stage_1.ckpt");
        let params = params();
        save_checkpoint(&path, &params, &CheckpointMetadata::new(&params, 1, 1.0, "none")).unwrap();
        let good = fs::read(&path).unwrap();

        let is_corrupt = |bytes: &[u8]| {
            fs::write(&path, bytes).unwrap();
            matches!(
                load_checkpoint(&path, &[3, 4, 1]),
                Err(VesicleError::CheckpointCorrupt { .. })
            )
        };

        assert!(is_corrupt(&good[..good.len() - 4]));
        let mut extra = good.clone();
        extra.extend_from_slice(&[0, 0, 0, 0]);
        assert!(is_corrupt(&extra));
        let mut magic = good.clone();
        magic[0] = b'X';
        assert!(is_corrupt(&magic));
        let mut version = good.clone();
        version[4] = 9;
        assert!(is_corrupt(&version));
        let mut header = good.clone();
        header[PREAMBLE_LEN] = b'#';
        assert!(is_corrupt(&header));
        assert!(is_corrupt(&good[..6]));

        fs::write(&path, &good).unwrap();
        assert!(matches!(
            load_checkpoint(&path, &[3, 20, 10, 1]),
            Err(VesicleError::CheckpointCorrupt { .. })
        ));
    }

    #[test]
    fn test_metadata_must_match_parameters() {
        let dir = TempDir::new().unwrap();
        let params = params();
        let mut metadata = CheckpointMetadata::new(&params, 0, 0.0, "none");
        metadata.layer_dims = vec![3, 5, 1];
        assert!(save_checkpoint(&dir.path().join("x.ckpt"), &params, &metadata).is_err());
    }

    #[test]
    fn test_find_latest_checkpoint() {
        let dir = TempDir::new().unwrap();
        let params = params();
        for stage in [0, 3, 1] {
            let path = stage_checkpoint_path(dir.path(), stage);
            save_checkpoint(&path, &params, &CheckpointMetadata::new(&params, stage, 0.0, "none"))
                .unwrap();
        }
        fs::write(dir.path().join("stage_9.ckpt"), b"junk").unwrap();
        fs::write(dir.path().join("notes.txt"), b"stage_12").unwrap();

        let (stage, path) = find_latest_checkpoint(dir.path()).unwrap();
        assert_eq!(stage, 3);
        assert!(path.ends_with("stage_3.ckpt"));

        let empty = TempDir::new().unwrap();
        assert!(find_latest_checkpoint(empty.path()).is_none());
    }
}
