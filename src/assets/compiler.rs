//! Build-time asset compiler.

use ahash::AHashSet;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::{asset_id, codec, hex_digest, AssetBundle, AssetRecord};
use crate::error::BuildError;

/// Deflate levels tried for every asset, fastest first.
pub const COMPRESSION_LEVELS: [u32; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// One compressed and encoded form of an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Deflate level used
    pub level: u32,
    /// Radix-85 text of the gzip stream
    pub encoded: String,
}

/// Pick the candidate with the shortest encoding.
///
/// Ties go to the earliest candidate, so with candidates ordered fastest
/// first the fastest level wins among equal sizes.
pub fn select_smallest<I>(candidates: I) -> Option<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.encoded.len() >= current.encoded.len() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

fn compress_at(name: &str, data: &[u8], level: u32) -> Result<Candidate, BuildError> {
    let to_err = |source| BuildError::Compress {
        name: name.to_string(),
        source,
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).map_err(to_err)?;
    let compressed = encoder.finish().map_err(to_err)?;

    Ok(Candidate {
        level,
        encoded: codec::encode(&compressed),
    })
}

/// Compress `data` at every level and keep the smallest encoded result.
pub fn compress_best(name: &str, data: &[u8]) -> Result<Candidate, BuildError> {
    let mut candidates = Vec::with_capacity(COMPRESSION_LEVELS.len());
    for level in COMPRESSION_LEVELS {
        let candidate = compress_at(name, data, level)?;
        log::trace!(
            "{}: level {} -> {} chars",
            name,
            level,
            candidate.encoded.len()
        );
        candidates.push(candidate);
    }

    // COMPRESSION_LEVELS is never empty.
    select_smallest(candidates).ok_or_else(|| BuildError::Compress {
        name: name.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "no compression level"),
    })
}

/// Collects raw database files into an [`AssetBundle`].
///
/// # Examples
/// ```
/// use geoblock::assets::AssetCompiler;
///
/// let mut compiler = AssetCompiler::new();
/// compiler.add_bytes("GeoLite2-Country.mmdb", b"database bytes").unwrap();
/// let bundle = compiler.finish().unwrap();
/// assert_eq!(bundle.get("GeoLite2-Country.mmdb").unwrap(), b"database bytes");
/// ```
#[derive(Debug, Default)]
pub struct AssetCompiler {
    records: Vec<AssetRecord>,
    names: AHashSet<String>,
}

impl AssetCompiler {
    /// Create an empty compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assets added so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no asset was added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add an asset from memory under `name`.
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<&AssetRecord, BuildError> {
        if !self.names.insert(name.to_string()) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }

        let best = compress_best(name, data)?;
        log::info!(
            "Packed {}: {} bytes -> {} chars (level {})",
            name,
            data.len(),
            best.encoded.len(),
            best.level
        );

        self.records.push(AssetRecord {
            id: asset_id(name),
            name: name.to_string(),
            level: best.level,
            size: data.len(),
            sha256: hex_digest(data),
            payload: best.encoded,
        });

        // Just pushed.
        Ok(&self.records[self.records.len() - 1])
    }

    /// Add a database file, keyed by its base name.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&AssetRecord, BuildError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BuildError::InvalidName(path.to_path_buf()))?
            .to_string();

        let data = fs::read(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.add_bytes(&name, &data)
    }

    /// Freeze the collected assets into a bundle.
    pub fn finish(self) -> Result<AssetBundle, BuildError> {
        let assets = self
            .records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Ok(AssetBundle { assets })
    }

    /// Freeze the collected assets and write the bundle file.
    pub fn write(self, output: impl AsRef<Path>) -> Result<AssetBundle, BuildError> {
        let output = output.as_ref();
        let bundle = self.finish()?;

        let json = bundle.encode_json()?;

        fs::write(output, json).map_err(|source| BuildError::Write {
            path: output.to_path_buf(),
            source,
        })?;

        Ok(bundle)
    }
}
