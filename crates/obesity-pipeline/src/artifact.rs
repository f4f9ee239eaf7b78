//! On-disk form of a trained bundle.
//!
//! New artifacts wrap the bundle in a versioned envelope carrying a format
//! tag. Two encodings are supported and chosen by file name:
//! - `Binary` (bincode) for anything not ending in `.json`
//! - `Portable` (JSON) for `*.json`
//!
//! Decoding also accepts a bare [`FittedPipeline`], the shape written before
//! the envelope existed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::compat;
use crate::config::FeatureConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::pipeline::{FittedPipeline, TrainedBundle};

/// Tag written into every envelope.
pub const FORMAT_TAG: &str = "obesity-pipeline/bundle";

/// Current envelope version. Artifacts with a higher version are rejected.
pub const FORMAT_VERSION: u32 = 1;

/// Artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArtifactFormat {
    /// Compact bincode encoding.
    #[default]
    Binary,
    /// Human-readable JSON.
    Portable,
}

impl ArtifactFormat {
    /// Pick the encoding from the file name: `.json` is portable, anything
    /// else is binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Portable,
            _ => Self::Binary,
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Portable => "json",
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'a str,
    version: u32,
    created_at: DateTime<Utc>,
    bundle: &'a TrainedBundle,
}

#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    created_at: DateTime<Utc>,
    bundle: TrainedBundle,
}

/// Leading fields of an envelope, read before committing to a full decode.
#[derive(Deserialize)]
struct Header {
    format: String,
    version: u32,
}

/// A decoded artifact.
#[derive(Debug, Clone)]
pub struct RestoredBundle {
    pub bundle: TrainedBundle,
    /// `None` for legacy artifacts.
    pub created_at: Option<DateTime<Utc>>,
    pub legacy: bool,
}

fn to_bytes<T: Serialize>(value: &T, format: ArtifactFormat) -> Result<Vec<u8>> {
    Ok(match format {
        ArtifactFormat::Binary => bincode::serialize(value)?,
        ArtifactFormat::Portable => serde_json::to_vec(value)?,
    })
}

fn from_bytes<'a, T: Deserialize<'a>>(bytes: &'a [u8], format: ArtifactFormat) -> Result<T> {
    Ok(match format {
        ArtifactFormat::Binary => bincode::deserialize(bytes)?,
        ArtifactFormat::Portable => serde_json::from_slice(bytes)?,
    })
}

/// Encode a bundle inside a fresh envelope.
pub fn encode(bundle: &TrainedBundle, format: ArtifactFormat) -> Result<Vec<u8>> {
    let envelope = EnvelopeRef {
        format: FORMAT_TAG,
        version: FORMAT_VERSION,
        created_at: Utc::now(),
        bundle,
    };
    to_bytes(&envelope, format)
}

/// Encode only the fitted pipeline, as releases before the envelope did.
pub fn encode_legacy(pipeline: &FittedPipeline, format: ArtifactFormat) -> Result<Vec<u8>> {
    to_bytes(pipeline, format)
}

/// Decode an artifact of either shape.
///
/// A legacy artifact has no defaults and no column order; the configured
/// `expected_columns()` stand in for the latter.
pub fn decode(bytes: &[u8], format: ArtifactFormat, config: &FeatureConfig) -> Result<RestoredBundle> {
    compat::ensure_legacy_symbols();

    let header = from_bytes::<Header>(bytes, format);
    if let Ok(header) = &header {
        if header.format == FORMAT_TAG {
            if header.version > FORMAT_VERSION {
                return Err(PipelineError::Artifact(format!(
                    "artifact version {} is newer than supported version {}",
                    header.version, FORMAT_VERSION
                )));
            }
            let envelope: Envelope = from_bytes(bytes, format)?;
            debug!(
                "Decoded {} artifact v{} created {}",
                envelope.format, envelope.version, envelope.created_at
            );
            return Ok(RestoredBundle {
                bundle: envelope.bundle,
                created_at: Some(envelope.created_at),
                legacy: false,
            });
        }
    }

    match from_bytes::<FittedPipeline>(bytes, format) {
        Ok(pipeline) => {
            warn!(
                "Artifact holds only a fitted pipeline; defaults are empty and the \
                 column order falls back to the configured columns"
            );
            Ok(RestoredBundle {
                bundle: TrainedBundle {
                    pipeline,
                    column_defaults: Default::default(),
                    expected_columns: config.expected_columns(),
                },
                created_at: None,
                legacy: true,
            })
        }
        Err(err) => match header {
            Ok(header) => Err(PipelineError::Artifact(format!(
                "unknown artifact format '{}'",
                header.format
            ))),
            Err(_) => Err(PipelineError::Artifact(format!("unrecognised artifact: {err}"))),
        },
    }
}

/// Write a bundle to `path`, creating parent directories as needed.
pub fn write(path: &Path, bundle: &TrainedBundle, format: ArtifactFormat) -> Result<()> {
    let bytes = encode(bundle, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(format!("creating {}", parent.display()))?;
    }
    fs::write(path, bytes).context(format!("writing {}", path.display()))?;
    Ok(())
}

/// Read a bundle written by [`write`] or a legacy pipeline-only artifact.
pub fn read(path: &Path, format: ArtifactFormat, config: &FeatureConfig) -> Result<RestoredBundle> {
    let bytes = fs::read(path).context(format!("reading {}", path.display()))?;
    decode(&bytes, format, config).context(format!("decoding {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(ArtifactFormat::from_path(&PathBuf::from("model.json")), ArtifactFormat::Portable);
        assert_eq!(ArtifactFormat::from_path(&PathBuf::from("model.JSON")), ArtifactFormat::Portable);
        assert_eq!(ArtifactFormat::from_path(&PathBuf::from("pipeline_obesidade.bin")), ArtifactFormat::Binary);
        assert_eq!(ArtifactFormat::from_path(&PathBuf::from("pipeline")), ArtifactFormat::Binary);
    }

    #[test]
    fn test_rejects_foreign_and_newer_envelopes() {
        let config = FeatureConfig::obesity();

        let foreign = br#"{"format": "other-tool/model", "version": 1}"#;
        let err = decode(foreign, ArtifactFormat::Portable, &config).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ARTIFACT");
        assert!(err.to_string().contains("other-tool/model"));

        let newer = format!(r#"{{"format": "{FORMAT_TAG}", "version": 99}}"#);
        let err = decode(newer.as_bytes(), ArtifactFormat::Portable, &config).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ARTIFACT");
    }

    #[test]
    fn test_rejects_garbage() {
        let config = FeatureConfig::obesity();
        assert!(decode(b"not an artifact", ArtifactFormat::Portable, &config).is_err());
        assert!(decode(&[1, 2, 3], ArtifactFormat::Binary, &config).is_err());
    }
}
