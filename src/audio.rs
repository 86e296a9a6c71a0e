//! Audio metadata reader.
//!
//! Handlers only see [`MetadataReader`]; the WAV implementation takes the
//! format fields and exact frame-based duration from the header via `hound`
//! and the RIFF `LIST/INFO` text entries via `lofty`.

use lofty::config::ParseOptions;
use lofty::file::AudioFile;
use lofty::iff::wav::WavFile;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Properties derived from a stored file's bytes on every read.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AudioInfo {
    /// Seconds.
    pub duration: f64,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug)]
pub enum AudioError {
    NotFound,
    Decode(String),
    Io(io::Error),
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(err) if err.kind() == io::ErrorKind::NotFound => {
                AudioError::NotFound
            }
            other => AudioError::Decode(other.to_string()),
        }
    }
}

pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<AudioInfo, AudioError>;
}

/// Runs a blocking read on the blocking thread pool.
pub async fn read_info(
    reader: Arc<dyn MetadataReader>,
    path: PathBuf,
) -> Result<AudioInfo, AudioError> {
    tokio::task::spawn_blocking(move || reader.read(&path))
        .await
        .map_err(|err| AudioError::Io(io::Error::other(err.to_string())))?
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WavMetadataReader;

impl MetadataReader for WavMetadataReader {
    fn read(&self, path: &Path) -> Result<AudioInfo, AudioError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(AudioError::Decode("invalid wav format chunk".into()));
        }
        let duration = f64::from(reader.duration()) / f64::from(spec.sample_rate);
        drop(reader);

        Ok(AudioInfo {
            duration,
            num_channels: spec.channels,
            sample_rate: spec.sample_rate,
            metadata: read_info_list(path),
        })
    }
}

/// INFO entries keyed by readable names; unknown ids keep their four-char code.
/// Returns an empty map when lofty cannot parse the file.
fn read_info_list(path: &Path) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let parsed = std::fs::File::open(path)
        .map_err(lofty::error::LoftyError::from)
        .and_then(|mut file| WavFile::read_from(&mut file, ParseOptions::new()));
    let wav = match parsed {
        Ok(wav) => wav,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "riff info unavailable");
            return metadata;
        }
    };

    if let Some(info) = wav.riff_info() {
        for (id, value) in info {
            let value = value.trim_end_matches('\0').trim();
            if value.is_empty() {
                continue;
            }
            metadata.insert(info_key(id).to_string(), value.to_string());
        }
    }
    metadata
}

fn info_key(id: &str) -> &str {
    match id {
        "INAM" => "title",
        "IART" => "artist",
        "IPRD" => "album",
        "ICMT" => "comment",
        "ICRD" => "date",
        "IGNR" => "genre",
        "ITRK" | "IPRT" => "track",
        "ICOP" => "copyright",
        "IENG" => "engineer",
        "ISFT" => "software",
        other => other,
    }
}
