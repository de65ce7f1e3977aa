use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Result delivered to the caller once a session has been finalized.
///
/// Serializes to the host payload shape:
/// `{ filePath: "file://…", sampleRate, sampleCount, duration, … }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    #[serde(serialize_with = "serialize_file_uri")]
    pub file_path: PathBuf,
    pub sample_rate: u32,
    /// Frames in the data chunk (one sample per channel each).
    pub sample_count: u64,
    /// `sample_count / sample_rate`. Stereo takes report their real length;
    /// dividing bytes by bytes-per-sample instead would double it.
    #[serde(rename = "duration")]
    pub duration_secs: f64,
    /// Bytes in the WAV data chunk.
    pub data_bytes: u64,
    /// Whether metering events were produced (16-bit mono only).
    pub metering_enabled: bool,
    /// SHA-256 hex digest of the finished WAV file.
    pub checksum: String,
}

impl RecordingResult {
    /// `file://` URI of the finished recording.
    pub fn file_uri(&self) -> String {
        file_uri(&self.file_path)
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.to_string_lossy())
}

fn serialize_file_uri<S: Serializer>(path: &PathBuf, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&file_uri(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_host_payload() {
        let result = RecordingResult {
            file_path: PathBuf::from("/data/app/audio.wav"),
            sample_rate: 16000,
            sample_count: 480,
            duration_secs: 0.03,
            data_bytes: 960,
            metering_enabled: true,
            checksum: "abc".into(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["filePath"], "file:///data/app/audio.wav");
        assert_eq!(json["sampleRate"], 16000);
        assert_eq!(json["sampleCount"], 480);
        assert_eq!(json["duration"], 0.03);
        assert_eq!(json["meteringEnabled"], true);
        assert_eq!(result.file_uri(), "file:///data/app/audio.wav");
    }
}
