use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format::WavHeader;

const COPY_CHUNK: usize = 64 * 1024;

/// Outcome of wrapping a staged PCM file in a WAV container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedWav {
    pub data_bytes: u64,
    /// SHA-256 hex digest of the complete output file.
    pub checksum: String,
}

/// Write `output` as a 44-byte header followed by a byte-for-byte copy of
/// the closed staging file at `staged`.
///
/// An existing file at `output` is left alone when the staging file or the
/// format is rejected. Once `output` has been created, a failed copy removes
/// it so no truncated WAV is left behind.
pub fn finalize_wav(staged: &Path, output: &Path, format: &PcmFormat) -> Result<FinalizedWav, CaptureError> {
    let mut input =
        File::open(staged).map_err(|e| CaptureError::StorageError(format!("failed to open staging file: {}", e)))?;
    let total_audio_len = input
        .metadata()
        .map_err(|e| CaptureError::StorageError(format!("failed to stat staging file: {}", e)))?
        .len();
    let header = WavHeader::for_data(format, total_audio_len)?.to_bytes();

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
    }
    let file = File::create(output)
        .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;

    let result = write_contents(file, &header, &mut input, total_audio_len);
    match &result {
        Ok(finalized) => log::debug!("wrote {} ({} data bytes)", output.display(), finalized.data_bytes),
        Err(_) => {
            if let Err(e) = fs::remove_file(output) {
                log::warn!("failed to remove partial recording {}: {}", output.display(), e);
            }
        }
    }
    result
}

fn write_contents(
    file: File,
    header: &[u8],
    input: &mut File,
    total_audio_len: u64,
) -> Result<FinalizedWav, CaptureError> {
    let mut out = BufWriter::new(file);
    let mut hasher = Sha256::new();

    out.write_all(header)
        .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
    hasher.update(header);

    let mut chunk = vec![0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        let n = input
            .read(&mut chunk)
            .map_err(|e| CaptureError::StorageError(format!("staging read failed: {}", e)))?;
        if n == 0 {
            break;
        }
        out.write_all(&chunk[..n])
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        hasher.update(&chunk[..n]);
        copied += n as u64;
    }

    if copied != total_audio_len {
        return Err(CaptureError::StorageError(format!(
            "staging file changed during finalization: expected {} bytes, copied {}",
            total_audio_len, copied
        )));
    }

    let file = out
        .into_inner()
        .map_err(|e| CaptureError::StorageError(format!("flush failed: {}", e.error())))?;
    file.sync_all()
        .map_err(|e| CaptureError::StorageError(format!("sync failed: {}", e)))?;

    Ok(FinalizedWav {
        data_bytes: copied,
        checksum: hex_encode(&hasher.finalize()),
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_staged_pcm_in_wav() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("audio-test.pcm");
        let pcm: Vec<u8> = (0..960u32).map(|i| (i % 251) as u8).collect();
        fs::write(&staged, &pcm).unwrap();

        let output = dir.path().join("out").join("audio.wav");
        let format = PcmFormat::new(16000, 1, 16);
        let finalized = finalize_wav(&staged, &output, &format).unwrap();

        let bytes = fs::read(&output).unwrap();
        assert_eq!(bytes.len(), 44 + 960);
        assert_eq!(&bytes[44..], &pcm[..]);
        assert_eq!(finalized.data_bytes, 960);

        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.total_audio_len, 960);
        assert_eq!(header.sample_rate, 16000);

        let expected = hex_encode(&Sha256::digest(&bytes));
        assert_eq!(finalized.checksum, expected);
    }

    #[test]
    fn empty_staging_yields_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("audio-empty.pcm");
        fs::write(&staged, b"").unwrap();
        let output = dir.path().join("silence.wav");

        let finalized = finalize_wav(&staged, &output, &PcmFormat::new(8000, 2, 8)).unwrap();

        assert_eq!(finalized.data_bytes, 0);
        assert_eq!(fs::metadata(&output).unwrap().len(), 44);
    }

    #[test]
    fn missing_staging_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("audio.wav");
        let result = finalize_wav(&dir.path().join("nope.pcm"), &output, &PcmFormat::new(16000, 1, 16));

        assert!(matches!(result, Err(CaptureError::StorageError(_))));
        assert!(!output.exists());
    }

    #[test]
    fn rejected_staging_keeps_an_existing_recording() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("audio.wav");
        fs::write(&output, b"previous take").unwrap();

        let result = finalize_wav(&dir.path().join("nope.pcm"), &output, &PcmFormat::new(16000, 1, 16));

        assert!(matches!(result, Err(CaptureError::StorageError(_))));
        assert_eq!(fs::read(&output).unwrap(), b"previous take");
    }

    #[test]
    fn rejected_format_keeps_an_existing_recording() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("audio-test.pcm");
        fs::write(&staged, [0u8; 16]).unwrap();
        let output = dir.path().join("audio.wav");
        fs::write(&output, b"previous take").unwrap();

        let result = finalize_wav(&staged, &output, &PcmFormat::new(2_000_000_000, 2, 16));

        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
        assert_eq!(fs::read(&output).unwrap(), b"previous take");
    }
}
