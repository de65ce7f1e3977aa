//! Per-buffer loudness metering for 16-bit mono PCM.
//!
//! Levels are dBFS relative to `i16::MAX`. Silence would be `-inf`, which
//! the host event payload cannot carry, so results are clamped to
//! [`METER_FLOOR_DB`].

use crate::models::metering::MeteringSample;

/// Lowest level ever reported, used for digital silence.
pub const METER_FLOOR_DB: f64 = -160.0;

const FULL_SCALE: f64 = i16::MAX as f64;

/// Measure RMS and peak level of a buffer of 16-bit little-endian samples.
///
/// An empty buffer (or a single stray byte) measures as the floor.
pub fn measure(pcm_le: &[u8]) -> MeteringSample {
    let mut sum_sq = 0.0f64;
    let mut max_abs = 0.0f64;
    let mut count = 0usize;

    for chunk in pcm_le.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]) as f64;
        sum_sq += sample * sample;
        max_abs = max_abs.max(sample.abs() / FULL_SCALE);
        count += 1;
    }

    if count == 0 {
        return MeteringSample {
            average_db: METER_FLOOR_DB,
            peak_db: METER_FLOOR_DB,
        };
    }

    let rms = (sum_sq / count as f64).sqrt();
    MeteringSample {
        average_db: to_db(rms / FULL_SCALE),
        peak_db: to_db(max_abs),
    }
}

fn to_db(ratio: f64) -> f64 {
    let db = 20.0 * ratio.log10();
    if db.is_finite() {
        db.max(METER_FLOOR_DB)
    } else {
        METER_FLOOR_DB
    }
}
