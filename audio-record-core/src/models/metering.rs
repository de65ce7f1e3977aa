use serde::Serialize;

/// Loudness of one buffer in dBFS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringSample {
    pub average_db: f64,
    pub peak_db: f64,
}

/// Event emitted once per staged buffer while metering is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteringEvent {
    #[serde(rename = "average")]
    pub average_db: f64,
    #[serde(rename = "peak")]
    pub peak_db: f64,
    /// Same value as `average`, kept for recorder-player compatibility.
    #[serde(rename = "currentMetering")]
    pub current_metering_db: f64,
    /// Playhead position in seconds.
    #[serde(rename = "currentPosition")]
    pub position_secs: f64,
}

impl MeteringEvent {
    pub const NAME: &'static str = "metering";

    pub fn new(sample: MeteringSample, position_secs: f64) -> Self {
        Self {
            average_db: sample.average_db,
            peak_db: sample.peak_db,
            current_metering_db: sample.average_db,
            position_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_matches_average() {
        let event = MeteringEvent::new(
            MeteringSample {
                average_db: -23.5,
                peak_db: -6.0,
            },
            1.25,
        );
        assert_eq!(event.current_metering_db, event.average_db);

        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["average"], -23.5);
        assert_eq!(json["currentMetering"], -23.5);
        assert_eq!(json["peak"], -6.0);
        assert_eq!(json["currentPosition"], 1.25);
    }
}
