//! Streamed sensor data: time windows, chunks and derived metric points.

use crate::PhysicalChannel;

/// A closed time interval `[min_time, max_time]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TimeWindow {
    pub min_time: f64,
    pub max_time: f64,
}

impl TimeWindow {
    pub fn new(min_time: f64, max_time: f64) -> Self {
        Self { min_time, max_time }
    }

    /// Window of `span` seconds starting at `start`.
    pub fn starting_at(start: f64, span: f64) -> Self {
        Self::new(start, start + span)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_time + self.max_time) / 2.0
    }

    /// Both bounds are finite and `min_time <= max_time`.
    pub fn is_valid(&self) -> bool {
        self.min_time.is_finite() && self.max_time.is_finite() && self.min_time <= self.max_time
    }

    /// Whether the two windows share more than a boundary instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.min_time < other.max_time && other.min_time < self.max_time
    }

    pub fn contains(&self, other: &TimeWindow) -> bool {
        other.min_time >= self.min_time && other.max_time <= self.max_time
    }
}

/// One channel's data for one time window, with its pre-derived summaries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DataChunk {
    pub physical_channel: PhysicalChannel,

    /// Raw `(timestamp, value)` samples in the window.
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: Vec<(f64, f64)>,

    pub min_time: f64,
    pub max_time: f64,

    /// Rate estimate for the window, in beats per minute.
    pub bpm: f64,

    /// Secondary scalar; its meaning depends on the channel.
    pub metric: f64,
}

impl DataChunk {
    pub fn new(physical_channel: PhysicalChannel, window: TimeWindow, bpm: f64, metric: f64) -> Self {
        Self {
            physical_channel,
            data: Vec::new(),
            min_time: window.min_time,
            max_time: window.max_time,
            bpm,
            metric,
        }
    }

    pub fn with_samples(mut self, data: Vec<(f64, f64)>) -> Self {
        self.data = data;
        self
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.min_time, self.max_time)
    }

    /// Timestamp the derived metrics are plotted at.
    pub fn midpoint(&self) -> f64 {
        self.window().midpoint()
    }

    /// Timestamp of the last raw sample, if any.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.data.last().map(|(t, _)| *t)
    }
}

/// A single point in a derived metric series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricPoint {
    pub t: f64,
    pub value: f64,
}

impl MetricPoint {
    pub fn new(t: f64, value: f64) -> Self {
        Self { t, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_window_center() {
        assert_eq!(TimeWindow::new(10.0, 20.0).midpoint(), 15.0);
        assert_eq!(TimeWindow::starting_at(4.0, 2.0), TimeWindow::new(4.0, 6.0));
    }

    #[test]
    fn validity_rejects_inverted_and_nan() {
        assert!(TimeWindow::new(1.0, 1.0).is_valid());
        assert!(!TimeWindow::new(2.0, 1.0).is_valid());
        assert!(!TimeWindow::new(f64::NAN, 1.0).is_valid());
        assert!(!TimeWindow::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let a = TimeWindow::new(0.0, 1.0);
        assert!(!a.overlaps(&TimeWindow::new(1.0, 2.0)));
        assert!(a.overlaps(&TimeWindow::new(0.5, 1.5)));
        assert!(a.contains(&TimeWindow::new(0.25, 0.75)));
    }

    #[test]
    fn last_timestamp_of_empty_chunk_is_none() {
        let chunk = DataChunk::new(0, TimeWindow::new(0.0, 1.0), 60.0, 0.0);
        assert!(chunk.last_timestamp().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_chunk() {
        let json = r#"{
            "physicalChannel": 1,
            "data": [[10.0, 0.5], [12.5, 0.7]],
            "minTime": 10,
            "maxTime": 20,
            "bpm": 72,
            "metric": 5
        }"#;

        let chunk: DataChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.physical_channel, 1);
        assert_eq!(chunk.data, vec![(10.0, 0.5), (12.5, 0.7)]);
        assert_eq!(chunk.midpoint(), 15.0);
        assert_eq!(chunk.bpm, 72.0);
    }
}
