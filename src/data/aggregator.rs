//! Per-channel metric series built from streamed chunks.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use biomonitor_types::{ChannelConfig, DataChunk, MetricPoint, PhysicalChannel};

/// Channel whose raw data tracks playback progress.
const PROGRESS_CHANNEL: PhysicalChannel = 0;

/// Number of levels in a sparkline (values are normalized to `0..SPARKLINE_LEVELS`).
const SPARKLINE_LEVELS: u8 = 8;

/// Which derived metric a series holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Bpm,
    Metric,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Bpm => "bpm",
            MetricKind::Metric => "metric",
        }
    }
}

/// A batch of chunks the aggregator refused. Nothing from the batch is applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("chunk references unknown physical channel {0}")]
    UnknownChannel(PhysicalChannel),

    #[error("chunk on channel {channel} has invalid window [{min}, {max}]")]
    InvalidWindow {
        channel: PhysicalChannel,
        min: f64,
        max: f64,
    },
}

/// What one `ingest` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Points appended to each of the bpm and metric series.
    pub appended: usize,
    /// Channels that received a window starting before the previous one ended.
    pub overlapping: Vec<PhysicalChannel>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.overlapping.is_empty()
    }
}

/// Derived bpm and metric series for every channel in the catalog.
///
/// Points are appended in arrival order. Nothing is sorted or deduplicated,
/// so overlapping windows produce overlapping points; they are reported in
/// the [`IngestReport`] so the caller can notice.
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    catalog: Vec<ChannelConfig>,
    bpm: BTreeMap<PhysicalChannel, Vec<MetricPoint>>,
    metric: BTreeMap<PhysicalChannel, Vec<MetricPoint>>,
    /// Most recent chunk set, for live display.
    current: Vec<DataChunk>,
    /// Largest window end seen per channel since the last reset.
    last_max: BTreeMap<PhysicalChannel, f64>,
}

impl MetricAggregator {
    /// Create an aggregator with one empty series pair per catalog channel.
    pub fn new(catalog: Vec<ChannelConfig>) -> Self {
        let mut aggregator = Self {
            catalog,
            bpm: BTreeMap::new(),
            metric: BTreeMap::new(),
            current: Vec::new(),
            last_max: BTreeMap::new(),
        };
        aggregator.reset();
        aggregator
    }

    /// Clear every series, the current data and the overlap tracking.
    pub fn reset(&mut self) {
        self.bpm = self
            .catalog
            .iter()
            .map(|c| (c.physical_channel, Vec::new()))
            .collect();
        self.metric = self.bpm.clone();
        self.current.clear();
        self.last_max.clear();
    }

    /// Append the derived points of each chunk and replace the current data.
    pub fn ingest(&mut self, chunks: &[DataChunk]) -> Result<IngestReport, IngestError> {
        for chunk in chunks {
            if !self.bpm.contains_key(&chunk.physical_channel) {
                return Err(IngestError::UnknownChannel(chunk.physical_channel));
            }
            if !chunk.window().is_valid() {
                return Err(IngestError::InvalidWindow {
                    channel: chunk.physical_channel,
                    min: chunk.min_time,
                    max: chunk.max_time,
                });
            }
        }

        let mut report = IngestReport::default();
        for chunk in chunks {
            let channel = chunk.physical_channel;
            let t = chunk.midpoint();

            let overlaps = matches!(self.last_max.get(&channel), Some(&end) if chunk.min_time < end);
            if overlaps {
                warn!(
                    channel,
                    min_time = chunk.min_time,
                    max_time = chunk.max_time,
                    "chunk window overlaps previously ingested data"
                );
                if !report.overlapping.contains(&channel) {
                    report.overlapping.push(channel);
                }
            }

            // Both maps hold every catalog channel; checked above.
            if let Some(series) = self.bpm.get_mut(&channel) {
                series.push(MetricPoint::new(t, chunk.bpm));
            }
            if let Some(series) = self.metric.get_mut(&channel) {
                series.push(MetricPoint::new(t, chunk.metric));
            }

            let end = self.last_max.entry(channel).or_insert(chunk.max_time);
            *end = end.max(chunk.max_time);
            report.appended += 1;
        }

        self.current = chunks.to_vec();
        Ok(report)
    }

    /// Last raw timestamp of channel 0 in the current data, or 0.
    pub fn latest_timestamp(&self) -> f64 {
        self.latest_timestamp_for(PROGRESS_CHANNEL).unwrap_or(0.0)
    }

    /// Last raw timestamp of a channel in the current data.
    pub fn latest_timestamp_for(&self, channel: PhysicalChannel) -> Option<f64> {
        self.current
            .iter()
            .rev()
            .find(|c| c.physical_channel == channel)
            .and_then(|c| c.last_timestamp())
    }

    /// Largest window end ingested since the last reset, across all channels.
    pub fn high_water_mark(&self) -> Option<f64> {
        self.last_max.values().copied().reduce(f64::max)
    }

    /// The chunk set from the most recent ingest.
    pub fn current(&self) -> &[DataChunk] {
        &self.current
    }

    /// Physical channels in catalog order.
    pub fn channels(&self) -> impl Iterator<Item = PhysicalChannel> + '_ {
        self.catalog.iter().map(|c| c.physical_channel)
    }

    pub fn catalog(&self) -> &[ChannelConfig] {
        &self.catalog
    }

    /// A channel's series, or `None` for a channel outside the catalog.
    pub fn series(&self, kind: MetricKind, channel: PhysicalChannel) -> Option<&[MetricPoint]> {
        let map = match kind {
            MetricKind::Bpm => &self.bpm,
            MetricKind::Metric => &self.metric,
        };
        map.get(&channel).map(Vec::as_slice)
    }

    /// The most recent point of a channel's series.
    pub fn latest(&self, kind: MetricKind, channel: PhysicalChannel) -> Option<MetricPoint> {
        self.series(kind, channel)?.last().copied()
    }

    /// Whether every series is empty.
    pub fn is_empty(&self) -> bool {
        self.bpm.values().chain(self.metric.values()).all(Vec::is_empty)
    }

    /// Series values normalized to `0..=7` for an eight-level bar display.
    ///
    /// Returns an empty Vec for unknown channels or fewer than 2 points.
    pub fn sparkline(&self, kind: MetricKind, channel: PhysicalChannel) -> Vec<u8> {
        let Some(points) = self.series(kind, channel) else {
            return Vec::new();
        };

        if points.len() < 2 {
            return Vec::new();
        }

        let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        });
        let range = max - min;
        let top = (SPARKLINE_LEVELS - 1) as f64;

        points
            .iter()
            .map(|p| {
                if range > 0.0 {
                    ((p.value - min) / range * top).round() as u8
                } else {
                    0
                }
            })
            .collect()
    }
}
