//! Archived session data.

use std::collections::BTreeMap;

use crate::PhysicalChannel;

/// The full recorded series of one channel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelHistory {
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: Vec<f64>,
}

impl ChannelHistory {
    pub fn len(&self) -> usize {
        self.time.len().min(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(timestamp, value)` pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }
}

/// Everything archived for a session, keyed by physical channel.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HistoryRecord {
    #[cfg_attr(feature = "serde", serde(default, alias = "session_id"))]
    pub session_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub channels: BTreeMap<PhysicalChannel, ChannelHistory>,
}

impl HistoryRecord {
    pub fn channel(&self, channel: PhysicalChannel) -> Option<&ChannelHistory> {
        self.channels.get(&channel)
    }

    /// Total number of samples across all channels.
    pub fn sample_count(&self) -> usize {
        self.channels.values().map(|c| c.len()).sum()
    }
}

/// Optional filters for a history request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryParams {
    pub min_time: Option<f64>,
    pub max_time: Option<f64>,
    /// Restrict to these channels; empty means all.
    pub channels: Vec<PhysicalChannel>,
}

impl HistoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_time(mut self, t: f64) -> Self {
        self.min_time = Some(t);
        self
    }

    pub fn max_time(mut self, t: f64) -> Self {
        self.max_time = Some(t);
        self
    }

    pub fn channel(mut self, channel: PhysicalChannel) -> Self {
        self.channels.push(channel);
        self
    }
}
