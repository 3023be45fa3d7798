//! Multichannel sampled signal with channel metadata.

use crate::error::{ErpError, Result};
use serde::{Deserialize, Serialize};

/// Role of a channel in the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Eeg,
    Stim,
    Misc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
    pub samples: Vec<f64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, kind: ChannelKind, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            samples,
        }
    }
}

/// Ordered channels sharing one fixed sample rate and one length
#[derive(Debug, Clone, PartialEq)]
pub struct SignalContainer {
    channels: Vec<Channel>,
    sample_rate: u32,
}

impl SignalContainer {
    pub fn new(sample_rate: u32, channels: Vec<Channel>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ErpError::InvalidParameter(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        if let Some(first) = channels.first() {
            let expected = first.samples.len();
            for channel in &channels {
                if channel.samples.len() != expected {
                    return Err(ErpError::ShapeMismatch(format!(
                        "Channel '{}' has {} samples, expected {}",
                        channel.name,
                        channel.samples.len(),
                        expected
                    )));
                }
            }
        }

        for (i, channel) in channels.iter().enumerate() {
            if channels[..i].iter().any(|c| c.name == channel.name) {
                return Err(ErpError::InvalidParameter(format!(
                    "Duplicate channel name '{}'",
                    channel.name
                )));
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn n_samples(&self) -> usize {
        self.channels.first().map(|c| c.samples.len()).unwrap_or(0)
    }

    /// Length of the recording in seconds
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate as f64
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn names_of_kind(&self, kind: ChannelKind) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ErpError::ChannelNotFound(name.to_string()))
    }

    pub fn samples(&self, name: &str) -> Result<&[f64]> {
        self.channel(name).map(|c| c.samples.as_slice())
    }

    /// Re-label the given channels with `kind`
    pub fn set_channel_kind(&mut self, names: &[String], kind: ChannelKind) -> Result<()> {
        for name in names {
            let idx = self
                .channel_index(name)
                .ok_or_else(|| ErpError::ChannelNotFound(name.clone()))?;
            self.channels[idx].kind = kind;
        }
        Ok(())
    }

    /// Keep samples `start..=stop` of every channel
    pub fn crop_samples(&self, start: usize, stop: usize) -> Result<Self> {
        let n = self.n_samples();
        if start > stop || stop >= n {
            return Err(ErpError::InvalidWindow(format!(
                "Sample range {}..={} is outside the recording (0..{})",
                start, stop, n
            )));
        }

        let channels = self
            .channels
            .iter()
            .map(|c| Channel::new(c.name.clone(), c.kind, c.samples[start..=stop].to_vec()))
            .collect();

        Ok(Self {
            channels,
            sample_rate: self.sample_rate,
        })
    }

    /// Keep the time span `[tmin, tmax]` (seconds, both ends included)
    pub fn crop(&self, tmin: f64, tmax: f64) -> Result<Self> {
        if tmin < 0.0 || tmin >= tmax {
            return Err(ErpError::InvalidWindow(format!(
                "Crop bounds [{:.4}, {:.4}] s are not an increasing, non-negative span",
                tmin, tmax
            )));
        }
        let sr = self.sample_rate as f64;
        let start = (tmin * sr).round() as usize;
        let stop = (tmax * sr).round() as usize;
        self.crop_samples(start, stop)
    }

    /// Build a container of the same shape with some channels' samples replaced
    pub(crate) fn with_replaced(&self, replacements: Vec<(usize, Vec<f64>)>) -> Result<Self> {
        let mut channels = self.channels.clone();
        for (idx, samples) in replacements {
            let channel = channels.get_mut(idx).ok_or_else(|| {
                ErpError::ChannelNotFound(format!("channel index {}", idx))
            })?;
            if samples.len() != channel.samples.len() {
                return Err(ErpError::ShapeMismatch(format!(
                    "Replacement for '{}' has {} samples, expected {}",
                    channel.name,
                    samples.len(),
                    channel.samples.len()
                )));
            }
            channel.samples = samples;
        }
        Ok(Self {
            channels,
            sample_rate: self.sample_rate,
        })
    }
}
