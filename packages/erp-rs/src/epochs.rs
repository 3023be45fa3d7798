//! Event-locked epoch extraction and averaging.
//!
//! An epoch spans samples `S + round(tmin·R) ..= S + round(tmax·R)` around an
//! event at sample `S`, both ends included. Events whose window does not fit
//! inside the signal are skipped.

use crate::error::{ErpError, Result};
use crate::signal::SignalContainer;
use crate::types::{channel_location, Condition, ErpConfig, MarkerEvent, MAX_EPOCH_SECONDS};
use serde::Serialize;

/// One event-locked slice of the EEG channels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Epoch {
    pub event: MarkerEvent,
    /// `[channel][sample]`, channels in the collection's `ch_names` order
    pub data: Vec<Vec<f64>>,
}

/// Sample offsets of an epoch window relative to its event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochWindow {
    pub start_offset: i64,
    pub stop_offset: i64,
}

impl EpochWindow {
    pub fn new(tmin: f64, tmax: f64, sample_rate: u32) -> Result<Self> {
        if !tmin.is_finite() || !tmax.is_finite() || tmax - tmin > MAX_EPOCH_SECONDS {
            return Err(ErpError::InvalidWindow(format!(
                "Epoch window [{}, {}] s must be finite and at most {} s long",
                tmin, tmax, MAX_EPOCH_SECONDS
            )));
        }
        if tmin >= tmax {
            return Err(ErpError::InvalidWindow(format!(
                "Epoch start ({} s) must be before epoch end ({} s)",
                tmin, tmax
            )));
        }
        let sr = sample_rate as f64;
        Ok(Self {
            start_offset: (tmin * sr).round() as i64,
            stop_offset: (tmax * sr).round() as i64,
        })
    }

    pub fn n_samples(&self) -> usize {
        (self.stop_offset - self.start_offset + 1) as usize
    }

    /// Samples at or before the event, used as the baseline interval
    pub fn n_baseline(&self) -> usize {
        if self.start_offset > 0 {
            0
        } else {
            (self.stop_offset.min(0) - self.start_offset + 1) as usize
        }
    }

    /// Absolute sample range for an event, if it lies inside `0..n_total`
    pub fn bounds(&self, sample_index: usize, n_total: usize) -> Option<(usize, usize)> {
        let start = sample_index as i64 + self.start_offset;
        let stop = sample_index as i64 + self.stop_offset;
        if start < 0 || stop >= n_total as i64 {
            None
        } else {
            Some((start as usize, stop as usize))
        }
    }
}

/// Subtract the mean of the first `n_baseline` samples from every channel
pub fn baseline_correct(data: &mut [Vec<f64>], n_baseline: usize) {
    for channel in data.iter_mut() {
        let n = n_baseline.min(channel.len());
        if n == 0 {
            continue;
        }
        let mean = channel[..n].iter().sum::<f64>() / n as f64;
        channel.iter_mut().for_each(|v| *v -= mean);
    }
}

/// Epochs of one condition
///
/// `found` is the number of events the collection was built from. It is
/// fixed at extraction and is not touched by later rejection passes.
#[derive(Debug, Clone, Serialize)]
pub struct EpochCollection {
    pub condition: Condition,
    pub ch_names: Vec<String>,
    pub tmin: f64,
    pub tmax: f64,
    pub sample_rate: u32,
    epochs: Vec<Epoch>,
    found: usize,
}

impl EpochCollection {
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn found(&self) -> usize {
        self.found
    }

    /// Keep only the epochs for which `keep` returns true, preserving order
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Epoch) -> bool,
    {
        self.epochs.retain(keep);
    }

    fn window(&self) -> Result<EpochWindow> {
        EpochWindow::new(self.tmin, self.tmax, self.sample_rate)
    }

    /// Sample times relative to the event, in seconds
    pub fn times(&self) -> Result<Vec<f64>> {
        let window = self.window()?;
        let sr = self.sample_rate as f64;
        Ok((window.start_offset..=window.stop_offset)
            .map(|k| k as f64 / sr)
            .collect())
    }

    /// Per-channel mean over the surviving epochs
    ///
    /// A condition with no events is `EmptyCondition`; one whose epochs were
    /// all rejected is `AllEpochsRejected`.
    pub fn average(&self) -> Result<Evoked> {
        if self.found == 0 {
            return Err(ErpError::EmptyCondition(self.condition));
        }
        if self.epochs.is_empty() {
            return Err(ErpError::AllEpochsRejected {
                condition: self.condition,
                found: self.found,
            });
        }

        let n_times = self.epochs[0].data.first().map(|c| c.len()).unwrap_or(0);
        let nave = self.epochs.len();
        let mut data = vec![vec![0.0; n_times]; self.ch_names.len()];
        for epoch in &self.epochs {
            for (acc, channel) in data.iter_mut().zip(&epoch.data) {
                for (a, v) in acc.iter_mut().zip(channel) {
                    *a += v;
                }
            }
        }
        for channel in &mut data {
            channel.iter_mut().for_each(|v| *v /= nave as f64);
        }

        let times_ms = self.times()?.into_iter().map(|t| t * 1000.0).collect();

        Ok(Evoked {
            condition: self.condition,
            ch_names: self.ch_names.clone(),
            locations: self
                .ch_names
                .iter()
                .map(|n| channel_location(n).map(str::to_string))
                .collect(),
            times_ms,
            data,
            nave,
        })
    }
}

/// Averaged response of one condition
#[derive(Debug, Clone, Serialize)]
pub struct Evoked {
    pub condition: Condition,
    pub ch_names: Vec<String>,
    /// Scalp location label per channel, when the montage knows it
    pub locations: Vec<Option<String>>,
    pub times_ms: Vec<f64>,
    /// `[channel][sample]`
    pub data: Vec<Vec<f64>>,
    pub nave: usize,
}

/// Cut one epoch per event from the configured EEG channels
pub fn extract_epochs(
    signal: &SignalContainer,
    events: &[MarkerEvent],
    condition: Condition,
    config: &ErpConfig,
) -> Result<EpochCollection> {
    let window = EpochWindow::new(config.tmin, config.tmax, signal.sample_rate())?;
    let channels: Vec<&[f64]> = config
        .eeg_channels
        .iter()
        .map(|name| signal.samples(name))
        .collect::<Result<_>>()?;

    let n_total = signal.n_samples();
    let n_baseline = if config.baseline_correction {
        window.n_baseline()
    } else {
        0
    };
    if config.baseline_correction && n_baseline == 0 {
        log::warn!(
            "Epoch window starts after the event (tmin = {} s); skipping baseline correction",
            config.tmin
        );
    }

    let mut epochs = Vec::with_capacity(events.len());
    for event in events {
        let Some((start, stop)) = window.bounds(event.sample_index, n_total) else {
            log::debug!(
                "Dropping {} event at sample {}: window does not fit in {} samples",
                condition,
                event.sample_index,
                n_total
            );
            continue;
        };

        let mut data: Vec<Vec<f64>> = channels.iter().map(|c| c[start..=stop].to_vec()).collect();
        baseline_correct(&mut data, n_baseline);
        epochs.push(Epoch {
            event: *event,
            data,
        });
    }

    log::info!(
        "Epochs isolated: {} of {} {} events ({} samples each)",
        epochs.len(),
        events.len(),
        condition,
        window.n_samples()
    );

    Ok(EpochCollection {
        condition,
        ch_names: config.eeg_channels.clone(),
        tmin: config.tmin,
        tmax: config.tmax,
        sample_rate: signal.sample_rate(),
        epochs,
        found: events.len(),
    })
}
