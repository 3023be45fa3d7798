use crate::error::{ErpError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stimulus condition an event or epoch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Up,
    Down,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Condition::Up, Condition::Down];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Up => "up",
            Condition::Down => "down",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Onset detected on a digital marker channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEvent {
    pub sample_index: usize,
    pub code: i64,
}

/// A calibration burst of near-simultaneous flashes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashGroup {
    pub events: Vec<MarkerEvent>,
}

impl FlashGroup {
    pub fn first_sample(&self) -> Option<usize> {
        self.events.first().map(|e| e.sample_index)
    }

    pub fn last_sample(&self) -> Option<usize> {
        self.events.last().map(|e| e.sample_index)
    }
}

/// Stimulus counts the experiment protocol is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCounts {
    pub up: usize,
    pub down: usize,
}

impl ExpectedCounts {
    pub fn get(&self, condition: Condition) -> usize {
        match condition {
            Condition::Up => self.up,
            Condition::Down => self.down,
        }
    }
}

/// Pipeline configuration
///
/// Every field has a serde default, so a JSON override file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErpConfig {
    /// Sampling rate in Hz, used when the input header does not state one
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Sampling rate in Hz that wins over the input header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_override: Option<u32>,

    /// Bandpass low cutoff (Hz)
    #[serde(default = "default_l_freq")]
    pub l_freq: f64,

    /// Bandpass high cutoff (Hz)
    #[serde(default = "default_h_freq")]
    pub h_freq: f64,

    /// Butterworth order of each of the highpass and lowpass halves
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,

    /// Epoch start relative to the event (s), negative means before
    #[serde(default = "default_tmin")]
    pub tmin: f64,

    /// Epoch end relative to the event (s)
    #[serde(default = "default_tmax")]
    pub tmax: f64,

    /// Subtract the pre-stimulus mean from each epoch channel
    #[serde(default = "default_true")]
    pub baseline_correction: bool,

    /// Peak-to-peak rejection threshold (µV)
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f64,

    /// Max distance (samples) between flashes on the two marker channels
    #[serde(default = "default_flash_tolerance")]
    pub flash_tolerance_samples: usize,

    /// Max first-to-last distance (samples) inside one flash group
    #[serde(default = "default_flash_span")]
    pub flash_span_samples: usize,

    #[serde(default = "default_flash_group_size")]
    pub flash_group_size: usize,

    /// Grouped flash events a valid recording must contain (start + end burst)
    #[serde(default = "default_expected_flash_events")]
    pub expected_flash_events: usize,

    /// Minimum number of samples a marker must hold to count as an onset
    #[serde(default = "default_min_duration")]
    pub min_duration_samples: usize,

    #[serde(default = "default_eeg_channels")]
    pub eeg_channels: Vec<String>,

    /// The two stimulus/marker channels, in device order
    #[serde(default = "default_stim_channels")]
    pub stim_channels: Vec<String>,

    #[serde(default = "default_expected_counts")]
    pub expected_counts: Option<ExpectedCounts>,
}

fn default_sample_rate() -> u32 {
    250
}
fn default_l_freq() -> f64 {
    1.5
}
fn default_h_freq() -> f64 {
    8.0
}
fn default_filter_order() -> usize {
    4
}
fn default_tmin() -> f64 {
    -0.3
}
fn default_tmax() -> f64 {
    0.7
}
fn default_true() -> bool {
    true
}
fn default_reject_threshold() -> f64 {
    225.0
}
fn default_flash_tolerance() -> usize {
    15
}
fn default_flash_span() -> usize {
    250
}
fn default_flash_group_size() -> usize {
    5
}
fn default_expected_flash_events() -> usize {
    10
}
fn default_min_duration() -> usize {
    1
}
fn default_eeg_channels() -> Vec<String> {
    EEG_CHANNELS.iter().map(|s| s.to_string()).collect()
}
fn default_stim_channels() -> Vec<String> {
    vec!["STI0".to_string(), "STI1".to_string()]
}
fn default_expected_counts() -> Option<ExpectedCounts> {
    Some(ExpectedCounts { up: 30, down: 173 })
}

/// Longest epoch window accepted, in seconds
pub const MAX_EPOCH_SECONDS: f64 = 60.0;

/// Montage of the wearable headset, in device column order
pub const EEG_CHANNELS: [&str; 8] = ["Fp1", "Fp2", "C3", "C4", "P7", "P8", "O1", "O2"];

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            sample_rate_override: None,
            l_freq: default_l_freq(),
            h_freq: default_h_freq(),
            filter_order: default_filter_order(),
            tmin: default_tmin(),
            tmax: default_tmax(),
            baseline_correction: true,
            reject_threshold: default_reject_threshold(),
            flash_tolerance_samples: default_flash_tolerance(),
            flash_span_samples: default_flash_span(),
            flash_group_size: default_flash_group_size(),
            expected_flash_events: default_expected_flash_events(),
            min_duration_samples: default_min_duration(),
            eeg_channels: default_eeg_channels(),
            stim_channels: default_stim_channels(),
            expected_counts: default_expected_counts(),
        }
    }
}

impl ErpConfig {
    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ErpError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ErpConfig = serde_json::from_str(&content).map_err(|e| {
            ErpError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rate the analysis is configured for: the override when set
    pub fn effective_sample_rate(&self) -> u32 {
        self.sample_rate_override.unwrap_or(self.sample_rate)
    }

    pub fn nyquist(&self) -> f64 {
        self.effective_sample_rate() as f64 / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.sample_rate_override == Some(0) {
            return Err(ErpError::InvalidParameter(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if self.l_freq <= 0.0 {
            return Err(ErpError::InvalidParameter(format!(
                "Low cutoff ({} Hz) must be greater than 0",
                self.l_freq
            )));
        }
        if self.l_freq >= self.h_freq {
            return Err(ErpError::InvalidParameter(format!(
                "Low cutoff ({} Hz) must be less than high cutoff ({} Hz)",
                self.l_freq, self.h_freq
            )));
        }
        if self.h_freq >= self.nyquist() {
            return Err(ErpError::InvalidParameter(format!(
                "High cutoff ({} Hz) must be less than Nyquist ({} Hz)",
                self.h_freq,
                self.nyquist()
            )));
        }
        if self.filter_order == 0 {
            return Err(ErpError::InvalidParameter(
                "Filter order must be at least 1".to_string(),
            ));
        }
        if !self.tmin.is_finite() || !self.tmax.is_finite() {
            return Err(ErpError::InvalidParameter(format!(
                "Epoch bounds must be finite, got [{}, {}] s",
                self.tmin, self.tmax
            )));
        }
        if self.tmin >= self.tmax {
            return Err(ErpError::InvalidParameter(format!(
                "Epoch start ({} s) must be before epoch end ({} s)",
                self.tmin, self.tmax
            )));
        }
        if self.tmax - self.tmin > MAX_EPOCH_SECONDS {
            return Err(ErpError::InvalidParameter(format!(
                "Epoch window ({} s) must not exceed {} s",
                self.tmax - self.tmin,
                MAX_EPOCH_SECONDS
            )));
        }
        if self.reject_threshold <= 0.0 {
            return Err(ErpError::InvalidParameter(format!(
                "Rejection threshold ({} µV) must be positive",
                self.reject_threshold
            )));
        }
        if self.flash_group_size == 0 {
            return Err(ErpError::InvalidParameter(
                "Flash group size must be at least 1".to_string(),
            ));
        }
        if self.expected_flash_events != 2 * self.flash_group_size {
            return Err(ErpError::InvalidParameter(format!(
                "Expected flash events ({}) must be two groups of {}",
                self.expected_flash_events, self.flash_group_size
            )));
        }
        if self.eeg_channels.is_empty() {
            return Err(ErpError::InvalidParameter(
                "At least one EEG channel must be configured".to_string(),
            ));
        }
        if self.stim_channels.len() != 2 {
            return Err(ErpError::InvalidParameter(format!(
                "Exactly two stimulus channels are required, got {}",
                self.stim_channels.len()
            )));
        }
        Ok(())
    }
}

/// Scalp location label shown for a montage channel
pub fn channel_location(name: &str) -> Option<&'static str> {
    match name {
        "Fp1" => Some("Frontal Left"),
        "Fp2" => Some("Frontal Right"),
        "C3" => Some("Central Left"),
        "C4" => Some("Central Right"),
        "P7" => Some("Parietal Left"),
        "P8" => Some("Parietal Right"),
        "O1" => Some("Occipital Left"),
        "O2" => Some("Occipital Right"),
        _ => None,
    }
}

/// Format seconds as `H:MM:SS` (fractional seconds kept when present)
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.trunc() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    let frac = seconds - whole as f64;
    if frac > 1e-9 {
        let micros = (frac * 1_000_000.0).round() as u64;
        if micros >= 1_000_000 {
            return format_duration(whole as f64 + 1.0);
        }
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, secs, micros)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ErpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 250);
        assert_eq!(config.eeg_channels.len(), 8);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ErpConfig = serde_json::from_str(r#"{"l_freq": 0.5}"#).unwrap();
        assert_eq!(config.l_freq, 0.5);
        assert_eq!(config.h_freq, 8.0);
        assert_eq!(config.reject_threshold, 225.0);
        assert_eq!(config.stim_channels, vec!["STI0", "STI1"]);
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let config = ErpConfig {
            l_freq: 10.0,
            h_freq: 8.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("less than high cutoff"));
    }

    #[test]
    fn test_validate_rejects_cutoff_above_nyquist() {
        let config = ErpConfig {
            h_freq: 200.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_epoch_window() {
        let config = ErpConfig {
            tmin: 0.5,
            tmax: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_epoch_window() {
        let config: ErpConfig = serde_json::from_str(r#"{"tmin": -1e300}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ErpError::InvalidParameter(_))
        ));

        let config = ErpConfig {
            tmax: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ErpConfig {
            tmin: -10.0,
            tmax: 50.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = ErpConfig::from_json_file("/nonexistent/config.json");
        assert!(matches!(result, Err(ErpError::ConfigError(_))));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(226.0), "0:03:46");
        assert_eq!(format_duration(3725.5), "1:02:05.500000");
    }

    #[test]
    fn test_channel_location() {
        assert_eq!(channel_location("O2"), Some("Occipital Right"));
        assert_eq!(channel_location("STI0"), None);
    }
}
