use crate::error::{ErpError, Result};
use crate::signal::SignalContainer;
use crate::types::{format_duration, FlashGroup};
use serde::{Deserialize, Serialize};

/// Crop bounds between the opening and closing flash groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    /// Seconds from the start of the raw recording
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Crop bounds from exactly two flash groups
///
/// The window starts one sample after the last flash of the first group and
/// ends one sample before the first flash of the last group.
pub fn trim_window(groups: &[FlashGroup], sample_rate: u32) -> Result<TrimWindow> {
    let [first, last] = groups else {
        return Err(ErpError::InvalidWindow(format!(
            "Expected exactly two flash groups, got {}",
            groups.len()
        )));
    };

    let (Some(first_end), Some(last_start)) = (first.last_sample(), last.first_sample()) else {
        return Err(ErpError::InvalidWindow("Flash group has no events".to_string()));
    };

    let sr = sample_rate as f64;
    let start = (first_end as f64 + 1.0) / sr;
    let end = (last_start as f64 - 1.0) / sr;

    if start >= end {
        return Err(ErpError::InvalidWindow(format!(
            "Flash groups leave no data between them (start {:.3} s, end {:.3} s)",
            start, end
        )));
    }

    Ok(TrimWindow { start, end })
}

/// Signal cropped to the analysis window
#[derive(Debug, Clone)]
pub struct TrimmedSignal {
    pub signal: SignalContainer,
    pub window: TrimWindow,
}

impl TrimmedSignal {
    pub fn status_message(&self) -> String {
        format!(
            "Data trimmed to relevant timeframe.\nLength of analyzed data: {}",
            format_duration(self.signal.duration())
        )
    }
}

/// Crop `signal` to the span between the two flash groups
pub fn trim_to_flashes(signal: &SignalContainer, groups: &[FlashGroup]) -> Result<TrimmedSignal> {
    let window = trim_window(groups, signal.sample_rate())?;
    if window.end > signal.duration() {
        return Err(ErpError::InvalidWindow(format!(
            "Trim end {:.3} s is past the end of the recording ({:.3} s)",
            window.end,
            signal.duration()
        )));
    }

    let cropped = signal.crop(window.start, window.end)?;
    log::info!(
        "Trimmed recording to [{:.3}, {:.3}] s, {} samples remain",
        window.start,
        window.end,
        cropped.n_samples()
    );

    Ok(TrimmedSignal {
        signal: cropped,
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Channel, ChannelKind};
    use crate::types::MarkerEvent;

    fn group(start: usize) -> FlashGroup {
        FlashGroup {
            events: (0..5)
                .map(|k| MarkerEvent {
                    sample_index: start + k * 40,
                    code: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_window_bounds() {
        let window = trim_window(&[group(500), group(8000)], 250).unwrap();
        assert!((window.start - 661.0 / 250.0).abs() < 1e-12);
        assert!((window.end - 7999.0 / 250.0).abs() < 1e-12);
        assert!(window.start < window.end);
    }

    #[test]
    fn test_window_requires_two_groups() {
        assert!(trim_window(&[group(500)], 250).is_err());
        assert!(trim_window(&[group(500), group(4000), group(8000)], 250).is_err());
    }

    #[test]
    fn test_window_rejects_touching_groups() {
        let err = trim_window(&[group(500), group(661)], 250).unwrap_err();
        assert!(matches!(err, ErpError::InvalidWindow(_)));
    }

    #[test]
    fn test_trim_crops_inside_recording() {
        let n = 10_000;
        let signal = SignalContainer::new(
            250,
            vec![Channel::new(
                "C3",
                ChannelKind::Eeg,
                (0..n).map(|i| i as f64).collect(),
            )],
        )
        .unwrap();

        let trimmed = trim_to_flashes(&signal, &[group(500), group(8000)]).unwrap();
        let c3 = trimmed.signal.samples("C3").unwrap();
        assert_eq!(c3.first(), Some(&661.0));
        assert_eq!(c3.last(), Some(&7999.0));
        assert_eq!(trimmed.signal.n_samples(), 7999 - 661 + 1);
        assert!(trimmed.window.end <= signal.duration());
        assert!(trimmed
            .status_message()
            .starts_with("Data trimmed to relevant timeframe."));
    }
}
