//! Marker onset detection and up/down stimulus classification.

use crate::error::{ErpError, Result};
use crate::signal::SignalContainer;
use crate::types::{Condition, MarkerEvent};
use serde::Serialize;

/// Find rising edges on a digital marker channel
///
/// Values are rounded to integer codes. An onset is a transition from code 0
/// to a non-zero code that stays non-zero for at least `min_duration_samples`
/// samples. A channel that is already non-zero at sample 0 does not produce
/// an event there, and a change between two non-zero codes is not a new onset.
pub fn find_events(samples: &[f64], min_duration_samples: usize) -> Vec<MarkerEvent> {
    let min_hold = min_duration_samples.max(1);
    let codes: Vec<i64> = samples.iter().map(|v| v.round() as i64).collect();
    let mut events = Vec::new();

    let mut i = 1;
    while i < codes.len() {
        if codes[i] != 0 && codes[i - 1] == 0 {
            let onset = i;
            while i < codes.len() && codes[i] != 0 {
                i += 1;
            }
            if i - onset >= min_hold {
                events.push(MarkerEvent {
                    sample_index: onset,
                    code: codes[onset],
                });
            }
        } else {
            i += 1;
        }
    }

    events
}

/// Stimulus events split by condition
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEvents {
    pub up: Vec<MarkerEvent>,
    pub down: Vec<MarkerEvent>,
    pub up_channel: String,
    pub down_channel: String,
}

impl ClassifiedEvents {
    pub fn events(&self, condition: Condition) -> &[MarkerEvent] {
        match condition {
            Condition::Up => &self.up,
            Condition::Down => &self.down,
        }
    }

    pub fn count(&self, condition: Condition) -> usize {
        self.events(condition).len()
    }

    pub fn status_message(&self) -> String {
        format!(
            "{} up triangles found\n{} down triangles found",
            self.up.len(),
            self.down.len()
        )
    }
}

/// Detect stimulus onsets on both marker channels and label them
///
/// Up triangles are shown less often than down triangles, so the channel
/// with fewer onsets is "up". On a tie the first channel is "up".
pub fn classify_stimuli(
    signal: &SignalContainer,
    stim_channels: &[String],
    min_duration_samples: usize,
) -> Result<ClassifiedEvents> {
    let [first, second] = stim_channels else {
        return Err(ErpError::InvalidParameter(format!(
            "Exactly two stimulus channels are required, got {}",
            stim_channels.len()
        )));
    };

    log::info!("Finding stimuli signals...");
    let first_events = find_events(signal.samples(first)?, min_duration_samples);
    let second_events = find_events(signal.samples(second)?, min_duration_samples);

    if first_events.len() == second_events.len() {
        log::warn!(
            "'{}' and '{}' both have {} onsets; labelling '{}' as up",
            first,
            second,
            first_events.len(),
            first
        );
    }

    let classified = if second_events.len() < first_events.len() {
        ClassifiedEvents {
            up: second_events,
            down: first_events,
            up_channel: second.clone(),
            down_channel: first.clone(),
        }
    } else {
        ClassifiedEvents {
            up: first_events,
            down: second_events,
            up_channel: first.clone(),
            down_channel: second.clone(),
        }
    };

    log::info!(
        "{} up triangles found on '{}', {} down triangles found on '{}'",
        classified.up.len(),
        classified.up_channel,
        classified.down.len(),
        classified.down_channel
    );

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Channel, ChannelKind};

    fn pulses(n: usize, onsets: &[usize], width: usize) -> Vec<f64> {
        let mut samples = vec![0.0; n];
        for &onset in onsets {
            for s in samples.iter_mut().skip(onset).take(width) {
                *s = 1.0;
            }
        }
        samples
    }

    fn stim_signal(a: Vec<f64>, b: Vec<f64>) -> SignalContainer {
        SignalContainer::new(
            250,
            vec![
                Channel::new("STI0", ChannelKind::Stim, a),
                Channel::new("STI1", ChannelKind::Stim, b),
            ],
        )
        .unwrap()
    }

    fn stim_names() -> Vec<String> {
        vec!["STI0".to_string(), "STI1".to_string()]
    }

    #[test]
    fn test_find_events_rising_edges() {
        let samples = pulses(100, &[10, 40, 70], 3);
        let events = find_events(&samples, 1);
        let onsets: Vec<usize> = events.iter().map(|e| e.sample_index).collect();
        assert_eq!(onsets, vec![10, 40, 70]);
        assert!(events.iter().all(|e| e.code == 1));
    }

    #[test]
    fn test_find_events_ignores_initial_high_and_code_changes() {
        let mut samples = vec![0.0; 20];
        samples[0] = 1.0;
        samples[1] = 1.0;
        samples[5] = 2.0;
        samples[6] = 3.0;
        samples[7] = 3.0;
        let events = find_events(&samples, 1);
        assert_eq!(events, vec![MarkerEvent { sample_index: 5, code: 2 }]);
    }

    #[test]
    fn test_find_events_min_duration() {
        let mut samples = pulses(50, &[10], 1);
        samples[30] = 1.0;
        samples[31] = 1.0;
        assert_eq!(find_events(&samples, 1).len(), 2);
        let long_only = find_events(&samples, 2);
        assert_eq!(long_only.len(), 1);
        assert_eq!(long_only[0].sample_index, 30);
    }

    #[test]
    fn test_find_events_rounds_analog_values() {
        let samples = vec![0.0, 0.2, 0.9, 1.1, 0.4, 0.0];
        let events = find_events(&samples, 1);
        assert_eq!(events, vec![MarkerEvent { sample_index: 2, code: 1 }]);
    }

    #[test]
    fn test_classify_fewer_onsets_is_up() {
        let a = pulses(3000, &[100, 900, 1700], 5);
        let b = pulses(3000, &[300, 500, 700, 1100, 1300, 1500, 1900], 5);
        let classified = classify_stimuli(&stim_signal(a, b), &stim_names(), 1).unwrap();

        assert_eq!(classified.up_channel, "STI0");
        assert_eq!(classified.count(Condition::Up), 3);
        assert_eq!(classified.count(Condition::Down), 7);
        assert_eq!(
            classified.status_message(),
            "3 up triangles found\n7 down triangles found"
        );
    }

    #[test]
    fn test_classify_swaps_when_second_channel_is_rarer() {
        let a = pulses(1000, &[100, 300, 500], 5);
        let b = pulses(1000, &[200], 5);
        let classified = classify_stimuli(&stim_signal(a, b), &stim_names(), 1).unwrap();
        assert_eq!(classified.up_channel, "STI1");
        assert_eq!(classified.down_channel, "STI0");
        assert_eq!(classified.up[0].sample_index, 200);
    }

    #[test]
    fn test_classify_tie_uses_channel_order() {
        let a = pulses(1000, &[100, 300], 5);
        let b = pulses(1000, &[200, 400], 5);
        let classified = classify_stimuli(&stim_signal(a, b), &stim_names(), 1).unwrap();
        assert_eq!(classified.up_channel, "STI0");
        assert_eq!(classified.down_channel, "STI1");
    }

    #[test]
    fn test_classify_unknown_channel() {
        let signal = stim_signal(vec![0.0; 10], vec![0.0; 10]);
        let names = vec!["STI0".to_string(), "STI9".to_string()];
        assert!(matches!(
            classify_stimuli(&signal, &names, 1),
            Err(ErpError::ChannelNotFound(_))
        ));
    }
}
