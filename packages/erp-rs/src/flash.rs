//! Calibration flash detection.
//!
//! The stimulus video opens and closes with a burst of flashes that light
//! both marker channels at once. Those two bursts bracket the usable part of
//! the recording.

use crate::error::{ErpError, Result};
use crate::events::find_events;
use crate::signal::SignalContainer;
use crate::types::{ErpConfig, FlashGroup, MarkerEvent};

/// Events on `a` that have a partner on `b` within `tolerance` samples
///
/// One entry is produced per matching (a, b) pair, carrying the `a` event,
/// in order of `a` then `b`.
pub fn pair_simultaneous(
    a: &[MarkerEvent],
    b: &[MarkerEvent],
    tolerance: usize,
) -> Vec<MarkerEvent> {
    let mut combined = Vec::new();
    for event in a {
        for partner in b {
            if event.sample_index.abs_diff(partner.sample_index) <= tolerance {
                combined.push(*event);
            }
        }
    }
    combined
}

/// Scan for runs of `group_size` consecutive events spanning at most `max_span` samples
///
/// Runs never overlap: after a hit the scan resumes right after the group,
/// otherwise it advances by one event.
pub fn group_flashes(
    combined: &[MarkerEvent],
    group_size: usize,
    max_span: usize,
) -> Vec<FlashGroup> {
    let mut groups = Vec::new();
    if group_size == 0 {
        return groups;
    }

    let mut i = 0;
    while i + group_size <= combined.len() {
        let first = combined[i].sample_index;
        let last = combined[i + group_size - 1].sample_index;
        if last.saturating_sub(first) <= max_span {
            groups.push(FlashGroup {
                events: combined[i..i + group_size].to_vec(),
            });
            i += group_size;
        } else {
            i += 1;
        }
    }

    groups
}

/// Locate the opening and closing flash groups of a recording
///
/// Fails with [`ErpError::CalibrationNotFound`] unless exactly
/// `config.expected_flash_events` events end up grouped.
pub fn detect_flash_groups(signal: &SignalContainer, config: &ErpConfig) -> Result<Vec<FlashGroup>> {
    let [first, second] = config.stim_channels.as_slice() else {
        return Err(ErpError::InvalidParameter(format!(
            "Exactly two stimulus channels are required, got {}",
            config.stim_channels.len()
        )));
    };

    let a = find_events(signal.samples(first)?, config.min_duration_samples);
    let b = find_events(signal.samples(second)?, config.min_duration_samples);
    log::debug!("Marker onsets: {} on '{}', {} on '{}'", a.len(), first, b.len(), second);

    let combined = pair_simultaneous(&a, &b, config.flash_tolerance_samples);
    log::debug!("{} simultaneous onsets", combined.len());

    let groups = group_flashes(&combined, config.flash_group_size, config.flash_span_samples);
    let found: usize = groups.iter().map(|g| g.events.len()).sum();

    if found != config.expected_flash_events {
        log::error!(
            "Didn't find the signal flashes: {} grouped events, expected {}",
            found,
            config.expected_flash_events
        );
        return Err(ErpError::CalibrationNotFound {
            found,
            expected: config.expected_flash_events,
        });
    }

    log::info!(
        "Found {} flash groups at samples {:?}",
        groups.len(),
        groups
            .iter()
            .map(|g| (g.first_sample().unwrap_or(0), g.last_sample().unwrap_or(0)))
            .collect::<Vec<_>>()
    );

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Channel, ChannelKind};

    fn ev(sample_index: usize) -> MarkerEvent {
        MarkerEvent {
            sample_index,
            code: 1,
        }
    }

    fn burst(start: usize) -> Vec<usize> {
        (0..5).map(|k| start + k * 40).collect()
    }

    fn marker_signal(n: usize, a_onsets: &[usize], b_onsets: &[usize]) -> SignalContainer {
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        for &o in a_onsets {
            a[o..o + 5].iter_mut().for_each(|s| *s = 1.0);
        }
        for &o in b_onsets {
            b[o..o + 5].iter_mut().for_each(|s| *s = 1.0);
        }
        SignalContainer::new(
            250,
            vec![
                Channel::new("STI0", ChannelKind::Stim, a),
                Channel::new("STI1", ChannelKind::Stim, b),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_pairing_tolerance() {
        let a = vec![ev(100), ev(200), ev(300)];
        let b = vec![ev(110), ev(216), ev(285)];
        let combined = pair_simultaneous(&a, &b, 15);
        let onsets: Vec<usize> = combined.iter().map(|e| e.sample_index).collect();
        assert_eq!(onsets, vec![100, 300]);
    }

    #[test]
    fn test_pairing_keeps_every_match() {
        let a = vec![ev(100)];
        let b = vec![ev(95), ev(105)];
        assert_eq!(pair_simultaneous(&a, &b, 15).len(), 2);
    }

    #[test]
    fn test_grouping_is_non_overlapping() {
        let combined: Vec<MarkerEvent> = burst(1000)
            .into_iter()
            .chain(std::iter::once(1200))
            .chain(burst(9000))
            .map(ev)
            .collect();
        let groups = group_flashes(&combined, 5, 250);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].first_sample(), Some(1000));
        assert_eq!(groups[0].last_sample(), Some(1160));
        assert_eq!(groups[1].first_sample(), Some(9000));
    }

    #[test]
    fn test_grouping_span_limit() {
        let spread: Vec<MarkerEvent> = (0..5).map(|k| ev(k * 63)).collect();
        assert!(group_flashes(&spread, 5, 250).is_empty());
        let exact: Vec<MarkerEvent> = (0..5).map(|k| ev(k * 62 + 2)).collect();
        assert_eq!(group_flashes(&exact, 5, 250).len(), 1);
    }

    #[test]
    fn test_detect_two_groups() {
        let mut onsets = burst(500);
        onsets.extend(burst(8000));
        let signal = marker_signal(10_000, &onsets, &onsets);
        let groups = detect_flash_groups(&signal, &ErpConfig::default()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].last_sample(), Some(660));
        assert_eq!(groups[1].first_sample(), Some(8000));
    }

    #[test]
    fn test_detect_ignores_unpaired_stimuli() {
        let mut a_onsets = burst(500);
        a_onsets.extend([2000, 2100, 2200, 2300, 2400]);
        a_onsets.extend(burst(8000));
        let mut b_onsets = burst(500);
        b_onsets.extend(burst(8000));
        let signal = marker_signal(10_000, &a_onsets, &b_onsets);
        let groups = detect_flash_groups(&signal, &ErpConfig::default()).unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_detect_nine_events_fails() {
        let mut onsets = burst(500);
        onsets.extend(burst(8000).into_iter().take(4));
        let signal = marker_signal(10_000, &onsets, &onsets);
        let err = detect_flash_groups(&signal, &ErpConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ErpError::CalibrationNotFound { found: 5, expected: 10 }
        ));
    }

    #[test]
    fn test_detect_three_groups_fails() {
        let mut onsets = burst(500);
        onsets.extend(burst(4000));
        onsets.extend(burst(8000));
        let signal = marker_signal(10_000, &onsets, &onsets);
        assert!(matches!(
            detect_flash_groups(&signal, &ErpConfig::default()),
            Err(ErpError::CalibrationNotFound { found: 15, .. })
        ));
    }
}
