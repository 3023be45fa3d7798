//! Digital Filter Implementations
//!
//! Butterworth IIR filters built from second-order sections (biquads), run
//! forward and backward for zero phase.

use crate::error::{ErpError, Result};
use crate::signal::SignalContainer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for a bandpass filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Low cutoff in Hz
    pub l_freq: f64,
    /// High cutoff in Hz
    pub h_freq: f64,
    /// Butterworth order of each of the highpass and lowpass halves
    pub order: usize,
    /// Sampling rate in Hz
    pub sample_rate: f64,
}

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Gain at DC (z = 1)
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
pub struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    /// Load the state this section settles into under a constant `input`,
    /// returning the constant output
    fn settle(&mut self, input: f64) -> f64 {
        let c = self.coeffs;
        let output = c.dc_gain() * input;
        self.state.z1 = output - c.b0 * input;
        self.state.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
    gain: f64,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>, gain: f64) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
            gain,
        }
    }

    pub fn sections(&self) -> &[BiquadFilter] {
        &self.sections
    }

    /// Process a single sample through all sections
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input * self.gain;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process a signal and return a new array (input unchanged)
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    /// Put every section in the steady state for a constant input `x0`,
    /// so a signal starting at `x0` produces no start-up step
    pub fn settle(&mut self, x0: f64) {
        let mut input = x0 * self.gain;
        for section in &mut self.sections {
            input = section.settle(input);
        }
    }

    /// Default edge padding, three samples per filter tap
    pub fn default_padlen(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }

    /// Zero-phase filtering: forward pass, then a backward pass over the result
    ///
    /// The signal is extended at both ends by an odd reflection of `padlen`
    /// samples (capped at `len - 1`) and each pass starts from the steady
    /// state of its first sample, which keeps edge transients small.
    pub fn filtfilt(&self, signal: &[f64], padlen: usize) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let padlen = padlen.min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

        let mut filter = self.clone();
        filter.settle(extended[0]);
        let mut forward = filter.filter(&extended);
        forward.reverse();

        filter.settle(forward[0]);
        let mut backward = filter.filter(&forward);
        backward.reverse();

        backward[padlen..padlen + n].to_vec()
    }
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    /// Design a Butterworth bandpass filter (highpass and lowpass cascade)
    pub fn bandpass(low: f64, high: f64, sample_rate: f64, order: usize) -> SosFilter {
        let mut sections = Self::design_highpass(Self::prewarp(low, sample_rate), order);
        sections.extend(Self::design_lowpass(Self::prewarp(high, sample_rate), order));
        SosFilter::new(sections, 1.0)
    }

    /// Prewarp frequency for bilinear transform
    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Damping term 2·sin(θ) of the k-th analog pole pair
    fn pole_damping(k: usize, order: usize) -> f64 {
        let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
        2.0 * theta.sin()
    }

    /// Design lowpass second-order sections
    fn design_lowpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);

        for k in 0..num_sections {
            // For odd order, last section is first-order: H(s) = wn / (s + wn)
            if order % 2 == 1 && k == num_sections - 1 {
                let k_coeff = wn / (1.0 + wn);
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1: k_coeff,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
            } else {
                let alpha = Self::pole_damping(k, order);
                let wn2 = wn * wn;
                let denom = 1.0 + alpha * wn + wn2;

                sections.push(BiquadCoeffs {
                    b0: wn2 / denom,
                    b1: 2.0 * wn2 / denom,
                    b2: wn2 / denom,
                    a1: 2.0 * (wn2 - 1.0) / denom,
                    a2: (1.0 - alpha * wn + wn2) / denom,
                });
            }
        }

        sections
    }

    /// Design highpass second-order sections
    fn design_highpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);

        for k in 0..num_sections {
            if order % 2 == 1 && k == num_sections - 1 {
                // First-order highpass: H(s) = s / (s + wn)
                let k_coeff = 1.0 / (1.0 + wn);
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1: -k_coeff,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
            } else {
                let alpha = Self::pole_damping(k, order);
                let wn2 = wn * wn;
                let denom = 1.0 + alpha * wn + wn2;

                sections.push(BiquadCoeffs {
                    b0: 1.0 / denom,
                    b1: -2.0 / denom,
                    b2: 1.0 / denom,
                    a1: 2.0 * (wn2 - 1.0) / denom,
                    a2: (1.0 - alpha * wn + wn2) / denom,
                });
            }
        }

        sections
    }
}

/// Create a bandpass filter from configuration
pub fn create_filter(config: &FilterConfig) -> Result<SosFilter> {
    let nyquist = config.sample_rate / 2.0;
    if config.order == 0 {
        return Err(ErpError::InvalidParameter(
            "Filter order must be at least 1".to_string(),
        ));
    }
    if config.l_freq <= 0.0 || config.l_freq >= nyquist {
        return Err(ErpError::InvalidParameter(format!(
            "Low cutoff ({} Hz) must be between 0 and Nyquist ({} Hz)",
            config.l_freq, nyquist
        )));
    }
    if config.l_freq >= config.h_freq {
        return Err(ErpError::InvalidParameter(
            "Low cutoff must be less than high cutoff".to_string(),
        ));
    }
    if config.h_freq >= nyquist {
        return Err(ErpError::InvalidParameter(format!(
            "High cutoff ({} Hz) must be less than Nyquist ({} Hz)",
            config.h_freq, nyquist
        )));
    }

    Ok(ButterworthFilter::bandpass(
        config.l_freq,
        config.h_freq,
        config.sample_rate,
        config.order,
    ))
}

/// Zero-phase bandpass of the `picks` channels; every other channel is copied unchanged
pub fn bandpass_filter(
    signal: &SignalContainer,
    l_freq: f64,
    h_freq: f64,
    order: usize,
    picks: &[String],
) -> Result<SignalContainer> {
    let sample_rate = signal.sample_rate() as f64;
    let filter = create_filter(&FilterConfig {
        l_freq,
        h_freq,
        order,
        sample_rate,
    })?;

    let indices: Vec<usize> = picks
        .iter()
        .map(|name| {
            signal
                .channel_index(name)
                .ok_or_else(|| ErpError::ChannelNotFound(name.clone()))
        })
        .collect::<Result<_>>()?;

    // Three cycles of the low cutoff absorb the highpass settling at the edges
    let padlen = filter
        .default_padlen()
        .max((3.0 * sample_rate / l_freq).ceil() as usize);

    log::info!(
        "Bandpass filtering {} channels between {} and {} Hz (order {}, zero-phase)",
        indices.len(),
        l_freq,
        h_freq,
        order
    );

    let channels = signal.channels();
    let filtered: Vec<(usize, Vec<f64>)> = indices
        .par_iter()
        .map(|&idx| (idx, filter.filtfilt(&channels[idx].samples, padlen)))
        .collect();

    signal.with_replaced(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Channel, ChannelKind};

    fn sine(freq: f64, sample_rate: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    /// RMS ratio over the middle of the signal, away from the edges
    fn central_gain(input: &[f64], output: &[f64], margin: usize) -> f64 {
        let n = input.len();
        rms(&output[margin..n - margin]) / rms(&input[margin..n - margin])
    }

    #[test]
    fn test_bandpass_rejects_dc() {
        let mut filter = ButterworthFilter::bandpass(1.5, 8.0, 250.0, 2);
        let out = filter.filter(&vec![1.0; 5000]);
        assert!(out[4999].abs() < 1e-6);
    }

    #[test]
    fn test_sections_are_stable() {
        let filter = ButterworthFilter::bandpass(1.5, 8.0, 250.0, 4);
        assert_eq!(filter.sections().len(), 4);
        for section in filter.sections() {
            let c = section.coeffs();
            assert!(c.a2.abs() < 1.0, "pole radius must be inside unit circle");
            assert!(c.a1.abs() < 1.0 + c.a2);
        }
    }

    #[test]
    fn test_odd_order_design() {
        let mut filter = ButterworthFilter::bandpass(5.0, 20.0, 250.0, 3);
        assert_eq!(filter.sections().len(), 4);
        let out = filter.filter(&vec![1.0; 2000]);
        assert!(out[1999].abs() < 1e-6, "bandpass must reject DC");
    }

    #[test]
    fn test_bandpass_rejects_below_low_cutoff() {
        let sr = 250.0;
        let input = sine(0.5, sr, 12_500, 50.0);
        let filter = ButterworthFilter::bandpass(1.5, 8.0, sr, 4);
        let output = filter.filtfilt(&input, 1000);
        assert_eq!(output.len(), input.len());
        assert!(central_gain(&input, &output, 2500) < 0.02);
    }

    #[test]
    fn test_bandpass_preserves_in_band() {
        let sr = 250.0;
        let input = sine(4.0, sr, 5000, 50.0);
        let filter = ButterworthFilter::bandpass(1.5, 8.0, sr, 4);
        let output = filter.filtfilt(&input, 500);
        let gain = central_gain(&input, &output, 750);
        assert!(gain > 0.95 && gain < 1.02, "gain was {}", gain);
    }

    #[test]
    fn test_filtfilt_is_zero_phase() {
        let sr = 250.0;
        let input = sine(4.0, sr, 5000, 1.0);
        let filter = ButterworthFilter::bandpass(1.5, 8.0, sr, 4);
        let output = filter.filtfilt(&input, 500);
        // In-phase output correlates with the input at lag 0 better than at ±1 sample
        let corr = |lag: isize| -> f64 {
            (1000..4000)
                .map(|i| input[i] * output[(i as isize + lag) as usize])
                .sum()
        };
        assert!(corr(0) > corr(1));
        assert!(corr(0) > corr(-1));
    }

    #[test]
    fn test_filtfilt_short_signal() {
        let filter = ButterworthFilter::bandpass(1.5, 8.0, 250.0, 2);
        assert!(filter.filtfilt(&[], 10).is_empty());
        assert_eq!(filter.filtfilt(&[1.0, 2.0, 3.0], 10).len(), 3);
    }

    #[test]
    fn test_create_filter_validation() {
        let config = FilterConfig {
            l_freq: 8.0,
            h_freq: 1.5,
            order: 4,
            sample_rate: 250.0,
        };
        assert!(create_filter(&config).is_err());

        let config = FilterConfig {
            l_freq: 1.5,
            h_freq: 200.0,
            order: 4,
            sample_rate: 250.0,
        };
        assert!(create_filter(&config).is_err());

        let config = FilterConfig {
            l_freq: 1.5,
            h_freq: 8.0,
            order: 4,
            sample_rate: 250.0,
        };
        assert_eq!(create_filter(&config).unwrap().sections().len(), 4);
    }

    #[test]
    fn test_bandpass_filter_leaves_markers_untouched() {
        let sr = 250;
        let markers: Vec<f64> = (0..5000).map(|i| if i % 500 == 0 { 1.0 } else { 0.0 }).collect();
        let signal = SignalContainer::new(
            sr,
            vec![
                Channel::new("C3", ChannelKind::Eeg, sine(0.5, sr as f64, 5000, 40.0)),
                Channel::new("STI0", ChannelKind::Stim, markers.clone()),
            ],
        )
        .unwrap();

        let filtered = bandpass_filter(&signal, 1.5, 8.0, 4, &["C3".to_string()]).unwrap();
        assert_eq!(filtered.n_samples(), signal.n_samples());
        assert_eq!(filtered.channel_names(), signal.channel_names());
        assert_eq!(filtered.samples("STI0").unwrap(), markers.as_slice());
        let c3 = filtered.samples("C3").unwrap();
        assert!(rms(&c3[1000..4000]) < 1.0);
    }

    #[test]
    fn test_bandpass_filter_unknown_pick() {
        let signal = SignalContainer::new(
            250,
            vec![Channel::new("C3", ChannelKind::Eeg, vec![0.0; 100])],
        )
        .unwrap();
        assert!(matches!(
            bandpass_filter(&signal, 1.5, 8.0, 4, &["O9".to_string()]),
            Err(ErpError::ChannelNotFound(_))
        ));
    }
}
