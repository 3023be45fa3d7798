use crate::error::{ErpError, Result};
use crate::signal::{Channel, ChannelKind, SignalContainer};
use crate::types::{format_duration, ErpConfig};
use std::path::Path;

/// Device column holding EEG channel `i`
pub fn eeg_column(i: usize) -> String {
    format!("EXG Channel {}", i)
}

/// Device column holding marker channel `i`
pub fn stim_column(i: usize) -> String {
    format!("Analog Channel {}", i)
}

const SAMPLE_INDEX_COLUMN: &str = "Sample Index";
const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Recording loaded from a device text export
#[derive(Debug, Clone)]
pub struct LoadedRecording {
    pub signal: SignalContainer,
    /// Sample rate stated in the file header, if any
    pub header_sample_rate: Option<u32>,
}

impl LoadedRecording {
    pub fn status_message(&self) -> String {
        format!(
            "Input file loaded successfully\nTotal length of recording: {}",
            format_duration(self.signal.duration())
        )
    }
}

/// Read a device text export from disk
pub fn read_recording<P: AsRef<Path>>(path: P, config: &ErpConfig) -> Result<LoadedRecording> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ErpError::FileNotFound(path.display().to_string()));
    }

    log::info!("Loading input file {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_recording(&content, config)
}

/// Parse the text of a device export
///
/// Lines starting with `%` are header comments. The first other line names
/// the columns; every following non-blank line is one comma separated sample.
/// Only the configured EEG and marker columns (plus sample index/timestamp
/// when present) are parsed, so free-text columns never cause errors.
pub fn parse_recording(content: &str, config: &ErpConfig) -> Result<LoadedRecording> {
    let mut header_sample_rate = None;
    let mut lines = content.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) if line.trim_start().starts_with('%') => {
                if let Some(rate) = parse_sample_rate_comment(line) {
                    header_sample_rate = Some(rate);
                }
            }
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line,
            None => {
                return Err(ErpError::ParseError(
                    "No column header found in input".to_string(),
                ))
            }
        }
    };

    let columns: Vec<&str> = header.split(',').map(|s| s.trim()).collect();
    let find = |name: &str| columns.iter().position(|c| *c == name);

    // (column index, output channel)
    let mut selected: Vec<(usize, String, ChannelKind)> = Vec::new();
    if let Some(idx) = find(SAMPLE_INDEX_COLUMN) {
        selected.push((idx, SAMPLE_INDEX_COLUMN.to_string(), ChannelKind::Misc));
    }
    for (i, name) in config.eeg_channels.iter().enumerate() {
        let column = eeg_column(i);
        let idx = find(&column).ok_or(ErpError::MissingColumn(column))?;
        selected.push((idx, name.clone(), ChannelKind::Eeg));
    }
    for (i, name) in config.stim_channels.iter().enumerate() {
        let column = stim_column(i);
        let idx = find(&column).ok_or(ErpError::MissingColumn(column))?;
        selected.push((idx, name.clone(), ChannelKind::Stim));
    }
    if let Some(idx) = find(TIMESTAMP_COLUMN) {
        selected.push((idx, TIMESTAMP_COLUMN.to_string(), ChannelKind::Misc));
    }

    let max_idx = selected.iter().map(|(idx, _, _)| *idx).max().unwrap_or(0);
    let mut data: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];

    for (line_no, line) in lines {
        if line.trim().is_empty() || line.trim_start().starts_with('%') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() <= max_idx {
            return Err(ErpError::ParseError(format!(
                "Line {} has {} columns, expected at least {}",
                line_no + 1,
                fields.len(),
                max_idx + 1
            )));
        }
        for (slot, (idx, name, _)) in selected.iter().enumerate() {
            let raw = fields[*idx].trim();
            let value = raw.parse::<f64>().map_err(|_| {
                ErpError::ParseError(format!(
                    "Line {}: value '{}' in column '{}' is not numeric",
                    line_no + 1,
                    raw,
                    name
                ))
            })?;
            data[slot].push(value);
        }
    }

    if data.first().map(|c| c.is_empty()).unwrap_or(true) {
        return Err(ErpError::ParseError(
            "Input contains a header but no samples".to_string(),
        ));
    }

    let sample_rate = resolve_sample_rate(header_sample_rate, config);
    let channels = selected
        .into_iter()
        .zip(data)
        .map(|((_, name, kind), samples)| Channel::new(name, kind, samples))
        .collect();
    let signal = SignalContainer::new(sample_rate, channels)?;

    log::info!(
        "Loaded {} channels × {} samples at {} Hz",
        signal.n_channels(),
        signal.n_samples(),
        sample_rate
    );

    Ok(LoadedRecording {
        signal,
        header_sample_rate,
    })
}

/// Caller override first, then the file header, then the configured default
fn resolve_sample_rate(header_sample_rate: Option<u32>, config: &ErpConfig) -> u32 {
    match (config.sample_rate_override, header_sample_rate) {
        (Some(forced), Some(stated)) => {
            if forced != stated {
                log::warn!(
                    "File header states {} Hz; using the requested {} Hz instead",
                    stated,
                    forced
                );
            }
            forced
        }
        (Some(forced), None) => forced,
        (None, Some(stated)) => {
            if stated != config.sample_rate {
                log::warn!(
                    "File header states {} Hz, configured rate is {} Hz; using the header",
                    stated,
                    config.sample_rate
                );
            }
            stated
        }
        (None, None) => config.sample_rate,
    }
}

/// `%Sample Rate = 250 Hz` -> 250
fn parse_sample_rate_comment(line: &str) -> Option<u32> {
    let body = line.trim_start_matches('%').trim();
    if !body.to_ascii_lowercase().starts_with("sample rate") {
        return None;
    }
    let value = body.split('=').nth(1)?;
    value
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0)
        .map(|v| v.round() as u32)
}
