//! CSV exports of an analysis.
//!
//! Two files per recording:
//! - `<stem>.csv`: the trimmed, filtered EEG plus both marker channels, one
//!   row per sample with a `Time` column in seconds.
//! - `Figure Data.csv`: up and down averages of the figure channels, one row
//!   per epoch sample indexed by time in ms.

use crate::epochs::Evoked;
use crate::error::{ErpError, Result};
use crate::pipeline::ErpAnalysis;
use crate::types::Condition;
use std::fs;
use std::path::{Path, PathBuf};

/// Channels whose averages go into the figure data
pub const FIGURE_CHANNELS: [&str; 4] = ["C3", "C4", "P7", "P8"];

pub const FIGURE_DATA_FILE: &str = "Figure Data.csv";

/// Paths written by [`export_csv`]
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub signal: PathBuf,
    pub figure_data: PathBuf,
}

/// Write both CSV files for `analysis` into `dir`, creating it if needed
pub fn export_csv<P: AsRef<Path>>(analysis: &ErpAnalysis, dir: P, stem: &str) -> Result<ExportedFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let signal = dir.join(format!("{}.csv", stem));
    write_signal_csv(analysis, &signal)?;

    let figure_data = dir.join(FIGURE_DATA_FILE);
    write_figure_data_csv(&analysis.evoked()?, &figure_data)?;

    log::info!("Exported CSV data to {}", dir.display());
    Ok(ExportedFiles {
        signal,
        figure_data,
    })
}

/// Trimmed EEG and marker channels, markers named by condition
pub fn write_signal_csv<P: AsRef<Path>>(analysis: &ErpAnalysis, path: P) -> Result<()> {
    let signal = &analysis.filtered;
    let mut columns: Vec<(String, &[f64])> = Vec::new();
    for name in &analysis.config.eeg_channels {
        columns.push((name.clone(), signal.samples(name)?));
    }
    columns.push((
        "Up Stimulus".to_string(),
        signal.samples(&analysis.events.up_channel)?,
    ));
    columns.push((
        "Down Stimulus".to_string(),
        signal.samples(&analysis.events.down_channel)?,
    ));

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    let mut header = vec![String::new(), "Time".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    writer.write_record(&header)?;

    let sr = signal.sample_rate() as f64;
    for i in 0..signal.n_samples() {
        let mut row = vec![i.to_string(), (i as f64 / sr).to_string()];
        row.extend(columns.iter().map(|(_, samples)| samples[i].to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-channel up/down averages of the figure channels, indexed by time in ms
///
/// A condition missing from `evoked` (every epoch rejected) has no columns.
pub fn write_figure_data_csv<P: AsRef<Path>>(evoked: &[Evoked], path: P) -> Result<()> {
    let times_ms = evoked
        .first()
        .map(|e| e.times_ms.clone())
        .unwrap_or_default();

    let mut header = vec!["time".to_string()];
    let mut columns: Vec<&[f64]> = Vec::new();
    for channel in FIGURE_CHANNELS {
        for condition in Condition::ALL {
            let Some(average) = evoked.iter().find(|e| e.condition == condition) else {
                continue;
            };
            let Some(idx) = average.ch_names.iter().position(|n| n == channel) else {
                continue;
            };
            header.push(format!("{} {}", condition_label(condition), channel));
            columns.push(&average.data[idx]);
        }
    }
    if columns.iter().any(|c| c.len() != times_ms.len()) {
        return Err(ErpError::ShapeMismatch(
            "Averages of the two conditions cover different time ranges".to_string(),
        ));
    }

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(&header)?;
    for (i, t) in times_ms.iter().enumerate() {
        let mut row = vec![format!("{}", t.round() as i64)];
        row.extend(columns.iter().map(|c| c[i].to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn condition_label(condition: Condition) -> &'static str {
    match condition {
        Condition::Up => "Up",
        Condition::Down => "Down",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evoked(condition: Condition, offset: f64) -> Evoked {
        let ch_names: Vec<String> = ["Fp1", "C3", "C4", "P7", "P8"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Evoked {
            condition,
            locations: vec![None; ch_names.len()],
            data: (0..ch_names.len())
                .map(|c| vec![offset + c as f64; 3])
                .collect(),
            ch_names,
            times_ms: vec![-4.0, 0.0, 4.0],
            nave: 2,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_figure_data_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIGURE_DATA_FILE);
        write_figure_data_csv(
            &[evoked(Condition::Up, 0.0), evoked(Condition::Down, 10.0)],
            &path,
        )
        .unwrap();

        let rows = read_rows(&path);
        assert_eq!(
            rows[0],
            vec!["time", "Up C3", "Down C3", "Up C4", "Down C4", "Up P7", "Down P7", "Up P8", "Down P8"]
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][0], "-4");
        assert_eq!(rows[2][1], "1");
        assert_eq!(rows[2][2], "11");
        assert_eq!(rows[3][8], "14");
    }

    #[test]
    fn test_figure_data_without_rejected_condition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FIGURE_DATA_FILE);
        write_figure_data_csv(&[evoked(Condition::Down, 10.0)], &path).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], vec!["time", "Down C3", "Down C4", "Down P7", "Down P8"]);
    }
}
