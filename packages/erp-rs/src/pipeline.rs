//! End-to-end ERP analysis over one recording.
//!
//! Stages run in a fixed order and each hands its output to the next:
//! flash detection, trimming, bandpass filtering, event classification,
//! epoch extraction, artifact rejection. The raw signal is only borrowed.

use crate::epochs::{extract_epochs, EpochCollection, Evoked};
use crate::error::{ErpError, Result};
use crate::events::{classify_stimuli, ClassifiedEvents};
use crate::filters::bandpass_filter;
use crate::flash::detect_flash_groups;
use crate::parser::read_recording;
use crate::rejection::{reject_artifacts, rejection_statistics, RejectionStatistics};
use crate::signal::SignalContainer;
use crate::trim::{trim_to_flashes, TrimWindow};
use crate::types::{format_duration, Condition, ErpConfig, FlashGroup};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Configured analysis pipeline
#[derive(Debug, Clone)]
pub struct ErpPipeline {
    config: ErpConfig,
}

impl ErpPipeline {
    pub fn new(config: ErpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ErpConfig {
        &self.config
    }

    /// Load a device text export and analyze it
    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<ErpAnalysis> {
        let loaded = read_recording(path, &self.config)?;
        let load_message = loaded.status_message();
        log::info!("{}", load_message);

        let mut analysis = self.run(&loaded.signal)?;
        analysis.status_messages.insert(0, load_message);
        Ok(analysis)
    }

    /// Analyze an already loaded recording
    pub fn run(&self, raw: &SignalContainer) -> Result<ErpAnalysis> {
        let config = &self.config;
        let mut status_messages = Vec::new();

        let flash_groups = detect_flash_groups(raw, config)?;

        let trimmed = trim_to_flashes(raw, &flash_groups)?;
        status_messages.push(trimmed.status_message());

        let filtered = bandpass_filter(
            &trimmed.signal,
            config.l_freq,
            config.h_freq,
            config.filter_order,
            &config.eeg_channels,
        )?;
        status_messages.push(format!(
            "Bandpass filter applied ({} - {} Hz)",
            config.l_freq, config.h_freq
        ));

        let events = classify_stimuli(&filtered, &config.stim_channels, config.min_duration_samples)?;
        status_messages.push(events.status_message());

        let mut up = extract_epochs(&filtered, &events.up, Condition::Up, config)?;
        let mut down = extract_epochs(&filtered, &events.down, Condition::Down, config)?;
        status_messages.push("Epochs isolated".to_string());

        reject_artifacts(&mut up, config.reject_threshold);
        reject_artifacts(&mut down, config.reject_threshold);
        let statistics = rejection_statistics(&up, &down, config.expected_counts)?;
        status_messages.push(statistics.status_message());

        Ok(ErpAnalysis {
            id: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            config: config.clone(),
            raw_duration: raw.duration(),
            flash_groups,
            trim_window: trimmed.window,
            filtered,
            events,
            up,
            down,
            statistics,
            status_messages,
        })
    }
}

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct ErpAnalysis {
    pub id: String,
    pub created_at: String,
    pub config: ErpConfig,
    /// Seconds of the raw recording
    pub raw_duration: f64,
    pub flash_groups: Vec<FlashGroup>,
    pub trim_window: TrimWindow,
    /// Trimmed signal with the EEG channels bandpass filtered
    pub filtered: SignalContainer,
    pub events: ClassifiedEvents,
    pub up: EpochCollection,
    pub down: EpochCollection,
    pub statistics: RejectionStatistics,
    pub status_messages: Vec<String>,
}

impl ErpAnalysis {
    pub fn epochs(&self, condition: Condition) -> &EpochCollection {
        match condition {
            Condition::Up => &self.up,
            Condition::Down => &self.down,
        }
    }

    pub fn analyzed_duration(&self) -> f64 {
        self.filtered.duration()
    }

    /// Averages of both conditions, up first
    ///
    /// A condition whose epochs were all rejected has no average and is left out.
    pub fn evoked(&self) -> Result<Vec<Evoked>> {
        let mut evoked = Vec::with_capacity(Condition::ALL.len());
        for &condition in Condition::ALL.iter() {
            match self.epochs(condition).average() {
                Ok(average) => evoked.push(average),
                Err(ErpError::AllEpochsRejected { condition, found }) => {
                    log::warn!(
                        "All {} {} epochs were rejected; no {} average",
                        found,
                        condition,
                        condition
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(evoked)
    }

    /// Serializable report without bulk sample data
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            sample_rate: self.filtered.sample_rate(),
            raw_duration: format_duration(self.raw_duration),
            analyzed_duration: format_duration(self.analyzed_duration()),
            trim_window: self.trim_window,
            flash_groups: self.flash_groups.clone(),
            up_channel: self.events.up_channel.clone(),
            down_channel: self.events.down_channel.clone(),
            statistics: self.statistics.clone(),
            config: self.config.clone(),
            status_messages: self.status_messages.clone(),
            evoked: None,
        }
    }

    /// Summary with the per-channel averages attached
    pub fn summary_with_evoked(&self) -> Result<AnalysisSummary> {
        let mut summary = self.summary();
        summary.evoked = Some(self.evoked()?);
        Ok(summary)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub id: String,
    pub created_at: String,
    pub sample_rate: u32,
    pub raw_duration: String,
    pub analyzed_duration: String,
    pub trim_window: TrimWindow,
    pub flash_groups: Vec<FlashGroup>,
    pub up_channel: String,
    pub down_channel: String,
    pub statistics: RejectionStatistics,
    pub config: ErpConfig,
    pub status_messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evoked: Option<Vec<Evoked>>,
}
