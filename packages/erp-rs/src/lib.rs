pub mod types;
pub mod error;
pub mod signal;
pub mod parser;
pub mod events;
pub mod flash;
pub mod trim;
pub mod filters;
pub mod epochs;
pub mod rejection;
pub mod pipeline;
pub mod export;

pub use types::*;
pub use error::{ErpError, Result};
pub use signal::{Channel, ChannelKind, SignalContainer};
pub use parser::{read_recording, parse_recording, LoadedRecording};
pub use events::{classify_stimuli, find_events, ClassifiedEvents};
pub use flash::detect_flash_groups;
pub use trim::{trim_to_flashes, TrimWindow, TrimmedSignal};
pub use filters::bandpass_filter;
pub use epochs::{extract_epochs, Epoch, EpochCollection, Evoked};
pub use rejection::{reject_artifacts, rejection_statistics, ConditionStats, RejectionStatistics};
pub use pipeline::{AnalysisSummary, ErpAnalysis, ErpPipeline};
pub use export::{export_csv, ExportedFiles};
