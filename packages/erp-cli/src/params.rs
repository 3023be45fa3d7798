use crate::cli::ConfigArgs;
use crate::exit_codes;
use erp_rs::{ErpConfig, ErpError};
use std::path::Path;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "csv"];

/// Validate a single file path: existence and supported extension.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    if !Path::new(file_path).exists() {
        return Err(format!("Input file not found: {}", file_path));
    }

    let ext = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    if !SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return Err(format!(
            "Unsupported file extension '{}'. Supported: txt, csv",
            ext
        ));
    }

    Ok(())
}

/// Defaults, then the `--config` file, then individual flags.
pub fn build_config(args: &ConfigArgs) -> Result<ErpConfig, String> {
    let mut config = match args.config {
        Some(ref path) => ErpConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => ErpConfig::default(),
    };

    if let Some(l_freq) = args.l_freq {
        config.l_freq = l_freq;
    }
    if let Some(h_freq) = args.h_freq {
        config.h_freq = h_freq;
    }
    if let Some(tmin) = args.tmin {
        config.tmin = tmin;
    }
    if let Some(tmax) = args.tmax {
        config.tmax = tmax;
    }
    if let Some(reject) = args.reject {
        config.reject_threshold = reject;
    }
    if let Some(sr) = args.sr {
        config.sample_rate = sr;
        config.sample_rate_override = Some(sr);
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Exit code for a failed analysis
pub fn exit_code_for(err: &ErpError) -> i32 {
    match err {
        ErpError::FileNotFound(_)
        | ErpError::ParseError(_)
        | ErpError::MissingColumn(_)
        | ErpError::ConfigError(_)
        | ErpError::InvalidParameter(_)
        | ErpError::IoError(_) => exit_codes::INPUT_ERROR,
        ErpError::CalibrationNotFound { .. } => exit_codes::CALIBRATION_FAILURE,
        ErpError::InvalidWindow(_)
        | ErpError::ChannelNotFound(_)
        | ErpError::ShapeMismatch(_)
        | ErpError::EmptyCondition(_)
        | ErpError::AllEpochsRejected { .. }
        | ErpError::CsvError(_) => exit_codes::EXECUTION_ERROR,
    }
}
