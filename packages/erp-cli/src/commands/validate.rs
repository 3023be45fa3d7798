use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use erp_rs::{format_duration, read_recording, ChannelKind, ErpConfig};
use serde::Serialize;

#[derive(Serialize, Default)]
struct ValidateOutput {
    file: String,
    valid: bool,
    sample_rate: Option<u32>,
    header_sample_rate: Option<u32>,
    n_samples: Option<usize>,
    duration: Option<String>,
    eeg_channels: Vec<String>,
    stim_channels: Vec<String>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut config = ErpConfig::default();
    if let Some(sr) = args.sr {
        config.sample_rate = sr;
        config.sample_rate_override = Some(sr);
    }

    let mut result = ValidateOutput {
        file: args.file.clone(),
        ..Default::default()
    };

    match read_recording(&args.file, &config) {
        Ok(loaded) => {
            let signal = &loaded.signal;
            result.valid = true;
            result.sample_rate = Some(signal.sample_rate());
            result.header_sample_rate = loaded.header_sample_rate;
            result.n_samples = Some(signal.n_samples());
            result.duration = Some(format_duration(signal.duration()));
            result.eeg_channels = signal.names_of_kind(ChannelKind::Eeg);
            result.stim_channels = signal.names_of_kind(ChannelKind::Stim);
        }
        Err(e) => result.error = Some(e.to_string()),
    }

    if args.json {
        if let Err(e) = output::write_json(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(ref err) = result.error {
        eprintln!("Error: {}", err);
    } else {
        println!(
            "File '{}' is valid ({} samples at {} Hz, {})",
            args.file,
            result.n_samples.unwrap_or(0),
            result.sample_rate.unwrap_or(0),
            result.duration.as_deref().unwrap_or("")
        );
        println!("  EEG channels: {}", result.eeg_channels.join(", "));
        println!("  Marker channels: {}", result.stim_channels.join(", "));
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::INPUT_ERROR
    }
}
