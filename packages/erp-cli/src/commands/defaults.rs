use crate::cli::DefaultsArgs;
use crate::exit_codes;
use crate::output;
use erp_rs::ErpConfig;

pub fn execute(args: DefaultsArgs) -> i32 {
    let config = ErpConfig::default();

    if args.json {
        if let Err(e) = output::write_json(&config, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        return exit_codes::SUCCESS;
    }

    let expected = config
        .expected_counts
        .map(|c| format!("{} up / {} down", c.up, c.down))
        .unwrap_or_else(|| "-".to_string());
    let rows = [
        ("Sample rate", format!("{} Hz", config.sample_rate)),
        ("Bandpass", format!("{}-{} Hz", config.l_freq, config.h_freq)),
        ("Filter order", config.filter_order.to_string()),
        ("Epoch window", format!("[{}, {}] s", config.tmin, config.tmax)),
        ("Baseline", config.baseline_correction.to_string()),
        ("Reject above", format!("{} µV", config.reject_threshold)),
        (
            "Flash pairing",
            format!("±{} samples", config.flash_tolerance_samples),
        ),
        (
            "Flash groups",
            format!(
                "{} events within {} samples",
                config.flash_group_size, config.flash_span_samples
            ),
        ),
        ("EEG channels", config.eeg_channels.join(", ")),
        ("Marker channels", config.stim_channels.join(", ")),
        ("Expected stimuli", expected),
    ];

    println!("Default ERP configuration:\n");
    for (name, value) in &rows {
        println!("  {:<18} {}", name, value);
    }

    exit_codes::SUCCESS
}
