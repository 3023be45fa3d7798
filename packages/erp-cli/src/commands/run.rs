use crate::cli::RunArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use erp_rs::{export_csv, AnalysisSummary, ErpConfig, ErpPipeline};
use std::path::Path;

pub fn execute(args: RunArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let config = match params::build_config(&args.params) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Running ERP analysis on {}...", args.file);
        print_parameters(&config);
    }

    let pipeline = match ErpPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let csv_dir = args.csv_dir.as_deref().map(Path::new);
    let summary = match analyze(&pipeline, &args.file, args.evoked, args.quiet, csv_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERP analysis failed: {}", e);
            return params::exit_code_for(&e);
        }
    };

    let output_path = args.output.as_deref().map(Path::new);
    if let Err(e) = output::write_json(&summary, args.compact, output_path) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }
    if !args.quiet {
        if let Some(ref path) = args.output {
            eprintln!("Results written to {}", path);
        }
    }

    exit_codes::SUCCESS
}

/// Run the pipeline on one file and build its report
///
/// With `csv_dir` set, the signal and figure data CSVs are written there too.
pub fn analyze(
    pipeline: &ErpPipeline,
    file: &str,
    evoked: bool,
    quiet: bool,
    csv_dir: Option<&Path>,
) -> erp_rs::Result<AnalysisSummary> {
    let analysis = pipeline.run_file(file)?;
    if !quiet {
        for message in &analysis.status_messages {
            for line in message.lines() {
                eprintln!("  {}", line);
            }
        }
    }

    if let Some(dir) = csv_dir {
        let exported = export_csv(&analysis, dir, &file_stem(file))?;
        if !quiet {
            eprintln!(
                "  CSV data written to {} and {}",
                exported.signal.display(),
                exported.figure_data.display()
            );
        }
    }

    if evoked {
        analysis.summary_with_evoked()
    } else {
        Ok(analysis.summary())
    }
}

/// Input file name without directory or extension
pub fn file_stem(file_path: &str) -> String {
    Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

pub fn print_parameters(config: &ErpConfig) {
    eprintln!("  Bandpass: {}-{} Hz", config.l_freq, config.h_freq);
    eprintln!("  Epoch: [{}, {}] s", config.tmin, config.tmax);
    eprintln!("  Reject: peak-to-peak > {} µV", config.reject_threshold);
}
