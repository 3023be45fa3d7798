use crate::cli::BatchArgs;
use crate::commands::run;
use crate::exit_codes;
use crate::output;
use crate::params;
use erp_rs::{AnalysisSummary, ErpPipeline};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One JSON line of batch output
#[derive(Serialize)]
struct BatchRecord<'a> {
    file: &'a str,
    #[serde(flatten)]
    summary: &'a AnalysisSummary,
}

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    // Dry-run mode: print file list and exit
    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let config = match params::build_config(&args.params) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };
    if !args.quiet {
        run::print_parameters(&config);
    }
    let pipeline = match ErpPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let total = files.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut last_error_code = exit_codes::EXECUTION_ERROR;
    let start_time = Instant::now();

    for (i, file_path) in files.iter().enumerate() {
        if !args.quiet {
            eprintln!("[{}/{}] {}...", i + 1, total, file_path);
        }

        let outcome = params::validate_file(file_path)
            .map_err(|msg| (msg, exit_codes::INPUT_ERROR))
            .and_then(|_| {
                let csv_dir = csv_dir_for(&args, file_path);
                run::analyze(&pipeline, file_path, args.evoked, args.quiet, csv_dir.as_deref())
                    .map_err(|e| (e.to_string(), params::exit_code_for(&e)))
            })
            .and_then(|summary| {
                write_record(&args, file_path, &summary)
                    .map_err(|msg| (msg, exit_codes::EXECUTION_ERROR))
            });

        match outcome {
            Ok(()) => succeeded += 1,
            Err((msg, code)) => {
                eprintln!("  Error: {}", msg);
                failed += 1;
                last_error_code = code;
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }

    let elapsed = start_time.elapsed();

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {:.1}s",
            succeeded,
            total,
            failed,
            total,
            elapsed.as_secs_f64()
        );
    }

    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        last_error_code
    }
}

/// Per-file JSON in `--output-dir`, otherwise one compact line on stdout
fn write_record(args: &BatchArgs, file_path: &str, summary: &AnalysisSummary) -> Result<(), String> {
    match args.output_dir {
        Some(ref dir) => {
            let out_path = Path::new(dir).join(output_file_name(file_path));
            output::write_json(summary, args.compact, Some(&out_path))
        }
        None => {
            let record = BatchRecord {
                file: file_path,
                summary,
            };
            output::write_json(&record, true, None)
        }
    }
}

fn output_file_name(file_path: &str) -> String {
    format!("{}_erp.json", run::file_stem(file_path))
}

/// `<csv-dir>/output_<stem>`, one folder per recording
fn csv_dir_for(args: &BatchArgs, file_path: &str) -> Option<PathBuf> {
    args.csv_dir
        .as_ref()
        .map(|dir| Path::new(dir).join(format!("output_{}", run::file_stem(file_path))))
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<String>, String> {
    if let Some(ref pattern) = args.pattern {
        resolve_glob(pattern)
    } else if let Some(ref files) = args.files {
        Ok(files.clone())
    } else {
        Err("One of --pattern or --files must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigArgs;
    use std::fs;

    fn make_batch_args() -> BatchArgs {
        BatchArgs {
            pattern: None,
            files: None,
            params: ConfigArgs::default(),
            output_dir: None,
            csv_dir: None,
            continue_on_error: false,
            dry_run: false,
            evoked: false,
            compact: false,
            quiet: true,
        }
    }

    #[test]
    fn test_resolve_files_no_input() {
        let args = make_batch_args();
        let result = resolve_files(&args);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("must be specified"));
    }

    #[test]
    fn test_resolve_files_explicit_list() {
        let mut args = make_batch_args();
        args.files = Some(vec!["/tmp/a.txt".to_string(), "/tmp/b.txt".to_string()]);
        let result = resolve_files(&args).unwrap();
        assert_eq!(result, vec!["/tmp/a.txt", "/tmp/b.txt"]);
    }

    #[test]
    fn test_resolve_glob_no_matches() {
        let result = resolve_glob("/nonexistent_dir_12345/*.txt").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_resolve_glob_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "").unwrap();
        fs::write(tmp.path().join("a.txt"), "").unwrap();
        fs::write(tmp.path().join("c.edf"), "").unwrap();

        let pattern = format!("{}/*.txt", tmp.path().to_str().unwrap());
        let result = resolve_glob(&pattern).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].ends_with("a.txt"));
        assert!(result[1].ends_with("b.txt"));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("/data/OpenBCI-RAW-2023-05-01.txt"),
            "OpenBCI-RAW-2023-05-01_erp.json"
        );
    }

    #[test]
    fn test_csv_dir_per_recording() {
        let mut args = make_batch_args();
        assert!(csv_dir_for(&args, "/data/session.txt").is_none());

        args.csv_dir = Some("/tmp/exports".to_string());
        assert_eq!(
            csv_dir_for(&args, "/data/session.txt"),
            Some(PathBuf::from("/tmp/exports/output_session"))
        );
    }
}
