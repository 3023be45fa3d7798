use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "erptool",
    version,
    about = "Event-related potential analysis of triangle-stimulus EEG recordings",
    long_about = "Run ERP analysis on OpenBCI text exports recorded during the up/down triangle task.\n\
                  Recordings must open and close with a calibration flash burst on both marker channels."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run ERP analysis on a recording
    Run(RunArgs),
    /// Run ERP analysis on many recordings
    Batch(BatchArgs),
    /// Check that a recording can be read
    Validate(ValidateArgs),
    /// Show the default analysis configuration
    Defaults(DefaultsArgs),
}

/// Analysis parameters shared by `run` and `batch`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON file with configuration overrides
    #[arg(long, env = "ERPTOOL_CONFIG")]
    pub config: Option<String>,

    /// Bandpass low cutoff in Hz
    #[arg(long)]
    pub l_freq: Option<f64>,

    /// Bandpass high cutoff in Hz
    #[arg(long)]
    pub h_freq: Option<f64>,

    /// Epoch start relative to the stimulus, in seconds
    #[arg(long, allow_hyphen_values = true)]
    pub tmin: Option<f64>,

    /// Epoch end relative to the stimulus, in seconds
    #[arg(long)]
    pub tmax: Option<f64>,

    /// Peak-to-peak rejection threshold in µV
    #[arg(long)]
    pub reject: Option<f64>,

    /// Sampling rate in Hz, overrides the rate stated in the file header
    #[arg(long)]
    pub sr: Option<u32>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Input recording (OpenBCI .txt/.csv export)
    #[arg(long)]
    pub file: String,

    #[command(flatten)]
    pub params: ConfigArgs,

    /// Include per-channel averaged responses in the output
    #[arg(long, default_value_t = false)]
    pub evoked: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write <stem>.csv and "Figure Data.csv" into this directory
    #[arg(long)]
    pub csv_dir: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting recordings (e.g. "data/*.txt")
    #[arg(long, conflicts_with = "files")]
    pub pattern: Option<String>,

    /// Explicit list of recordings
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<String>>,

    #[command(flatten)]
    pub params: ConfigArgs,

    /// Write one <stem>_erp.json per recording here instead of JSON lines on stdout
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Also write CSV data for each recording into <csv-dir>/output_<stem>/
    #[arg(long)]
    pub csv_dir: Option<String>,

    /// Keep going after a recording fails
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List the matching recordings without analyzing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Include per-channel averaged responses in the output
    #[arg(long, default_value_t = false)]
    pub evoked: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input recording path
    #[arg(long)]
    pub file: String,

    /// Sampling rate in Hz, overrides the rate stated in the file header
    #[arg(long)]
    pub sr: Option<u32>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct DefaultsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
