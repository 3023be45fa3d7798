//! Process exit codes shared by all subcommands.

pub const SUCCESS: i32 = 0;
/// Bad arguments, unreadable input file or configuration
pub const INPUT_ERROR: i32 = 1;
pub const EXECUTION_ERROR: i32 = 2;
/// Calibration flash groups were not found in the recording
pub const CALIBRATION_FAILURE: i32 = 3;
/// Batch finished with some files failing
pub const PARTIAL_FAILURE: i32 = 4;
