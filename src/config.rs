use std::path::PathBuf;

use crate::direction::DirectionChoice;
use crate::report::OutputFormat;

/// Runtime options for one analysis run, separated from the CLI parsing
/// concerns.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,
    /// Profiler log to read
    pub input: PathBuf,
    /// Intermediate record file to write
    pub records: PathBuf,
    /// Transfer direction of the log
    pub direction: DirectionChoice,
    /// JSON direction descriptor, overrides `direction` when set
    pub direction_config: Option<PathBuf>,
    /// Format of the summary printed to stdout
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: 0,
            input: PathBuf::from("prom.log"),
            records: PathBuf::from("handled_raw.txt"),
            direction: DirectionChoice::Auto,
            direction_config: None,
            format: OutputFormat::Csv,
        }
    }
}
