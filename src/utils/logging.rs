use env_logger::Env;

/// Install the process-wide logger. `verbose` lowers the default filter to `debug`;
/// `RUST_LOG` still wins when set. Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "unicore=debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

pub fn print_verbose(verbose: bool, msg: &str) {
    if verbose {
        eprintln!("Verbose: {}", msg);
    }
}

pub struct VerboseLogger {
    enabled: bool,
}

impl VerboseLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Echo to stderr when enabled and always record at debug level
    pub fn log(&self, msg: &str) {
        log::debug!("{}", msg);
        print_verbose(self.enabled, msg);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
