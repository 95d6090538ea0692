//! Process-wide logger initialization.

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Initializes a stderr term logger at `level`. Safe to call more than once;
/// later calls are logged and ignored rather than panicking, since a library
/// embedded in more than one binary may race to initialize it.
pub fn init_logger(level: LevelFilter) {
    if let Err(error) = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        log::debug!("logger already initialized: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_init_does_not_panic() {
        init_logger(LevelFilter::Off);
        init_logger(LevelFilter::Off);
    }
}
