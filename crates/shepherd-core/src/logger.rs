use std::{
    io::{self, Write},
    sync::{Mutex, PoisonError},
};

use chrono::Local;
use colored::Colorize;

/// Status logger for service lifecycle events.
///
/// One call writes one line, so concurrent supervision and checker tasks can
/// share the sink without interleaving. Silent unless verbose.
pub struct Logger {
    verbose: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl Logger {
    pub fn new(verbose: bool, output: impl Write + Send + 'static) -> Self {
        Self {
            verbose,
            output: Mutex::new(Box::new(output)),
        }
    }

    #[must_use]
    pub fn stdout(verbose: bool) -> Self {
        Self::new(verbose, io::stdout())
    }

    pub fn info(&self, message: &str) {
        if !self.verbose {
            return;
        }

        let stamp = Local::now().format("%Y/%m/%d %H:%M:%S");
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(output, "{} {stamp} {message}", "INFO:".green());
    }
}
