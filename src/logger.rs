use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Progress log. Every line goes to the console, and to the log file if one was asked for.
///
/// The file is flushed after each line and once more on drop, so it's complete
/// however the run ends.
pub struct Logger<C: Write = Stdout> {
    console: C,
    file: Option<BufWriter<File>>,
}

impl Logger {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        Self::with_console(io::stdout(), path)
    }
}

impl<C: Write> Logger<C> {
    pub fn with_console(console: C, path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(BufWriter::new(File::create(path).map_err(|source| {
                Error::LogFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?)),
            None => None,
        };
        Ok(Self { console, file })
    }

    pub fn log(&mut self, message: impl Display) -> Result<()> {
        writeln!(self.console, "{message}")?;
        if let Some(file) = &mut self.file {
            writeln!(file, "{message}")?;
            file.flush()?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn console(&self) -> &C {
        &self.console
    }
}

impl<C: Write> Drop for Logger<C> {
    fn drop(&mut self) {
        if let Some(file) = &mut self.file {
            if let Err(e) = file.flush() {
                tracing::warn!("failed to flush log file: {e}");
            }
        }
        if let Err(e) = self.console.flush() {
            tracing::warn!("failed to flush console: {e}");
        }
    }
}
