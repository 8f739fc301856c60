use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// bad or missing command line input
    #[error("{0}")]
    Argument(String),

    /// an installer call came back with a status we don't handle
    #[error("{call} failed with status {code} (0x{code:X}): {description}")]
    NativeCall {
        call: &'static str,
        code: u32,
        description: String,
    },

    /// the installer handed back a value we can't make sense of
    #[error("invalid {what} value: {value:?}")]
    DataFormat { what: &'static str, value: String },

    #[error("unable to create log file {}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[cfg(not(windows))]
    #[error("Windows Installer is only available on Windows")]
    Unsupported,
}

impl Error {
    pub fn native(call: &'static str, code: u32) -> Self {
        Error::NativeCall {
            call,
            code,
            description: crate::msi::describe_status(code),
        }
    }

    pub fn data_format(what: &'static str, value: impl Into<String>) -> Self {
        Error::DataFormat {
            what,
            value: value.into(),
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

impl From<pico_args::Error> for Error {
    fn from(e: pico_args::Error) -> Self {
        Error::Argument(e.to_string())
    }
}
