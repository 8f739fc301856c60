mod error;
mod guid;
mod logger;
mod msi;
#[cfg(windows)]
mod native;
mod options;
mod uninstall;
mod version;
mod wide;

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::logger::Logger;
use crate::msi::Msi;
use crate::options::{Command, USAGE};

fn init_tracing() {
    // RUST_LOG=debug to see what the installer calls are doing, goes to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(windows)]
fn installer() -> error::Result<impl msi::Installer> {
    Ok(Msi::new(native::NativeMsi))
}

#[cfg(not(windows))]
fn installer() -> error::Result<Msi<UnsupportedApi>> {
    Err(error::Error::Unsupported)
}

// never constructed, just gives installer() a type off windows
#[cfg(not(windows))]
enum UnsupportedApi {}

#[cfg(not(windows))]
impl msi::MsiApi for UnsupportedApi {
    fn enum_related_products(&self, _: &str, _: u32, _: &mut [u16]) -> u32 {
        match *self {}
    }
    fn get_product_info(&self, _: &str, _: &str, _: &mut [u16], _: &mut u32) -> u32 {
        match *self {}
    }
    fn suppress_ui(&self) {
        match *self {}
    }
    fn configure_product_absent(&self, _: &str) -> u32 {
        match *self {}
    }
}

fn main() -> Result<ExitCode> {
    init_tracing();

    let options = match options::from_env() {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return Ok(ExitCode::from(2));
        }
    };

    // the file gets flushed when the logger drops, whichever way we leave
    let mut logger = Logger::create(options.log_file.as_deref())
        .context("Failed to set up the progress log")?;
    logger.log(format_args!(
        "Arguments: {}",
        options::describe_args(std::env::args_os().skip(1))
    ))?;

    let result = installer().and_then(|msi| uninstall::run(&msi, &options, &mut logger));
    Ok(uninstall::report(result, &mut logger)?)
}
