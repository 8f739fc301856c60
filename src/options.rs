use std::ffi::OsString;
use std::path::PathBuf;

use pico_args::Arguments;

use crate::error::{Error, Result};
use crate::guid::UpgradeCode;
use crate::version::Version;

pub const USAGE: &str = "\
Uninstalls every Windows Installer product registered under an upgrade code.

USAGE:
  uninstall-related-products --upgradecode <GUID> [OPTIONS]

OPTIONS:
  --upgradecode <GUID>     Upgrade code of the products to uninstall (required)
  --peruseronly            Only uninstall per-user products. If not specified,
                           both per-user and per-machine products are uninstalled
  --maxversion <VERSION>   Maximum product version to uninstall. Products with a
                           greater version are skipped
  --log <PATH>             Also write progress to this file (overwritten)
  --quiet                  Quiet mode, no user interaction
  -h, --help               Print this help
";

#[derive(Debug, Clone)]
pub struct Options {
    pub upgrade_code: UpgradeCode,
    pub per_user_only: bool,
    pub max_version: Option<Version>,
    pub silent: bool,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum Command {
    Run(Options),
    Help,
}

pub fn from_env() -> Result<Command> {
    parse(Arguments::from_env())
}

pub fn parse(mut args: Arguments) -> Result<Command> {
    if args.contains(["-h", "--help"]) {
        return Ok(Command::Help);
    }

    let options = Options {
        upgrade_code: args.value_from_str("--upgradecode")?,
        per_user_only: args.contains("--peruseronly"),
        max_version: args.opt_value_from_str("--maxversion")?,
        silent: args.contains("--quiet"),
        log_file: args.opt_value_from_str("--log")?,
    };

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(Error::Argument(format!(
            "unexpected argument(s): {}",
            rest.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        )));
    }
    Ok(Command::Run(options))
}

/// Arguments as typed, for the top of the log.
pub fn describe_args(args: impl IntoIterator<Item = OsString>) -> String {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
