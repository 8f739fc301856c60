use std::io::Write;
use std::process::ExitCode;

use tracing::info_span;

use crate::error::Result;
use crate::guid::ProductCode;
use crate::logger::Logger;
use crate::msi::Installer;
use crate::options::Options;
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Uninstalled,
    /// newer than --maxversion
    SkippedNewer,
    /// per-machine install with --peruseronly
    SkippedAllUsers,
}

/// What we learned about one product. Version and scope are only looked up
/// when a filter needs them.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub code: ProductCode,
    pub version: Option<Version>,
    pub all_users: Option<bool>,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub products: Vec<ProductInfo>,
}

impl Summary {
    pub fn found(&self) -> usize {
        self.products.len()
    }

    pub fn uninstalled(&self) -> usize {
        self.products
            .iter()
            .filter(|p| p.outcome == Outcome::Uninstalled)
            .count()
    }
}

/// Uninstalls every product related to the upgrade code that gets past the filters.
///
/// Stops at the first error; products handled before it stay handled.
pub fn run<I, C>(installer: &I, options: &Options, logger: &mut Logger<C>) -> Result<Summary>
where
    I: Installer + ?Sized,
    C: Write,
{
    let products = installer
        .related_products(&options.upgrade_code)
        .collect::<Result<Vec<_>>>()?;
    logger.log(format_args!(
        "Number of related products found: {}",
        products.len()
    ))?;

    let mut summary = Summary {
        products: Vec::with_capacity(products.len()),
    };
    for code in products {
        let _span = info_span!("product", %code).entered();
        summary
            .products
            .push(process(installer, options, logger, code)?);
    }
    Ok(summary)
}

/// Logs how the run ended and picks the exit code: `Done.` and 0, or the
/// error and 1.
pub fn report<C: Write>(result: Result<Summary>, logger: &mut Logger<C>) -> Result<ExitCode> {
    match result {
        Ok(summary) => {
            for product in &summary.products {
                tracing::debug!(
                    product = %product.code,
                    version = ?product.version,
                    all_users = ?product.all_users,
                    outcome = ?product.outcome,
                    "processed"
                );
            }
            logger.log(format_args!(
                "Done. Uninstalled {} of {} related product(s).",
                summary.uninstalled(),
                summary.found()
            ))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            logger.log(format_args!("Error: {e}"))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn process<I, C>(
    installer: &I,
    options: &Options,
    logger: &mut Logger<C>,
    code: ProductCode,
) -> Result<ProductInfo>
where
    I: Installer + ?Sized,
    C: Write,
{
    let mut info = ProductInfo {
        code,
        version: None,
        all_users: None,
        outcome: Outcome::Uninstalled,
    };

    // version goes first, a product it rules out never gets its scope queried
    if let Some(max) = &options.max_version {
        let version = installer.product_version(&code)?;
        info.version = Some(version);
        logger.log(format_args!("Product {code} version: {version}"))?;
        if version > *max {
            logger.log(format_args!(
                "Skipping {code}: version {version} is greater than {max}"
            ))?;
            info.outcome = Outcome::SkippedNewer;
            return Ok(info);
        }
    }

    if options.per_user_only {
        let all_users = installer.is_installed_for_all_users(&code)?;
        info.all_users = Some(all_users);
        logger.log(format_args!(
            "Product {code} installed for all users: {all_users}"
        ))?;
        if all_users {
            logger.log(format_args!("Skipping {code}: installed for all users"))?;
            info.outcome = Outcome::SkippedAllUsers;
            return Ok(info);
        }
    }

    logger.log(format_args!("Uninstalling {code}"))?;
    installer.uninstall(&code, options.silent)?;
    logger.log(format_args!("Uninstalled {code}"))?;
    Ok(info)
}
