//! Typed wrappers over the Windows Installer product API.
//!
//! The raw calls sit behind [`MsiApi`] (status codes and UTF-16 buffers, see
//! `native.rs`); [`Msi`] turns them into typed operations, and the orchestrator
//! only ever sees the [`Installer`] trait.

use std::cell::Cell;
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::{Error, Result};
#[cfg(windows)]
use crate::native::system_message;
use crate::guid::{ProductCode, UpgradeCode};
use crate::version::Version;
use crate::wide::string_from_wide;

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_MORE_DATA: u32 = 234;
pub const ERROR_NO_MORE_ITEMS: u32 = 259;

// 38 chars of registry-format GUID plus the nul
const PRODUCT_CODE_BUF_LEN: usize = 39;
const PROPERTY_BUF_LEN: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// product version, e.g. "2.0.1"
    VersionString,
    /// "0" per-user, "1" per-machine
    AssignmentType,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::VersionString => "VersionString",
            Property::AssignmentType => "AssignmentType",
        }
    }
}

/// Raw msi.dll entry points. Each returns the Win32 status of the call.
pub trait MsiApi {
    /// `MsiEnumRelatedProducts`: writes the product code at `index` into `buf`.
    fn enum_related_products(&self, upgrade_code: &str, index: u32, buf: &mut [u16]) -> u32;

    /// `MsiGetProductInfo`: `len` is the buffer size in, the value length
    /// (without nul) out.
    fn get_product_info(&self, product: &str, property: &str, buf: &mut [u16], len: &mut u32)
        -> u32;

    /// `MsiSetInternalUI(INSTALLUILEVEL_NONE)`. Process wide, never undone.
    fn suppress_ui(&self);

    /// `MsiConfigureProduct` with every feature set to absent.
    fn configure_product_absent(&self, product: &str) -> u32;
}

/// What the uninstall run needs from the installer.
pub trait Installer {
    fn related_products<'a>(
        &'a self,
        upgrade_code: &UpgradeCode,
    ) -> Box<dyn Iterator<Item = Result<ProductCode>> + 'a>;

    fn product_version(&self, product: &ProductCode) -> Result<Version>;

    fn is_installed_for_all_users(&self, product: &ProductCode) -> Result<bool>;

    fn uninstall(&self, product: &ProductCode, silent: bool) -> Result<()>;
}

pub struct Msi<A> {
    api: A,
    ui_suppressed: Cell<bool>,
}

impl<A: MsiApi> Msi<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            ui_suppressed: Cell::new(false),
        }
    }

    pub fn related(&self, upgrade_code: &UpgradeCode) -> RelatedProducts<'_, A> {
        RelatedProducts {
            api: &self.api,
            upgrade_code: upgrade_code.to_string(),
            index: 0,
            done: false,
        }
    }

    fn product_info(&self, product: &ProductCode, property: Property) -> Result<String> {
        let product = product.to_string();
        let mut len = PROPERTY_BUF_LEN;
        let mut buf = vec![0u16; len as usize];
        let mut status = self
            .api
            .get_product_info(&product, property.name(), &mut buf, &mut len);

        if status == ERROR_MORE_DATA {
            // len came back as the value length, leave room for the nul
            len = len.saturating_add(1);
            debug!(%product, property = property.name(), len, "property buffer too small, retrying");
            buf = vec![0u16; len as usize];
            status = self
                .api
                .get_product_info(&product, property.name(), &mut buf, &mut len);
        }

        if status != ERROR_SUCCESS {
            return Err(Error::native("MsiGetProductInfo", status));
        }
        let end = (len as usize).min(buf.len());
        string_from_wide(&buf[..end])
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }
}

impl<A: MsiApi> Installer for Msi<A> {
    fn related_products<'a>(
        &'a self,
        upgrade_code: &UpgradeCode,
    ) -> Box<dyn Iterator<Item = Result<ProductCode>> + 'a> {
        Box::new(self.related(upgrade_code))
    }

    fn product_version(&self, product: &ProductCode) -> Result<Version> {
        self.product_info(product, Property::VersionString)?.parse()
    }

    fn is_installed_for_all_users(&self, product: &ProductCode) -> Result<bool> {
        let assignment = self.product_info(product, Property::AssignmentType)?;
        match assignment.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(Error::data_format("assignment type", assignment)),
        }
    }

    fn uninstall(&self, product: &ProductCode, silent: bool) -> Result<()> {
        if silent && !self.ui_suppressed.get() {
            // stays suppressed until the process exits
            self.api.suppress_ui();
            self.ui_suppressed.set(true);
            debug!("installer UI suppressed");
        }

        let status = self.api.configure_product_absent(&product.to_string());
        if status != ERROR_SUCCESS {
            return Err(Error::native("MsiConfigureProduct", status));
        }
        Ok(())
    }
}

/// Products sharing an upgrade code, one `MsiEnumRelatedProducts` call per item.
///
/// Ends at "no more items" or at the first error. Can't be rewound; call
/// [`Msi::related`] again to start over from index 0.
pub struct RelatedProducts<'a, A> {
    api: &'a A,
    upgrade_code: String,
    index: u32,
    done: bool,
}

impl<A: MsiApi> Iterator for RelatedProducts<'_, A> {
    type Item = Result<ProductCode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = [0u16; PRODUCT_CODE_BUF_LEN];
        let status = self
            .api
            .enum_related_products(&self.upgrade_code, self.index, &mut buf);
        trace!(index = self.index, status, "MsiEnumRelatedProducts");

        match status {
            ERROR_SUCCESS => {
                self.index += 1;
                let product = string_from_wide(&buf).and_then(|s| {
                    s.parse::<ProductCode>()
                        .map_err(|_| Error::data_format("product code", s))
                });
                if product.is_err() {
                    self.done = true;
                }
                Some(product)
            }
            ERROR_NO_MORE_ITEMS => {
                self.done = true;
                None
            }
            other => {
                self.done = true;
                Some(Err(Error::native("MsiEnumRelatedProducts", other)))
            }
        }
    }
}

impl<A: MsiApi> FusedIterator for RelatedProducts<'_, A> {}

/// Human readable text for a Win32 / installer status.
pub fn describe_status(code: u32) -> String {
    system_message(code).unwrap_or_else(|| {
        known_status(code)
            .unwrap_or("unrecognized Windows Installer status")
            .to_string()
    })
}

#[cfg(not(windows))]
fn system_message(_code: u32) -> Option<String> {
    None
}

// the ones you actually run into, for when the system can't tell us
fn known_status(code: u32) -> Option<&'static str> {
    Some(match code {
        87 => "The parameter is incorrect.",
        ERROR_MORE_DATA => "More data is available.",
        ERROR_NO_MORE_ITEMS => "No more data is available.",
        1602 => "User cancelled installation.",
        1603 => "Fatal error during installation.",
        1605 => "This action is only valid for products that are currently installed.",
        1608 => "Unknown property.",
        1610 => "The configuration data for this product is corrupt.",
        1618 => "Another installation is already in progress.",
        1619 => "This installation package could not be opened.",
        3010 => "A restart is required to complete the install.",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide::to_wide;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const UPGRADE: &str = "{6B124A3C-F3F9-480D-82F9-881E0B5663A1}";
    const P1: &str = "{11111111-1111-1111-1111-111111111111}";
    const P2: &str = "{22222222-2222-2222-2222-222222222222}";
    const P3: &str = "{33333333-3333-3333-3333-333333333333}";

    #[derive(Default)]
    struct ScriptedApi {
        products: Vec<&'static str>,
        // (index, status)
        enum_failure: Option<(u32, u32)>,
        // (product, property, value)
        properties: Vec<(&'static str, &'static str, String)>,
        // forced (status, len) answers, used before looking at `properties`
        info_script: RefCell<VecDeque<(u32, u32)>>,
        configure_status: u32,

        enum_calls: RefCell<Vec<(String, u32)>>,
        info_calls: RefCell<Vec<usize>>,
        ui_suppressions: Cell<u32>,
        configured: RefCell<Vec<String>>,
    }

    impl MsiApi for ScriptedApi {
        fn enum_related_products(&self, upgrade_code: &str, index: u32, buf: &mut [u16]) -> u32 {
            self.enum_calls
                .borrow_mut()
                .push((upgrade_code.to_string(), index));
            if let Some((at, status)) = self.enum_failure {
                if at == index {
                    return status;
                }
            }
            match self.products.get(index as usize) {
                Some(product) => {
                    let wide = to_wide(product);
                    buf[..wide.len()].copy_from_slice(&wide);
                    ERROR_SUCCESS
                }
                None => ERROR_NO_MORE_ITEMS,
            }
        }

        fn get_product_info(
            &self,
            product: &str,
            property: &str,
            buf: &mut [u16],
            len: &mut u32,
        ) -> u32 {
            self.info_calls.borrow_mut().push(buf.len());
            if let Some((status, needed)) = self.info_script.borrow_mut().pop_front() {
                *len = needed;
                return status;
            }
            let Some((_, _, value)) = self
                .properties
                .iter()
                .find(|(p, name, _)| *p == product && *name == property)
            else {
                return 1605;
            };
            let wide: Vec<u16> = value.encode_utf16().collect();
            if (*len as usize) < wide.len() + 1 {
                *len = wide.len() as u32;
                return ERROR_MORE_DATA;
            }
            buf[..wide.len()].copy_from_slice(&wide);
            buf[wide.len()] = 0;
            *len = wide.len() as u32;
            ERROR_SUCCESS
        }

        fn suppress_ui(&self) {
            self.ui_suppressions.set(self.ui_suppressions.get() + 1);
        }

        fn configure_product_absent(&self, product: &str) -> u32 {
            self.configured.borrow_mut().push(product.to_string());
            self.configure_status
        }
    }

    fn upgrade() -> UpgradeCode {
        UPGRADE.parse().unwrap()
    }

    fn code(s: &str) -> ProductCode {
        s.parse().unwrap()
    }

    fn native_code(result: Result<impl std::fmt::Debug>) -> u32 {
        match result {
            Err(Error::NativeCall { code, .. }) => code,
            other => panic!("expected a native call error, got {other:?}"),
        }
    }

    #[test]
    fn enumerates_until_no_more_items() {
        let msi = Msi::new(ScriptedApi {
            products: vec![P1, P2],
            ..Default::default()
        });
        let products: Vec<_> = msi.related(&upgrade()).collect::<Result<_>>().unwrap();
        assert_eq!(products, vec![code(P1), code(P2)]);

        let calls = msi.api().enum_calls.borrow();
        let indices: Vec<u32> = calls.iter().map(|(_, i)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(calls.iter().all(|(u, _)| u == UPGRADE));
    }

    #[test]
    fn no_related_products() {
        let msi = Msi::new(ScriptedApi::default());
        assert_eq!(msi.related(&upgrade()).count(), 0);
    }

    #[test]
    fn enumeration_error_ends_the_sequence() {
        let msi = Msi::new(ScriptedApi {
            products: vec![P1, P2, P3],
            enum_failure: Some((1, 1610)),
            ..Default::default()
        });
        let mut products = msi.related(&upgrade());
        assert_eq!(products.next().unwrap().unwrap(), code(P1));
        assert_eq!(native_code(products.next().unwrap()), 1610);
        assert!(products.next().is_none());
        assert_eq!(msi.api().enum_calls.borrow().len(), 2);
    }

    #[test]
    fn exhausted_sequence_stays_exhausted() {
        let msi = Msi::new(ScriptedApi {
            products: vec![P1],
            ..Default::default()
        });
        let mut products = msi.related(&upgrade());
        assert!(products.next().is_some());
        assert!(products.next().is_none());
        assert!(products.next().is_none());
        assert_eq!(msi.api().enum_calls.borrow().len(), 2);

        // starting over goes back to index 0
        assert_eq!(msi.related(&upgrade()).count(), 1);
        assert_eq!(msi.api().enum_calls.borrow()[2].1, 0);
    }

    #[test]
    fn product_version() {
        let msi = Msi::new(ScriptedApi {
            properties: vec![(P1, "VersionString", "2.0.1".into())],
            ..Default::default()
        });
        let version = msi.product_version(&code(P1)).unwrap();
        assert_eq!(version.to_string(), "2.0.1");
        assert_eq!(*msi.api().info_calls.borrow(), vec![256]);
    }

    #[test]
    fn long_value_is_fetched_with_a_bigger_buffer() {
        // leading zeros keep it a valid version while blowing past 256 chars
        let long = format!("1.{}5", "0".repeat(300));
        let msi = Msi::new(ScriptedApi {
            properties: vec![(P1, "VersionString", long.clone())],
            ..Default::default()
        });
        let version = msi.product_version(&code(P1)).unwrap();
        assert_eq!(version, Version::new(1, 5));
        assert_eq!(*msi.api().info_calls.borrow(), vec![256, long.len() + 1]);
    }

    #[test]
    fn more_data_retries_once_with_reported_length() {
        let msi = Msi::new(ScriptedApi {
            properties: vec![(P1, "VersionString", "3.1".into())],
            info_script: RefCell::new(VecDeque::from([(ERROR_MORE_DATA, 299)])),
            ..Default::default()
        });
        assert_eq!(msi.product_version(&code(P1)).unwrap().to_string(), "3.1");
        assert_eq!(*msi.api().info_calls.borrow(), vec![256, 300]);
    }

    #[test]
    fn second_more_data_is_fatal() {
        let msi = Msi::new(ScriptedApi {
            properties: vec![(P1, "VersionString", "3.1".into())],
            info_script: RefCell::new(VecDeque::from([
                (ERROR_MORE_DATA, 299),
                (ERROR_MORE_DATA, 400),
            ])),
            ..Default::default()
        });
        assert_eq!(native_code(msi.product_version(&code(P1))), ERROR_MORE_DATA);
        assert_eq!(msi.api().info_calls.borrow().len(), 2);
    }

    #[test]
    fn failed_retry_is_fatal() {
        let msi = Msi::new(ScriptedApi {
            info_script: RefCell::new(VecDeque::from([(ERROR_MORE_DATA, 299), (1610, 0)])),
            ..Default::default()
        });
        assert_eq!(native_code(msi.product_version(&code(P1))), 1610);
    }

    #[test]
    fn unknown_product() {
        let msi = Msi::new(ScriptedApi::default());
        assert_eq!(native_code(msi.product_version(&code(P2))), 1605);
        assert_eq!(native_code(msi.is_installed_for_all_users(&code(P2))), 1605);
    }

    #[test]
    fn unparseable_version() {
        let msi = Msi::new(ScriptedApi {
            properties: vec![(P1, "VersionString", "two".into())],
            ..Default::default()
        });
        assert!(matches!(
            msi.product_version(&code(P1)),
            Err(Error::DataFormat { what: "version", .. })
        ));
    }

    #[test]
    fn assignment_type() {
        let msi = Msi::new(ScriptedApi {
            properties: vec![
                (P1, "AssignmentType", "1".into()),
                (P2, "AssignmentType", "0".into()),
                (P3, "AssignmentType", "2".into()),
            ],
            ..Default::default()
        });
        assert!(msi.is_installed_for_all_users(&code(P1)).unwrap());
        assert!(!msi.is_installed_for_all_users(&code(P2)).unwrap());
        assert!(matches!(
            msi.is_installed_for_all_users(&code(P3)),
            Err(Error::DataFormat { what: "assignment type", .. })
        ));
    }

    #[test]
    fn silent_uninstall_suppresses_ui_once() {
        let msi = Msi::new(ScriptedApi::default());
        msi.uninstall(&code(P1), true).unwrap();
        msi.uninstall(&code(P2), true).unwrap();
        assert_eq!(msi.api().ui_suppressions.get(), 1);
        assert_eq!(*msi.api().configured.borrow(), vec![P1, P2]);
    }

    #[test]
    fn interactive_uninstall_leaves_ui_alone() {
        let msi = Msi::new(ScriptedApi::default());
        msi.uninstall(&code(P1), false).unwrap();
        assert_eq!(msi.api().ui_suppressions.get(), 0);
        assert_eq!(*msi.api().configured.borrow(), vec![P1]);
    }

    #[test]
    fn uninstall_failure() {
        let msi = Msi::new(ScriptedApi {
            configure_status: 1603,
            ..Default::default()
        });
        let err = msi.uninstall(&code(P1), true).unwrap_err();
        assert!(matches!(err, Error::NativeCall { code: 1603, .. }));
        assert!(err.to_string().starts_with("MsiConfigureProduct failed with status 1603"));
    }

    #[test]
    fn describes_statuses() {
        assert!(!describe_status(1603).is_empty());
        assert!(!describe_status(0xDEAD).is_empty());
    }
}
