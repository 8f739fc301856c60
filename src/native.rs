// the real msi.dll, only exists on windows

use windows::core::{HRESULT, HSTRING, PWSTR};
use windows::Win32::System::ApplicationInstallationAndServicing::{
    MsiConfigureProductW, MsiEnumRelatedProductsW, MsiGetProductInfoW, MsiSetInternalUI,
    INSTALLLEVEL_DEFAULT, INSTALLSTATE_ABSENT, INSTALLUILEVEL_NONE,
};

use crate::msi::MsiApi;

pub struct NativeMsi;

impl MsiApi for NativeMsi {
    fn enum_related_products(&self, upgrade_code: &str, index: u32, buf: &mut [u16]) -> u32 {
        // second arg is reserved, must be 0
        unsafe {
            MsiEnumRelatedProductsW(
                &HSTRING::from(upgrade_code),
                0,
                index,
                PWSTR(buf.as_mut_ptr()),
            )
        }
    }

    fn get_product_info(
        &self,
        product: &str,
        property: &str,
        buf: &mut [u16],
        len: &mut u32,
    ) -> u32 {
        // len must never claim more room than buf actually has
        *len = (*len).min(buf.len() as u32);
        unsafe {
            MsiGetProductInfoW(
                &HSTRING::from(product),
                &HSTRING::from(property),
                PWSTR(buf.as_mut_ptr()),
                Some(len as *mut u32),
            )
        }
    }

    fn suppress_ui(&self) {
        // returns the previous level, which we never put back
        unsafe {
            MsiSetInternalUI(INSTALLUILEVEL_NONE, None);
        }
    }

    fn configure_product_absent(&self, product: &str) -> u32 {
        // install level is ignored for anything but INSTALLSTATE_DEFAULT
        unsafe {
            MsiConfigureProductW(
                &HSTRING::from(product),
                INSTALLLEVEL_DEFAULT,
                INSTALLSTATE_ABSENT,
            )
        }
    }
}

/// FormatMessage text for a Win32 status, if the system has one.
pub fn system_message(code: u32) -> Option<String> {
    let message = HRESULT::from_win32(code).message().to_string();
    let message = message.trim_end();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
