use crate::Result;
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::process::Command;

#[derive(Debug, Clone, Copy)]
pub enum PrivacyPane {
    Accessibility,
    InputMonitoring,
}

impl PrivacyPane {
    fn url(self) -> &'static str {
        match self {
            PrivacyPane::Accessibility => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility"
            }
            PrivacyPane::InputMonitoring => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_ListenEvents"
            }
        }
    }
}

/// Permissions the scroll event tap depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionReport {
    pub accessibility: bool,
    pub input_monitoring: bool,
}

impl PermissionReport {
    pub fn current() -> Result<Self> {
        Ok(Self {
            accessibility: is_accessibility_permission_granted()?,
            input_monitoring: is_input_monitoring_permission_granted()?,
        })
    }

    /// A listen-only tap works with either permission
    pub fn can_observe_scroll_events(&self) -> bool {
        self.accessibility || self.input_monitoring
    }
}

/// Open the specified System Settings privacy pane to guide the user manually.
pub fn open_privacy_pane(pane: PrivacyPane) -> Result<()> {
    let status = Command::new("open")
        .arg(pane.url())
        .status()
        .context("failed to open System Settings")?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("open command returned non-zero status: {status}"))
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use crate::Result;
    use anyhow::anyhow;
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFMutableDictionary;
    use core_foundation::string::CFString;
    use core_foundation_sys::dictionary::CFDictionaryRef;
    use core_foundation_sys::string::CFStringRef;

    type IOHIDRequestType = u32;

    const K_IOHID_REQUEST_TYPE_LISTEN_EVENT: IOHIDRequestType = 1;
    const K_IO_RETURN_SUCCESS: i32 = 0;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
        static kAXTrustedCheckOptionPrompt: CFStringRef;
    }

    #[link(name = "IOKit", kind = "framework")]
    extern "C" {
        fn IOHIDCheckAccess(access_type: IOHIDRequestType) -> bool;
        fn IOHIDRequestAccess(access_type: IOHIDRequestType) -> i32;
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(unsafe { AXIsProcessTrusted() })
    }

    pub fn prompt_accessibility_permission() -> Result<bool> {
        unsafe {
            let mut options = CFMutableDictionary::new();
            let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
            let value = CFBoolean::true_value();
            options.set(key, value);

            Ok(AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()))
        }
    }

    pub fn is_input_monitoring_permission_granted() -> Result<bool> {
        Ok(unsafe { IOHIDCheckAccess(K_IOHID_REQUEST_TYPE_LISTEN_EVENT) })
    }

    pub fn prompt_input_monitoring_permission() -> Result<bool> {
        let status = unsafe { IOHIDRequestAccess(K_IOHID_REQUEST_TYPE_LISTEN_EVENT) };
        if status == K_IO_RETURN_SUCCESS {
            is_input_monitoring_permission_granted()
        } else {
            Err(anyhow!("IOHIDRequestAccess returned status {status}"))
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use crate::Result;

    fn env_flag(name: &str) -> bool {
        std::env::var(name)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(env_flag("TITLESWIPE_PERMISSION_ACCESSIBILITY"))
    }

    pub fn prompt_accessibility_permission() -> Result<bool> {
        Ok(env_flag("TITLESWIPE_PERMISSION_ACCESSIBILITY"))
    }

    pub fn is_input_monitoring_permission_granted() -> Result<bool> {
        Ok(env_flag("TITLESWIPE_PERMISSION_INPUT_MONITORING"))
    }

    pub fn prompt_input_monitoring_permission() -> Result<bool> {
        Ok(env_flag("TITLESWIPE_PERMISSION_INPUT_MONITORING"))
    }
}

pub use platform::{
    is_accessibility_permission_granted, is_input_monitoring_permission_granted,
    prompt_accessibility_permission, prompt_input_monitoring_permission,
};
