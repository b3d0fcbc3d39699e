//! Who this pot is on the bus.
//!
//! Commands are addressed by site id. A configured `site_id` wins; a blank
//! one falls back to `flowerpot-` plus the low three bytes of the eFuse MAC,
//! so a fresh board still has a stable address. The boot log prints the
//! shorter `FP-XXYYZZ` tag.

use core::fmt::Write;

use crate::config::SiteId;

pub type MacAddress = [u8; 6];

/// `FP-XXYYZZ`.
pub type ShortTag = heapless::String<16>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub mac: MacAddress,
    pub tag: ShortTag,
    pub site_id: SiteId,
}

impl DeviceIdentity {
    /// Identity for `mac`, answering to `configured` unless it is blank.
    pub fn resolve(configured: &SiteId, mac: MacAddress) -> Self {
        let site_id = if configured.trim().is_empty() {
            mac_site_id(&mac)
        } else {
            configured.clone()
        };
        Self {
            mac,
            tag: short_tag(&mac),
            site_id,
        }
    }

    /// Identity of the board we are running on.
    pub fn of_this_board(configured: &SiteId) -> Self {
        Self::resolve(configured, read_mac())
    }
}

#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the call writes exactly six bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Host builds get a fixed MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn short_tag(mac: &MacAddress) -> ShortTag {
    let mut tag = ShortTag::new();
    // 9 chars, fits.
    let _ = write!(tag, "FP-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    tag
}

pub fn mac_site_id(mac: &MacAddress) -> SiteId {
    let mut site = SiteId::new();
    let _ = write!(site, "flowerpot-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    site
}
