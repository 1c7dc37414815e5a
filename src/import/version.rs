//! Firmware version detection and comparison

use std::cmp::Ordering;

use tracing::warn;

use crate::device::DeviceClient;
use crate::error::SyncError;
use crate::protocol::{command, FirmwareDomain};

/// First firmware with sectioned setlist membership commands
pub const SECTIONED_SETLISTS_SINCE: &str = "1.0.2";

/// Compare dotted versions numerically, field by field; missing fields are zero
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (fields(a), fields(b));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Leading digits of each dot-separated field; `v1.2-beta` reads as `1.2`
fn fields(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .map(|field| {
            let digits: String = field.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// Whether setlist membership is read and written in sections.
///
/// An unknown version is treated as old firmware.
pub fn supports_sectioned_setlists(version: Option<&str>) -> bool {
    version.is_some_and(|v| compare_versions(v, SECTIONED_SETLISTS_SINCE) != Ordering::Less)
}

/// Ask the firmware for its version, falling back to the announced micro version.
///
/// A failed query is recorded in `warnings`; only transport failures are errors.
pub async fn detect_firmware_version(
    device: &dyn DeviceClient,
    warnings: &mut Vec<String>,
) -> Result<Option<String>, SyncError> {
    let reply = device.send_command(command::get_fw_version()).await;
    let queried = match reply {
        Ok(response) => response
            .value_str()
            .or_else(|| response.str_field("version"))
            .map(str::to_string),
        Err(err) if err.is_fatal() => return Err(err.into()),
        Err(err) => {
            let message = format!("Firmware version query failed: {}", err);
            warn!("{}", message);
            warnings.push(message);
            None
        }
    };

    Ok(queried.or_else(|| {
        device
            .cached_firmware(FirmwareDomain::Micro)
            .map(|v| v.number())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(compare_versions("1.0.10", "1.0.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1.0.2"), Ordering::Less);
        assert_eq!(compare_versions("2", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("v1.2-beta", "1.2"), Ordering::Equal);
    }

    #[test]
    fn test_sectioned_gate() {
        assert!(supports_sectioned_setlists(Some("1.0.2")));
        assert!(supports_sectioned_setlists(Some("1.1")));
        assert!(!supports_sectioned_setlists(Some("1.0.1")));
        assert!(!supports_sectioned_setlists(Some("1.0")));
        assert!(!supports_sectioned_setlists(None));
    }
}
