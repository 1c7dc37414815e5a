//! Firmware version cache
//!
//! The pedal announces its micro and DSP versions on its own schedule; the
//! latest announcement per domain is kept here.

use serde::Serialize;

use crate::protocol::{FirmwareDomain, FirmwareVersion};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareCache {
    pub micro: Option<FirmwareVersion>,
    pub dsp: Option<FirmwareVersion>,
}

impl FirmwareCache {
    /// Record an announcement; returns `true` if it changed the cache
    pub fn update(&mut self, version: FirmwareVersion) -> bool {
        let entry = match version.domain {
            FirmwareDomain::Micro => &mut self.micro,
            FirmwareDomain::Dsp => &mut self.dsp,
        };
        let changed = entry.as_ref() != Some(&version);
        *entry = Some(version);
        changed
    }

    pub fn get(&self, domain: FirmwareDomain) -> Option<FirmwareVersion> {
        match domain {
            FirmwareDomain::Micro => self.micro,
            FirmwareDomain::Dsp => self.dsp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.micro.is_none() && self.dsp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(domain: FirmwareDomain, major: u8, minor: u8) -> FirmwareVersion {
        FirmwareVersion {
            domain,
            major,
            minor,
        }
    }

    #[test]
    fn test_domains_are_independent() {
        let mut cache = FirmwareCache::default();
        assert!(cache.is_empty());

        assert!(cache.update(version(FirmwareDomain::Dsp, 2, 3)));
        assert!(cache.micro.is_none());
        assert_eq!(cache.get(FirmwareDomain::Dsp).unwrap().to_string(), "dsp 2.3");

        assert!(cache.update(version(FirmwareDomain::Micro, 1, 0)));
        assert!(!cache.update(version(FirmwareDomain::Micro, 1, 0)));
        assert_eq!(cache.get(FirmwareDomain::Micro).unwrap().number(), "1.0");
    }
}
