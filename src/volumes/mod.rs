//! Volumes module - Detect mounted hot-plug volumes worth indexing.
//!
//! Device enumeration goes through the `VolumeLister` trait:
//! - `LsblkLister` asks `lsblk` on the running host
//! - `StaticLister` returns a fixed listing (tests, dry runs)
//!
//! `detect_volumes` never fails: a broken listing is logged and treated
//! as "no drives found".

pub mod lsblk;

use crate::config::FilterConfig;
use crate::error::DetectError;
use std::path::PathBuf;
use tracing::{debug, warn};

pub use lsblk::{parse_lsblk_output, LsblkLister};

/// One block device as reported by the listing command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockDevice {
    /// Mount point (None if the device is not mounted)
    pub mountpoint: Option<String>,
    /// Whether the device is hot-pluggable (USB sticks, card readers, ...)
    pub hotplug: bool,
}

impl BlockDevice {
    /// Create a descriptor for a device mounted at `mountpoint`.
    pub fn mounted(mountpoint: &str, hotplug: bool) -> Self {
        Self {
            mountpoint: Some(mountpoint.to_string()),
            hotplug,
        }
    }

    /// Create a descriptor for a device without a mount point.
    pub fn unmounted(hotplug: bool) -> Self {
        Self {
            mountpoint: None,
            hotplug,
        }
    }
}

/// Trait for block-device enumeration backends.
pub trait VolumeLister {
    /// Short name for log lines (e.g. "lsblk")
    fn name(&self) -> &str;

    /// List all block devices, in the order the backend reports them.
    fn list_devices(&self) -> Result<Vec<BlockDevice>, DetectError>;
}

/// Decides which mounted devices are external volumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountFilter {
    excluded_mounts: Vec<String>,
    system_prefixes: Vec<String>,
}

impl Default for MountFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl MountFilter {
    /// Create a filter from explicit exclusion lists.
    pub fn new(excluded_mounts: Vec<String>, system_prefixes: Vec<String>) -> Self {
        Self {
            excluded_mounts,
            system_prefixes,
        }
    }

    /// Create a filter from the `[filter]` config section.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.excluded_mounts.clone(), config.system_prefixes.clone())
    }

    /// Check whether a device should be indexed.
    ///
    /// A device qualifies only if it is hot-pluggable, has a non-empty mount
    /// point, that mount point is not an excluded mount and does not start
    /// with any system prefix.
    pub fn accepts(&self, device: &BlockDevice) -> bool {
        if !device.hotplug {
            return false;
        }

        let mount_point = match device.mountpoint.as_deref() {
            Some(mp) if !mp.is_empty() => mp,
            _ => return false,
        };

        if self.excluded_mounts.iter().any(|m| m == mount_point) {
            return false;
        }

        !self
            .system_prefixes
            .iter()
            .any(|prefix| mount_point.starts_with(prefix.as_str()))
    }

    /// Mount paths of all accepted devices, preserving listing order.
    pub fn select(&self, devices: &[BlockDevice]) -> Vec<PathBuf> {
        devices
            .iter()
            .filter(|device| self.accepts(device))
            .filter_map(|device| device.mountpoint.as_ref().map(PathBuf::from))
            .collect()
    }
}

/// Find mounted external volumes.
///
/// Listing failures (command missing, non-zero exit, malformed output) are
/// logged and yield an empty list.
pub fn detect_volumes(lister: &dyn VolumeLister, filter: &MountFilter) -> Vec<PathBuf> {
    let devices = match lister.list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!("[Detect] Error running {}: {}", lister.name(), e);
            return Vec::new();
        }
    };

    debug!("[Detect] {} reported {} devices", lister.name(), devices.len());

    filter.select(&devices)
}

/// Lister that returns a fixed result instead of querying the host.
#[derive(Debug, Clone)]
pub struct StaticLister {
    result: Result<Vec<BlockDevice>, String>,
}

impl StaticLister {
    /// Lister reporting exactly these devices.
    pub fn new(devices: Vec<BlockDevice>) -> Self {
        Self {
            result: Ok(devices),
        }
    }

    /// Lister whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

impl VolumeLister for StaticLister {
    fn name(&self) -> &str {
        "static"
    }

    fn list_devices(&self) -> Result<Vec<BlockDevice>, DetectError> {
        self.result.clone().map_err(DetectError::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_hotplugged_media() {
        let filter = MountFilter::default();
        assert!(filter.accepts(&BlockDevice::mounted("/media/usb1", true)));
        assert!(filter.accepts(&BlockDevice::mounted("/run/media/alice/STICK", true)));
    }

    #[test]
    fn test_rejects_non_hotplug() {
        let filter = MountFilter::default();
        for mount in ["/media/usb1", "/mnt/data", "/", "/home"] {
            assert!(
                !filter.accepts(&BlockDevice::mounted(mount, false)),
                "{} must be rejected when hotplug=false",
                mount
            );
        }
    }

    #[test]
    fn test_rejects_excluded_mounts() {
        let filter = MountFilter::default();
        for mount in ["/", "/boot", "/swap"] {
            assert!(!filter.accepts(&BlockDevice::mounted(mount, true)));
        }
    }

    #[test]
    fn test_rejects_system_prefixes() {
        let filter = MountFilter::default();
        for mount in ["/boot/efi", "/bootstrap", "/efi", "/efi/EFI", "/dev/shm", "/devices"] {
            assert!(
                !filter.accepts(&BlockDevice::mounted(mount, true)),
                "{} must be rejected",
                mount
            );
        }
    }

    #[test]
    fn test_rejects_missing_or_empty_mountpoint() {
        let filter = MountFilter::default();
        assert!(!filter.accepts(&BlockDevice::unmounted(true)));
        assert!(!filter.accepts(&BlockDevice::mounted("", true)));
    }

    #[test]
    fn test_swap_prefix_is_not_excluded() {
        // Only the exact "/swap" mount is excluded, not everything below it.
        let filter = MountFilter::default();
        assert!(filter.accepts(&BlockDevice::mounted("/swapdrive", true)));
    }

    #[test]
    fn test_select_preserves_order() {
        let filter = MountFilter::default();
        let devices = vec![
            BlockDevice::mounted("/media/b", true),
            BlockDevice::mounted("/", false),
            BlockDevice::mounted("/media/a", true),
            BlockDevice::unmounted(true),
        ];
        assert_eq!(
            filter.select(&devices),
            vec![PathBuf::from("/media/b"), PathBuf::from("/media/a")]
        );
    }

    #[test]
    fn test_custom_filter() {
        let filter = MountFilter::new(vec!["/media/backup".to_string()], vec!["/run".to_string()]);
        assert!(!filter.accepts(&BlockDevice::mounted("/media/backup", true)));
        assert!(!filter.accepts(&BlockDevice::mounted("/run/media/x", true)));
        assert!(filter.accepts(&BlockDevice::mounted("/boot", true)));
    }

    #[test]
    fn test_detect_volumes_degrades_on_error() {
        let lister = StaticLister::failing("lsblk exploded");
        assert!(detect_volumes(&lister, &MountFilter::default()).is_empty());
    }

    #[test]
    fn test_detect_volumes_empty_listing() {
        let lister = StaticLister::new(Vec::new());
        assert!(detect_volumes(&lister, &MountFilter::default()).is_empty());
    }

    #[test]
    fn test_detect_volumes_filters() {
        let lister = StaticLister::new(vec![
            BlockDevice::mounted("/", false),
            BlockDevice::mounted("/boot/efi", true),
            BlockDevice::mounted("/media/usb1", true),
        ]);
        assert_eq!(
            detect_volumes(&lister, &MountFilter::default()),
            vec![PathBuf::from("/media/usb1")]
        );
    }
}
