//! FXOS response models.

use serde::{Deserialize, Serialize};

/// Firmware report returned by `/api/sys/firmware/version/mgmt`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareReport {
    /// Firmware packages currently running
    #[serde(default)]
    pub firmware_running: Vec<FirmwareVersion>,
}

/// One running firmware package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareVersion {
    /// Package version, e.g. `2.3(1.58)`
    pub package_version: String,

    /// Component version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Package type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl FirmwareReport {
    /// The first running package, which carries the platform version.
    #[must_use]
    pub fn running(self) -> Option<FirmwareVersion> {
        self.firmware_running.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_report() {
        let report: FirmwareReport = serde_json::from_str(
            r#"{
                "firmwareRunning": [
                    {"packageVersion": "2.3(1.58)", "type": "platform-bundle", "version": "2.3(1.58)"},
                    {"packageVersion": "2.3(1.58)", "type": "blade-controller"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(report.firmware_running.len(), 2);
        let running = report.running().unwrap();
        assert_eq!(running.package_version, "2.3(1.58)");
        assert_eq!(running.kind.as_deref(), Some("platform-bundle"));
    }

    #[test]
    fn test_missing_list_is_empty() {
        let report: FirmwareReport = serde_json::from_str("{}").unwrap();
        assert!(report.running().is_none());
    }
}
