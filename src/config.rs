//! Configuration for capture and the generated document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::export::DocumentSettings;
use crate::layout::CaptureOptions;

/// Everything the export pipeline can be tuned with. Missing keys in a
/// config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayslipConfig {
    pub capture: CaptureOptions,
    pub document: DocumentSettings,
    /// Title embedded in the PDF metadata and the HTML page.
    pub title: String,
}

impl Default for PayslipConfig {
    fn default() -> Self {
        Self {
            capture: CaptureOptions::default(),
            document: DocumentSettings::default(),
            title: "Payslip".to_string(),
        }
    }
}

impl PayslipConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{Orientation, PageFormat};

    #[test]
    fn defaults() {
        let config = PayslipConfig::default();
        assert_eq!(config.capture.scale, 2.0);
        assert_eq!(config.capture.background, "#ffffff");
        assert_eq!(config.capture.view_width, 794.0);
        assert_eq!(config.document.format, PageFormat::A4);
        assert_eq!(config.document.orientation, Orientation::Portrait);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PayslipConfig::from_json(
            r#"{"capture":{"scale":3,"useCors":false},"document":{"orientation":"landscape"}}"#,
        )
        .unwrap();
        assert_eq!(config.capture.scale, 3.0);
        assert!(!config.capture.use_cors);
        assert_eq!(config.capture.view_width, 794.0);
        assert_eq!(config.document.orientation, Orientation::Landscape);
        assert_eq!(config.title, "Payslip");
    }

    #[test]
    fn bad_json_is_a_config_error() {
        assert!(matches!(
            PayslipConfig::from_json("{"),
            Err(crate::error::Error::Config(_))
        ));
    }
}
