//! Converter configuration.
//!
//! Settings come from three layers with increasing precedence: defaults
//! supplied here, an optional TOML configuration file, and command-line
//! arguments. The schema mirrors the file layout:
//!
//! ```toml
//! output_file = "out.edm4hep.jsonl"
//! input_files = ["events.toml"]
//!
//! [logging]
//! level = "info"
//!
//! [phdst]
//! max_events = 0            # 0 = unlimited
//!
//! [edm4hep]
//! fix_secondary_hadronic_interactions = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum log level: error, warn, info, debug or trace.
    pub level: String,
}

/// Event-source section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhdstSettings {
    /// Stop after this many converted events; 0 means unlimited.
    pub max_events: u64,
}

/// Conversion section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edm4hepSettings {
    /// Run the secondary-hadronic-interaction repair pass.
    pub fix_secondary_hadronic_interactions: bool,
}

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub output_file: String,
    /// Input designations, forwarded verbatim to the event source.
    pub input_files: Vec<String>,
    pub logging: LoggingSettings,
    pub phdst: PhdstSettings,
    pub edm4hep: Edm4hepSettings,
}

impl Settings {
    /// Load settings from the optional config file over the defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("output_file", "")?
            .set_default::<_, Vec<String>>("input_files", Vec::new())?
            .set_default("logging.level", "info")?
            .set_default("phdst.max_events", 0i64)?
            .set_default("edm4hep.fix_secondary_hadronic_interactions", true)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize::<Settings>())
            .with_context(|| match config_file {
                Some(path) => format!("failed to load config file {}", path.display()),
                None => "failed to build default configuration".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.phdst.max_events, 0);
        assert!(settings.edm4hep.fix_secondary_hadronic_interactions);
        assert!(settings.output_file.is_empty());
        assert!(settings.input_files.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conv.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
            output_file = "out.jsonl"
            input_files = ["a.toml", "b.toml"]

            [phdst]
            max_events = 100

            [edm4hep]
            fix_secondary_hadronic_interactions = false
            "#
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.output_file, "out.jsonl");
        assert_eq!(settings.input_files, ["a.toml", "b.toml"]);
        assert_eq!(settings.phdst.max_events, 100);
        assert!(!settings.edm4hep.fix_secondary_hadronic_interactions);
        // Untouched section keeps its default.
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "output_file = [not toml").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
