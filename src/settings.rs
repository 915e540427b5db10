//! Persisted user settings and the last template/report snapshot
//!
//! Both are small JSON documents. Loading never fails: a missing, unreadable
//! or malformed file falls back to defaults (with a warning for anything but a
//! missing file). Saving reports errors to the caller.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Upper-case words that report casing keeps upper-case
pub const DEFAULT_EXCLUDED_WORDS: &[&str] = &[
    "LIRADS", "LI-RADS", "LR", "IV", "VI", "TC", "RM", "TAC", "PET", "BIRADS", "BI-RADS", "PIRADS",
    "PI-RADS", "ACR", "RSNA", "HU", "VCI", "VCS", "VMS", "VMI", "T1", "T2", "FLAIR", "DWI", "ADC",
    "SUV",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    #[serde(rename = "excludedWords")]
    pub excluded_words: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            excluded_words: DEFAULT_EXCLUDED_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Deserialize)]
struct StoredSettings {
    #[serde(rename = "excludedWords")]
    excluded_words: Option<Vec<String>>,
}

impl Settings {
    /// Build settings from user-supplied words (upper-cased, trimmed, empties dropped)
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded_words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_uppercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Load settings, falling back to defaults
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Could not read settings {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<StoredSettings>(&raw) {
            Ok(StoredSettings {
                excluded_words: Some(words),
            }) => Self::from_words(words),
            Ok(_) => Self::default(),
            Err(e) => {
                warn!("Ignoring invalid settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings: {}", path.display()))
    }
}

/// Template and report text as last seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastState {
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub report: String,
}

impl LastState {
    pub fn new(template: impl Into<String>, report: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            report: report.into(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize last state")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write last state: {}", path.display()))
    }

    /// Restore the snapshot, or `None` when there is nothing usable
    pub fn restore(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring invalid last state {}: {}", path.display(), e);
                None
            }
        }
    }

    /// The saved report, when the snapshot holds one
    pub fn recover_report(path: &Path) -> Option<String> {
        Self::restore(path)
            .map(|state| state.report)
            .filter(|report| !report.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert!(settings.excluded_words.contains("LI-RADS"));
        assert_eq!(settings.excluded_words.len(), DEFAULT_EXCLUDED_WORDS.len());
    }

    #[test]
    fn test_words_are_cleaned_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"excludedWords": [" tc ", "", "pet-ct"]}"#).unwrap();
        let settings = Settings::load(&path);
        let words: Vec<&str> = settings.excluded_words.iter().map(|w| w.as_str()).collect();
        assert_eq!(words, vec!["PET-CT", "TC"]);
    }

    #[test]
    fn test_invalid_json_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());

        fs::write(&path, r#"{"other": 1}"#).unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_settings_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::from_words(["rm", "flair"]);
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_last_state_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last.json");
        assert!(LastState::restore(&path).is_none());

        let state = LastState::new("Plantilla.", "Informe.");
        state.save(&path).unwrap();
        assert_eq!(LastState::restore(&path), Some(state));

        fs::write(&path, r#"{"template": "solo plantilla"}"#).unwrap();
        let partial = LastState::restore(&path).unwrap();
        assert_eq!(partial.template, "solo plantilla");
        assert_eq!(partial.report, "");
    }

    #[test]
    fn test_recover_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last.json");
        assert_eq!(LastState::recover_report(&path), None);

        LastState::new("Plantilla.", "").save(&path).unwrap();
        assert_eq!(LastState::recover_report(&path), None);

        LastState::new("Hígado normal.", "Hígado normal. Quiste simple.")
            .save(&path)
            .unwrap();
        assert_eq!(
            LastState::recover_report(&path).as_deref(),
            Some("Hígado normal. Quiste simple.")
        );

        let state = LastState::restore(&path).unwrap();
        let result = crate::compare_documents(
            &state.template,
            &state.report,
            &crate::types::EngineConfig::default(),
        );
        assert_eq!(result.metrics.changed_sentences, 1);
    }
}
