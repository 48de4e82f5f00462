use crate::{cursor::ExpansionLimits, error::LogosError, proof::RootStatedPolicy};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
    sync::{Arc, Mutex},
};

/// Global static variable to hold the preferences provider.
pub static PREFERENCES_PROVIDER: OnceCell<Mutex<Arc<dyn PreferencesProvider>>> = OnceCell::new();

pub const DEFAULT_RECURSIVE_EXPANSION_LIMIT: usize = 300; // inferences
pub const DEFAULT_INFERENCES_PER_CONCLUSION_LIMIT: usize = 5;

pub const RECURSIVE_EXPANSION_LIMIT_DESCRIPTION: &str =
    "The maximal number of inferences unfolded by one expand step";
pub const INFERENCES_PER_CONCLUSION_LIMIT_DESCRIPTION: &str =
    "The maximal number of inferences displayed at once for each conclusion";

/// User-facing explanation settings. Persisted outside the core by a
/// [PreferencesProvider]; the core only consumes the current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationPreferences {
    /// [RECURSIVE_EXPANSION_LIMIT_DESCRIPTION]
    pub recursive_expansion_limit: usize,
    /// [INFERENCES_PER_CONCLUSION_LIMIT_DESCRIPTION]
    pub displayed_inferences_per_conclusion_limit: usize,
    /// How to render a root conclusion that is itself a stated fact.
    #[serde(default)]
    pub root_stated_policy: RootStatedPolicy,
}

impl Default for ExplanationPreferences {
    fn default() -> Self {
        ExplanationPreferences {
            recursive_expansion_limit: DEFAULT_RECURSIVE_EXPANSION_LIMIT,
            displayed_inferences_per_conclusion_limit: DEFAULT_INFERENCES_PER_CONCLUSION_LIMIT,
            root_stated_policy: RootStatedPolicy::default(),
        }
    }
}

impl ExplanationPreferences {
    pub fn limits(&self) -> ExpansionLimits {
        ExpansionLimits {
            per_conclusion_limit: self.displayed_inferences_per_conclusion_limit,
            expansion_step_limit: self.recursive_expansion_limit,
        }
    }

    pub fn reset(&mut self) {
        *self = ExplanationPreferences::default();
    }
}

pub trait PreferencesProvider: Send + Sync {
    fn get_preferences(&self) -> Result<ExplanationPreferences, LogosError>;
    fn set_preferences(&self, prefs: ExplanationPreferences) -> Result<(), LogosError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlPreferencesProvider {
    path: PathBuf,
}

impl TomlPreferencesProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlPreferencesProvider { path }
    }
}

impl PreferencesProvider for TomlPreferencesProvider {
    fn get_preferences(&self) -> Result<ExplanationPreferences, LogosError> {
        tracing::debug!("Attempting to read preferences from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Preferences file not found, returning defaults.");
            return Ok(ExplanationPreferences::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_preferences(&self, prefs: ExplanationPreferences) -> Result<(), LogosError> {
        tracing::debug!("Attempting to write preferences to: {:?}", &self.path);
        let toml_string = toml::to_string(&prefs)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn preferences_roundtrip_through_toml() {
        let dir = TempDir::new().unwrap();
        let provider = TomlPreferencesProvider::new(dir.path().join("preferences.toml"));

        // Missing file yields the documented defaults.
        let prefs = provider.get_preferences().unwrap();
        assert_eq!(prefs, ExplanationPreferences::default());
        assert_eq!(prefs.recursive_expansion_limit, 300);
        assert_eq!(prefs.displayed_inferences_per_conclusion_limit, 5);

        let custom = ExplanationPreferences {
            recursive_expansion_limit: 50,
            displayed_inferences_per_conclusion_limit: 2,
            root_stated_policy: RootStatedPolicy::StatedLeaf,
        };
        provider.set_preferences(custom).unwrap();
        assert_eq!(provider.get_preferences().unwrap(), custom);

        let limits = custom.limits();
        assert_eq!(limits.expansion_step_limit, 50);
        assert_eq!(limits.per_conclusion_limit, 2);
    }
}
