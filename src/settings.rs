use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::alignment::{AlignmentConfig, BehaviorPolicy};

pub const SETTINGS_FILE_NAME: &str = "settings.json";
const ENDPOINT_ENV: &str = "ASPIRE_LLM_ENDPOINT";
const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/aspire-loop-ai".into(),
            model: None,
            max_tokens: 2048,
            temperature: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvisorSettings {
    pub llm: LlmSettings,
    /// Pause between item analyses in a batch run.
    pub batch_delay_ms: u64,
    pub recent_log_days: i64,
    pub insights_max_age_days: i64,
    pub match_threshold: f64,
    pub behavior_policy: BehaviorPolicy,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            batch_delay_ms: 500,
            recent_log_days: 7,
            insights_max_age_days: 7,
            match_threshold: 0.5,
            behavior_policy: BehaviorPolicy::default(),
        }
    }
}

impl AdvisorSettings {
    /// Pulls day windows and the match threshold back into usable ranges.
    pub fn clamped(mut self) -> Self {
        self.recent_log_days = self.recent_log_days.clamp(1, MAX_WINDOW_DAYS);
        self.insights_max_age_days = self.insights_max_age_days.clamp(1, MAX_WINDOW_DAYS);
        if !self.match_threshold.is_finite() {
            self.match_threshold = AdvisorSettings::default().match_threshold;
        }
        self.match_threshold = self.match_threshold.clamp(0.0, 1.0);
        self
    }

    pub fn alignment_config(&self) -> AlignmentConfig {
        AlignmentConfig {
            match_threshold: self.match_threshold,
            recent_log_days: self.recent_log_days,
            behavior_policy: self.behavior_policy,
            ..AlignmentConfig::default()
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AdvisorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str::<AdvisorSettings>(&contents)
                .unwrap_or_default()
                .clamped()
        } else {
            AdvisorSettings::default()
        };

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                data.llm.endpoint = endpoint;
            }
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Settings that live only in memory, for tests and one-off tools.
    pub fn in_memory(path: PathBuf, settings: AdvisorSettings) -> Self {
        Self {
            path,
            data: RwLock::new(settings.clamped()),
        }
    }

    pub fn get(&self) -> AdvisorSettings {
        self.read().clone()
    }

    pub fn llm(&self) -> LlmSettings {
        self.read().llm.clone()
    }

    pub fn update(&self, settings: AdvisorSettings) -> Result<()> {
        let settings = settings.clamped();
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: AdvisorSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings file {}", self.path.display()))?;
        *self.write() = data.clamped();
        Ok(())
    }

    fn persist(&self, data: &AdvisorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AdvisorSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, AdvisorSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
