use crate::arena::fighter::MAX_HEALTH;
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::vm::DEFAULT_STEP_LIMIT;
use std::env;
use thiserror::Error;

/// Rounds played before a match is declared a draw.
pub const DEFAULT_MAX_ROUNDS: u64 = 10_000;

/// Environment variable overriding [`MatchConfig::step_limit`].
pub const STEP_LIMIT_ENV: &str = "FIGHTVM_STEP_LIMIT";
/// Environment variable overriding [`MatchConfig::max_rounds`].
pub const MAX_ROUNDS_ENV: &str = "FIGHTVM_MAX_ROUNDS";

/// Invalid match setting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{setting}: '{value}' is not a valid number")]
    NotANumber { setting: String, value: String },
    #[error("{setting} must be between {min} and {max}, got {value}")]
    OutOfRange {
        setting: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Tunables of a match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchConfig {
    /// Starting health of both fighters, at most [`MAX_HEALTH`].
    pub max_health: Word,
    /// Instructions allowed per program run.
    pub step_limit: u64,
    /// Rounds played before the match ends undecided.
    pub max_rounds: u64,
    /// Keep comparison flags between runs. When false, flags are lowered
    /// before every run.
    pub share_flags: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_health: MAX_HEALTH,
            step_limit: DEFAULT_STEP_LIMIT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            share_flags: true,
        }
    }
}

impl MatchConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Applies [`STEP_LIMIT_ENV`] and [`MAX_ROUNDS_ENV`] as resolved by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(STEP_LIMIT_ENV) {
            self.step_limit = parse_count(STEP_LIMIT_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_ROUNDS_ENV) {
            self.max_rounds = parse_count(MAX_ROUNDS_ENV, &value)?;
        }
        self.validate()
    }

    /// Checks every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max health", self.max_health.max(0) as u64, 1, MAX_HEALTH as u64)?;
        check_range("step limit", self.step_limit, 1, u64::MAX)?;
        check_range("max rounds", self.max_rounds, 1, u64::MAX)
    }
}

/// Parses a positive count, accepting `_` digit separators.
pub fn parse_count(setting: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .replace('_', "")
        .parse::<u64>()
        .map_err(|_| ConfigError::NotANumber {
            setting: setting.to_string(),
            value: value.to_string(),
        })
}

fn check_range(setting: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            setting,
            value,
            min,
            max,
        })
    }
}
