//! Configuration loading for the Maison Graph service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `MAISON_`, producing a typed [`AppConfig`]. The graph policy constants
//! (suggestion weights, interaction increments, expiry windows) are plain
//! configuration rather than code constants; the defaults are the platform's
//! heuristic values.

use std::{
    collections::BTreeMap,
    env,
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::interaction_event::InteractionKind;

/// Application configuration derived from `MAISON_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Bearer tokens accepted from calling services (comma-separated in env)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_tokens: Vec<String>,
    #[serde(default)]
    pub policy: GraphPolicyConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

/// Relevance weights for suggestion ranking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SuggestionWeights {
    /// Points per mutual connection (default: 10)
    #[serde(default = "default_weight_mutual_connection")]
    pub mutual_connection: i64,
    /// Points for a shared location (default: 20)
    #[serde(default = "default_weight_shared_location")]
    pub shared_location: i64,
    /// Points for a shared professional type (default: 15)
    #[serde(default = "default_weight_shared_professional_type")]
    pub shared_professional_type: i64,
    /// Points per common skill (default: 5)
    #[serde(default = "default_weight_common_skill")]
    pub common_skill: i64,
    /// Points for a non-trivially verified profile (default: 10)
    #[serde(default = "default_weight_verified_profile")]
    pub verified_profile: i64,
}

/// Fixed per-interaction strength increments.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InteractionWeights {
    #[serde(default = "default_increment_message")]
    pub message: i32,
    #[serde(default = "default_increment_profile_view")]
    pub profile_view: i32,
    #[serde(default = "default_increment_opportunity")]
    pub opportunity: i32,
    #[serde(default = "default_increment_endorsement")]
    pub endorsement: i32,
    #[serde(default = "default_increment_recommendation")]
    pub recommendation: i32,
}

impl InteractionWeights {
    pub fn increment_for(&self, kind: InteractionKind) -> i32 {
        match kind {
            InteractionKind::Message => self.message,
            InteractionKind::ProfileView => self.profile_view,
            InteractionKind::Opportunity => self.opportunity,
            InteractionKind::Endorsement => self.endorsement,
            InteractionKind::Recommendation => self.recommendation,
        }
    }
}

/// Strength recalculation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StrengthConfig {
    /// Cap on the attribute-similarity contribution (default: 30)
    #[serde(default = "default_strength_attribute_cap")]
    pub attribute_cap: i32,
    /// Cap on the mutual-connection contribution (default: 25)
    #[serde(default = "default_strength_mutual_cap")]
    pub mutual_cap: i32,
    /// Mutual connections counted at full weight; beyond this each mutual
    /// contributes a single point (default: 5)
    #[serde(default = "default_strength_mutual_threshold")]
    pub mutual_full_weight_threshold: usize,
    /// Interaction events older than this window no longer contribute to a
    /// full recalculation (default: 90)
    #[serde(default = "default_strength_interaction_window_days")]
    pub interaction_window_days: i64,
    /// Cap on the relationship-duration bonus (default: 10)
    #[serde(default = "default_strength_duration_bonus_cap")]
    pub duration_bonus_cap: i32,
    /// Score deltas within this epsilon count as a stable trend (default: 2)
    #[serde(default = "default_strength_trend_epsilon")]
    pub trend_epsilon: i32,
}

/// Graph policy parameters: heuristic values the product tunes over time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GraphPolicyConfig {
    #[serde(default)]
    pub suggestion: SuggestionWeights,
    #[serde(default)]
    pub interaction: InteractionWeights,
    #[serde(default)]
    pub strength: StrengthConfig,
    /// Days before a pending introduction request expires (default: 30)
    #[serde(default = "default_intro_expiry_days")]
    pub intro_expiry_days: i64,
    /// Window within which a repeated (requester, target) introduction
    /// request is rejected as a duplicate (default: 30)
    #[serde(default = "default_duplicate_window_days")]
    pub duplicate_window_days: i64,
    /// Default cap on suggestion results (default: 20, max: 100)
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: u64,
}

/// Expiry sweeper configuration. The sweeper only trims stale rows; expiry
/// correctness is enforced lazily at guard time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SweeperConfig {
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,
    /// Seconds between sweep ticks (default: 3600)
    #[serde(default = "default_sweeper_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    /// Expired pending requests are deleted once older than this many days
    /// past expiry (default: 90)
    #[serde(default = "default_sweeper_retention_days")]
    pub retention_days: i64,
    /// Jitter fraction applied to the tick interval (default: 0.1)
    #[serde(default = "default_sweeper_jitter_factor")]
    pub jitter_factor: f64,
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address '{addr}': {source}")]
    InvalidBindAddr {
        addr: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("{field} out of bounds: {value} (expected {expected})")]
    OutOfBounds {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AppConfig {
    /// Resolve the configured bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.api_bind_addr
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                addr: self.api_bind_addr.clone(),
                source,
            })
    }

    /// JSON rendering of the configuration with secrets redacted.
    pub fn redacted_json(&self) -> Result<String, ConfigError> {
        let mut copy = self.clone();
        copy.service_tokens = copy
            .service_tokens
            .iter()
            .map(|_| "***".to_string())
            .collect();
        Ok(serde_json::to_string(&copy)?)
    }

    /// Validate policy and sweeper bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        self.sweeper.validate()
    }
}

impl GraphPolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("POLICY_STRENGTH_ATTRIBUTE_CAP", self.strength.attribute_cap),
            ("POLICY_STRENGTH_MUTUAL_CAP", self.strength.mutual_cap),
            (
                "POLICY_STRENGTH_DURATION_BONUS_CAP",
                self.strength.duration_bonus_cap,
            ),
        ] {
            if !(0..=100).contains(&value) {
                return Err(ConfigError::OutOfBounds {
                    field,
                    value: value as i64,
                    expected: "0..=100",
                });
            }
        }

        if !(0..=50).contains(&self.strength.trend_epsilon) {
            return Err(ConfigError::OutOfBounds {
                field: "POLICY_STRENGTH_TREND_EPSILON",
                value: self.strength.trend_epsilon as i64,
                expected: "0..=50",
            });
        }

        for (field, value) in [
            ("POLICY_INTRO_EXPIRY_DAYS", self.intro_expiry_days),
            ("POLICY_DUPLICATE_WINDOW_DAYS", self.duplicate_window_days),
            (
                "POLICY_STRENGTH_INTERACTION_WINDOW_DAYS",
                self.strength.interaction_window_days,
            ),
        ] {
            if !(1..=365).contains(&value) {
                return Err(ConfigError::OutOfBounds {
                    field,
                    value,
                    expected: "1..=365",
                });
            }
        }

        if !(1..=100).contains(&self.suggestion_limit) {
            return Err(ConfigError::OutOfBounds {
                field: "POLICY_SUGGESTION_LIMIT",
                value: self.suggestion_limit as i64,
                expected: "1..=100",
            });
        }

        Ok(())
    }
}

impl SweeperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_seconds < 60 {
            return Err(ConfigError::OutOfBounds {
                field: "SWEEPER_TICK_INTERVAL_SECONDS",
                value: self.tick_interval_seconds as i64,
                expected: ">= 60",
            });
        }

        if !(1..=3650).contains(&self.retention_days) {
            return Err(ConfigError::OutOfBounds {
                field: "SWEEPER_RETENTION_DAYS",
                value: self.retention_days,
                expected: "1..=3650",
            });
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidValue {
                field: "SWEEPER_JITTER_FACTOR",
                value: self.jitter_factor.to_string(),
            });
        }

        Ok(())
    }
}

/// Loads configuration from layered `.env` files plus process environment.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration: `.env`, then `.env.<profile>`, then `.env.local`,
    /// then process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut layered = self.collect_layered_env();

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("MAISON_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let config = Self::build(layered)?;
        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> BTreeMap<String, String> {
        let mut layered = BTreeMap::new();

        let mut files = vec![self.base_dir.join(".env")];
        let profile_hint = env::var("MAISON_PROFILE").unwrap_or_else(|_| default_profile());
        files.push(self.base_dir.join(format!(".env.{}", profile_hint)));
        files.push(self.base_dir.join(".env.local"));

        for path in files {
            let Ok(iter) = dotenvy::from_path_iter(&path) else {
                continue;
            };
            for item in iter.flatten() {
                let (key, value) = item;
                if let Some(stripped) = key.strip_prefix("MAISON_") {
                    layered.insert(stripped.to_string(), value);
                }
            }
        }

        layered
    }

    fn build(mut layered: BTreeMap<String, String>) -> Result<AppConfig, ConfigError> {
        let profile = take_string(&mut layered, "PROFILE").unwrap_or_else(default_profile);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url =
            take_string(&mut layered, "DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take_parsed(
            &mut layered,
            "DB_MAX_CONNECTIONS",
            default_db_max_connections,
        )?;
        let db_acquire_timeout_ms = take_parsed(
            &mut layered,
            "DB_ACQUIRE_TIMEOUT_MS",
            default_db_acquire_timeout_ms,
        )?;

        let service_tokens = take_string(&mut layered, "SERVICE_TOKENS")
            .map(|tokens| {
                tokens
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let policy = GraphPolicyConfig {
            suggestion: SuggestionWeights {
                mutual_connection: take_parsed(
                    &mut layered,
                    "POLICY_SUGGESTION_WEIGHT_MUTUAL_CONNECTION",
                    default_weight_mutual_connection,
                )?,
                shared_location: take_parsed(
                    &mut layered,
                    "POLICY_SUGGESTION_WEIGHT_SHARED_LOCATION",
                    default_weight_shared_location,
                )?,
                shared_professional_type: take_parsed(
                    &mut layered,
                    "POLICY_SUGGESTION_WEIGHT_SHARED_PROFESSIONAL_TYPE",
                    default_weight_shared_professional_type,
                )?,
                common_skill: take_parsed(
                    &mut layered,
                    "POLICY_SUGGESTION_WEIGHT_COMMON_SKILL",
                    default_weight_common_skill,
                )?,
                verified_profile: take_parsed(
                    &mut layered,
                    "POLICY_SUGGESTION_WEIGHT_VERIFIED_PROFILE",
                    default_weight_verified_profile,
                )?,
            },
            interaction: InteractionWeights {
                message: take_parsed(
                    &mut layered,
                    "POLICY_INTERACTION_MESSAGE",
                    default_increment_message,
                )?,
                profile_view: take_parsed(
                    &mut layered,
                    "POLICY_INTERACTION_PROFILE_VIEW",
                    default_increment_profile_view,
                )?,
                opportunity: take_parsed(
                    &mut layered,
                    "POLICY_INTERACTION_OPPORTUNITY",
                    default_increment_opportunity,
                )?,
                endorsement: take_parsed(
                    &mut layered,
                    "POLICY_INTERACTION_ENDORSEMENT",
                    default_increment_endorsement,
                )?,
                recommendation: take_parsed(
                    &mut layered,
                    "POLICY_INTERACTION_RECOMMENDATION",
                    default_increment_recommendation,
                )?,
            },
            strength: StrengthConfig {
                attribute_cap: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_ATTRIBUTE_CAP",
                    default_strength_attribute_cap,
                )?,
                mutual_cap: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_MUTUAL_CAP",
                    default_strength_mutual_cap,
                )?,
                mutual_full_weight_threshold: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_MUTUAL_THRESHOLD",
                    default_strength_mutual_threshold,
                )?,
                interaction_window_days: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_INTERACTION_WINDOW_DAYS",
                    default_strength_interaction_window_days,
                )?,
                duration_bonus_cap: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_DURATION_BONUS_CAP",
                    default_strength_duration_bonus_cap,
                )?,
                trend_epsilon: take_parsed(
                    &mut layered,
                    "POLICY_STRENGTH_TREND_EPSILON",
                    default_strength_trend_epsilon,
                )?,
            },
            intro_expiry_days: take_parsed(
                &mut layered,
                "POLICY_INTRO_EXPIRY_DAYS",
                default_intro_expiry_days,
            )?,
            duplicate_window_days: take_parsed(
                &mut layered,
                "POLICY_DUPLICATE_WINDOW_DAYS",
                default_duplicate_window_days,
            )?,
            suggestion_limit: take_parsed(
                &mut layered,
                "POLICY_SUGGESTION_LIMIT",
                default_suggestion_limit,
            )?,
        };

        let sweeper = SweeperConfig {
            enabled: take_parsed(&mut layered, "SWEEPER_ENABLED", default_sweeper_enabled)?,
            tick_interval_seconds: take_parsed(
                &mut layered,
                "SWEEPER_TICK_INTERVAL_SECONDS",
                default_sweeper_tick_interval_seconds,
            )?,
            retention_days: take_parsed(
                &mut layered,
                "SWEEPER_RETENTION_DAYS",
                default_sweeper_retention_days,
            )?,
            jitter_factor: take_parsed(
                &mut layered,
                "SWEEPER_JITTER_FACTOR",
                default_sweeper_jitter_factor,
            )?,
        };

        Ok(AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            service_tokens,
            policy,
            sweeper,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(layered: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    layered.remove(key).filter(|v| !v.is_empty())
}

fn take_parsed<T: FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
    default: fn() -> T,
) -> Result<T, ConfigError> {
    match layered.remove(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: key,
            value: raw,
        }),
        None => Ok(default()),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            service_tokens: Vec::new(),
            policy: GraphPolicyConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            mutual_connection: default_weight_mutual_connection(),
            shared_location: default_weight_shared_location(),
            shared_professional_type: default_weight_shared_professional_type(),
            common_skill: default_weight_common_skill(),
            verified_profile: default_weight_verified_profile(),
        }
    }
}

impl Default for InteractionWeights {
    fn default() -> Self {
        Self {
            message: default_increment_message(),
            profile_view: default_increment_profile_view(),
            opportunity: default_increment_opportunity(),
            endorsement: default_increment_endorsement(),
            recommendation: default_increment_recommendation(),
        }
    }
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            attribute_cap: default_strength_attribute_cap(),
            mutual_cap: default_strength_mutual_cap(),
            mutual_full_weight_threshold: default_strength_mutual_threshold(),
            interaction_window_days: default_strength_interaction_window_days(),
            duration_bonus_cap: default_strength_duration_bonus_cap(),
            trend_epsilon: default_strength_trend_epsilon(),
        }
    }
}

impl Default for GraphPolicyConfig {
    fn default() -> Self {
        Self {
            suggestion: SuggestionWeights::default(),
            interaction: InteractionWeights::default(),
            strength: StrengthConfig::default(),
            intro_expiry_days: default_intro_expiry_days(),
            duplicate_window_days: default_duplicate_window_days(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            tick_interval_seconds: default_sweeper_tick_interval_seconds(),
            retention_days: default_sweeper_retention_days(),
            jitter_factor: default_sweeper_jitter_factor(),
        }
    }
}

fn default_profile() -> String {
    "dev".to_string()
}

fn default_api_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_weight_mutual_connection() -> i64 {
    10
}

fn default_weight_shared_location() -> i64 {
    20
}

fn default_weight_shared_professional_type() -> i64 {
    15
}

fn default_weight_common_skill() -> i64 {
    5
}

fn default_weight_verified_profile() -> i64 {
    10
}

fn default_increment_message() -> i32 {
    2
}

fn default_increment_profile_view() -> i32 {
    1
}

fn default_increment_opportunity() -> i32 {
    3
}

fn default_increment_endorsement() -> i32 {
    5
}

fn default_increment_recommendation() -> i32 {
    10
}

fn default_strength_attribute_cap() -> i32 {
    30
}

fn default_strength_mutual_cap() -> i32 {
    25
}

fn default_strength_mutual_threshold() -> usize {
    5
}

fn default_strength_interaction_window_days() -> i64 {
    90
}

fn default_strength_duration_bonus_cap() -> i32 {
    10
}

fn default_strength_trend_epsilon() -> i32 {
    2
}

fn default_intro_expiry_days() -> i64 {
    30
}

fn default_duplicate_window_days() -> i64 {
    30
}

fn default_suggestion_limit() -> u64 {
    20
}

fn default_sweeper_enabled() -> bool {
    true
}

fn default_sweeper_tick_interval_seconds() -> u64 {
    3_600
}

fn default_sweeper_retention_days() -> i64 {
    90
}

fn default_sweeper_jitter_factor() -> f64 {
    0.1
}
