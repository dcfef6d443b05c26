use serenity::all::{ApplicationId, ChannelId, GuildId, RoleId};
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_SUPPORT_CHANNEL_ID: &str = "1426147549143634081";
const DEFAULT_UNVERIFIED_ROLE_ID: &str = "1425824087829381151";
const DEFAULT_ADMIN_ROLE_ID: &str = "1425815446187278367";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is not set (or is blank).
    #[error("Missing {0} in the environment.")]
    MissingEnvVar(&'static str),

    /// Value is not a Discord snowflake.
    #[error("{name} is not a valid Discord id: `{value}`")]
    InvalidId { name: &'static str, value: String },

    #[error("ONBOARDING_MODE must be `dm` or `channel`, not `{0}`")]
    InvalidOnboardingMode(String),
}

/// How a newly joined member receives their instructions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnboardingMode {
    /// Direct-message the member
    DirectMessage,
    /// Mention the member in the verification channel
    Channel,
}

/// Bot configuration.  Built once at startup and never re-read.
#[derive(Debug)]
pub struct Config {
    pub discord_token: String,
    pub application_id: ApplicationId,
    pub guild_id: GuildId,
    pub verified_role_id: RoleId,
    pub unverified_role_id: RoleId,
    pub admin_role_id: RoleId,
    pub verification_channel_id: ChannelId,
    pub rules_channel_id: ChannelId,
    pub support_channel_id: ChannelId,
    pub onboarding_mode: OnboardingMode,
}

impl Config {
    /// Load from the process environment, seeded from `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing `.env` is fine; everything may already be exported.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingEnvVar(name))
        };

        let defaulted = |name: &'static str, default: &str| -> String {
            match lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
            {
                Some(value) => value,
                None => {
                    tracing::warn!("{} not set. Using default id {}.", name, default);
                    default.to_owned()
                }
            }
        };

        let discord_token = required("DISCORD_TOKEN")?;
        let application_id = parse_id("CLIENT_ID", required("CLIENT_ID")?, ApplicationId::new)?;
        let guild_id = parse_id("GUILD_ID", required("GUILD_ID")?, GuildId::new)?;
        let verified_role_id = parse_id(
            "VERIFIED_ROLE_ID",
            required("VERIFIED_ROLE_ID")?,
            RoleId::new,
        )?;
        let verification_channel_id = parse_id(
            "VERIFICATION_CHANNEL_ID",
            required("VERIFICATION_CHANNEL_ID")?,
            ChannelId::new,
        )?;
        let rules_channel_id = parse_id(
            "RULES_CHANNEL_ID",
            required("RULES_CHANNEL_ID")?,
            ChannelId::new,
        )?;

        let unverified_role_id = parse_id(
            "UNVERIFIED_ROLE_ID",
            defaulted("UNVERIFIED_ROLE_ID", DEFAULT_UNVERIFIED_ROLE_ID),
            RoleId::new,
        )?;
        let support_channel_id = parse_id(
            "SUPPORT_CHANNEL_ID",
            defaulted("SUPPORT_CHANNEL_ID", DEFAULT_SUPPORT_CHANNEL_ID),
            ChannelId::new,
        )?;
        let admin_role_id = parse_id(
            "ADMIN_ROLE_ID",
            defaulted("ADMIN_ROLE_ID", DEFAULT_ADMIN_ROLE_ID),
            RoleId::new,
        )?;

        let onboarding_mode = match lookup("ONBOARDING_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("dm") => OnboardingMode::DirectMessage,
            Some("channel") => OnboardingMode::Channel,
            Some(other) => return Err(ConfigError::InvalidOnboardingMode(other.to_owned())),
        };

        Ok(Config {
            discord_token,
            application_id,
            guild_id,
            verified_role_id,
            unverified_role_id,
            admin_role_id,
            verification_channel_id,
            rules_channel_id,
            support_channel_id,
            onboarding_mode,
        })
    }
}

// Snowflakes are non-zero u64s.  Zero is rejected here since the id constructors panic on it.
fn parse_id<T>(name: &'static str, value: String, make: fn(u64) -> T) -> Result<T, ConfigError> {
    u64::from_str(&value)
        .ok()
        .filter(|id| *id != 0)
        .map(make)
        .ok_or(ConfigError::InvalidId { name, value })
}
