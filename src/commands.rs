//! The slash commands and button ids the bot answers to

use crate::moderation::MAX_MUTE_MINUTES;
use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption};

pub const VERIFY_BUTTON: &str = "vintra_verify_button";
pub const OPEN_TICKET_BUTTON: &str = "vintra_open_ticket";
pub const CLOSE_TICKET_BUTTON: &str = "vintra_close_ticket";

pub const VERIFY: &str = "verify";
pub const ANNOUNCE: &str = "announce";
pub const WARN: &str = "warn";
pub const KICK: &str = "kick";
pub const MUTE: &str = "mute";

/// Every command registered against the guild at startup
pub fn declarations() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(VERIFY)
            .description("Gain access to the server by receiving the verification role.")
            .dm_permission(false),
        CreateCommand::new(ANNOUNCE)
            .description("Send an announcement in this channel.")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message",
                    "Announcement message to post.",
                )
                .required(true),
            ),
        CreateCommand::new(WARN)
            .description("Warn a member in the current channel.")
            .dm_permission(false)
            .add_option(target_option("Member to warn."))
            .add_option(reason_option("Reason for the warning.")),
        CreateCommand::new(KICK)
            .description("Kick a member from the server.")
            .dm_permission(false)
            .add_option(target_option("Member to kick."))
            .add_option(reason_option("Reason for the kick.")),
        CreateCommand::new(MUTE)
            .description("Mute a member in the server.")
            .dm_permission(false)
            .add_option(target_option("Member to mute."))
            .add_option(reason_option("Reason for the mute."))
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "duration",
                    "Duration of the mute in minutes (optional, indefinite if not provided).",
                )
                .min_int_value(1)
                .max_int_value(MAX_MUTE_MINUTES)
                .required(false),
            ),
    ]
}

fn target_option(description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::User, "user", description).required(true)
}

fn reason_option(description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, "reason", description).required(false)
}
