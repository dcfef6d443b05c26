use crate::{
    commands::{self, OPEN_TICKET_BUTTON, VERIFY_BUTTON},
    directory::{ChannelKind, PostedMessage},
    event::*,
    log_internal,
    logging::*,
    notice::{Button, Embed, Notice},
    plugin::*,
};
use anyhow::Result;
use serenity::all::ChannelId;

/// How far back to look for a prompt posted by an earlier run
const PROMPT_LOOKBACK: u8 = 20;

/// Sets up presence, commands and the standing prompts once connected.
pub struct PluginReady;

#[serenity::async_trait]
impl Plugin for PluginReady {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready { bot_tag, .. } = event else {
            return Ok(EventHandled::No);
        };

        log_internal!("Vintra is online as {}{}{}", Color::User, bot_tag, Color::Default);
        ctx.directory.set_presence("verification requests").await;

        // Each step stands alone; one failing doesn't stop the rest.
        register_commands(ctx).await;
        for prompt in prompts(ctx) {
            if let Err(err) = post_prompt(ctx, &prompt).await {
                tracing::error!("Failed to send {}: {}", prompt.what, err);
            }
        }

        Ok(EventHandled::Yes)
    }
}

async fn register_commands(ctx: &Context<'_>) {
    log_internal!("Registering application commands on startup...");
    match ctx
        .directory
        .register_commands(ctx.cfg.guild_id, commands::declarations())
        .await
    {
        Ok(count) => log_internal!("{} slash commands ready!", count),
        Err(err) => tracing::error!("Failed to register commands on startup: {}", err),
    }
}

/// How to recognize a prompt already in the channel
enum Marker {
    Component(&'static str),
    EmbedTitle(&'static str),
}

impl Marker {
    fn matches(&self, message: &PostedMessage) -> bool {
        match self {
            Marker::Component(id) => message.component_ids.iter().any(|posted| posted == id),
            Marker::EmbedTitle(title) => message.embed_titles.iter().any(|posted| posted == title),
        }
    }
}

/// A standing message the bot keeps in one channel
struct Prompt {
    what: &'static str,
    channel_id: ChannelId,
    marker: Marker,
    notice: Notice,
}

fn prompts(ctx: &Context) -> Vec<Prompt> {
    vec![
        Prompt {
            what: "verification prompt",
            channel_id: ctx.cfg.verification_channel_id,
            marker: Marker::Component(VERIFY_BUTTON),
            notice: Notice::text(
                "📩 **Verification**\nClick the button below to gain access to the server.",
            )
            .with_embed(
                Embed::new("Vintra Verification", 0x5865F2)
                    .description(
                        "Click the **Verify Me** button below to unlock the server. If you have \
                         issues, contact a moderator.",
                    )
                    .footer("Vintra Verification System"),
            )
            .with_button(Button {
                custom_id: VERIFY_BUTTON,
                label: "Verify Me",
                primary: true,
            }),
        },
        Prompt {
            what: "rules message",
            channel_id: ctx.cfg.rules_channel_id,
            marker: Marker::EmbedTitle("Server Rules"),
            notice: Notice::text(
                "📜 **Please read the rules carefully.**\nReacting appropriately or verifying \
                 signifies that you accept these rules.",
            )
            .with_embed(
                Embed::new("Server Rules", 0xED4245)
                    .field(
                        "1. Be respectful",
                        "Treat everyone with respect. No harassment, hate speech, or \
                         discrimination.",
                    )
                    .field(
                        "2. Keep it appropriate",
                        "Avoid NSFW content and follow Discord Terms of Service.",
                    )
                    .field(
                        "3. No spam or advertising",
                        "Do not spam channels or advertise without permission.",
                    )
                    .field(
                        "4. Use channels correctly",
                        "Post topics in the appropriate channels and follow channel descriptions.",
                    )
                    .field(
                        "5. Listen to staff",
                        "Moderators have the final say. Follow their instructions.",
                    )
                    .footer("Vintra Community Guidelines"),
            ),
        },
        Prompt {
            what: "support prompt",
            channel_id: ctx.cfg.support_channel_id,
            marker: Marker::Component(OPEN_TICKET_BUTTON),
            notice: Notice::text(
                "🆘 **Support Desk**\nNeed assistance? Click below to contact the team.",
            )
            .with_embed(
                Embed::new("Need help?", 0x2ECC71)
                    .description(
                        "Click the button below to open a private support ticket with the \
                         Vintra team.",
                    )
                    .footer("Vintra Support"),
            )
            .with_button(Button {
                custom_id: OPEN_TICKET_BUTTON,
                label: "Open Ticket",
                primary: true,
            }),
        },
    ]
}

/// Post `prompt` unless the bot already did so recently.
async fn post_prompt(ctx: &Context<'_>, prompt: &Prompt) -> Result<()> {
    let channel = match ctx.directory.channel(prompt.channel_id).await {
        Ok(channel) if channel.kind == ChannelKind::Text => channel,
        _ => {
            tracing::warn!(
                "Channel for the {} missing or not a text channel.",
                prompt.what
            );
            return Ok(());
        }
    };

    let recent = match ctx
        .directory
        .recent_messages(channel.id, PROMPT_LOOKBACK)
        .await
    {
        Ok(recent) => recent,
        Err(err) => {
            tracing::warn!("Could not read recent messages in {}: {}", channel.color(), err);
            Vec::new()
        }
    };

    let already_posted = recent
        .iter()
        .any(|message| message.author_id == ctx.bot_id && prompt.marker.matches(message));
    if already_posted {
        return Ok(());
    }

    ctx.directory.send_message(channel.id, &prompt.notice).await?;
    log_internal!("Posted {} in {}", prompt.what, channel.color());
    Ok(())
}
