use crate::{event::*, interaction::InteractionKind, log_event, logging::*, plugin::*};
use anyhow::Result;

/// Prints debug information about event to stdout
pub struct PluginDebug;

#[serenity::async_trait]
impl Plugin for PluginDebug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, _ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready {
                bot_tag,
                guild_count,
            } => {
                log_event!(
                    "Connected to {} server(s) as {}{}{}",
                    guild_count,
                    Color::User,
                    bot_tag,
                    Color::Default,
                );
            }
            Event::MemberJoin { guild_id, member } => {
                log_event!(
                    "{}{}{} joined",
                    Some(*guild_id).color(),
                    Glue.color(),
                    member.color(),
                );
            }
            Event::Interaction(interaction) => {
                let request = &interaction.request;
                log_event!(
                    "{}{}{}{}{} {} {}",
                    request.guild_id.color(),
                    Glue.color(),
                    request.channel_id.color(),
                    Glue.color(),
                    request.actor.color(),
                    match request.kind {
                        InteractionKind::Command => "used /",
                        InteractionKind::Component => "pressed",
                    },
                    request.identifier,
                );
            }
        }

        Ok(EventHandled::No)
    }
}
