use crate::{
    commands::ANNOUNCE, directory::ChannelKind, event::*, log_internal, logging::*,
    notice::Notice, plugin::*,
};
use anyhow::Result;

/// `/announce message:<text>`: post text in the current channel as the bot
pub struct PluginAnnounce;

#[serenity::async_trait]
impl Plugin for PluginAnnounce {
    fn name(&self) -> &'static str {
        "announce"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(interaction) = event.is_command(ANNOUNCE) else {
            return Ok(EventHandled::No);
        };

        let Some((_, admin)) = guild_admin(ctx, interaction).await? else {
            return Ok(EventHandled::Yes);
        };

        let request = &interaction.request;
        let Some(message) = request.string("message") else {
            interaction
                .responder
                .reply("Please provide a message to announce.")
                .await?;
            return Ok(EventHandled::Yes);
        };

        let is_text = matches!(
            ctx.directory.channel(request.channel_id).await,
            Ok(channel) if channel.kind != ChannelKind::Other
        );
        if !is_text {
            interaction
                .responder
                .reply("Announcements can only be sent in text channels.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        let reply = match ctx
            .directory
            .send_message(request.channel_id, &Notice::text(message))
            .await
        {
            Ok(_) => {
                log_internal!(
                    "{} announced in {}",
                    admin.color(),
                    request.channel_id.color()
                );
                "Announcement sent."
            }
            Err(err) => {
                tracing::error!("Failed to send announcement: {}", err);
                "Could not send the announcement. Please check my permissions."
            }
        };

        interaction.responder.reply(reply).await?;
        Ok(EventHandled::Yes)
    }
}
