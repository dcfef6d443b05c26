use crate::{
    commands::WARN,
    event::*,
    log_internal,
    logging::*,
    moderation::{self, Refusal},
    notice::Notice,
    plugin::*,
};
use anyhow::Result;

/// `/warn user:<member> [reason]`: publicly warn a member in the current channel
pub struct PluginWarn;

#[serenity::async_trait]
impl Plugin for PluginWarn {
    fn name(&self) -> &'static str {
        "warn"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(interaction) = event.is_command(WARN) else {
            return Ok(EventHandled::No);
        };

        let Some((guild_id, admin)) = guild_admin(ctx, interaction).await? else {
            return Ok(EventHandled::Yes);
        };

        let request = &interaction.request;
        let Some(target_id) = request.user("user") else {
            interaction
                .responder
                .reply(&Refusal::TargetNotFound.reply_text())
                .await?;
            return Ok(EventHandled::Yes);
        };
        let reason = moderation::reason_or_default(request.string("reason"));

        let target = match moderation::reject_self_target("warn", admin.user_id, target_id) {
            Ok(()) => moderation::find_target(ctx.directory, guild_id, target_id).await,
            Err(refusal) => Err(refusal),
        };
        let target = match target {
            Ok(target) => target,
            Err(refusal) => {
                interaction.responder.reply(&refusal.reply_text()).await?;
                return Ok(EventHandled::Yes);
            }
        };

        let warning = Notice::text(format!(
            "<@{}>, you have received a warning from {}. Reason: {}",
            target.user_id,
            request.actor.mention(),
            reason
        ));
        let reply = match ctx
            .directory
            .send_message(request.channel_id, &warning)
            .await
        {
            Ok(_) => {
                log_internal!("{} warned {}: {}", admin.color(), target.color(), reason);
                "Warning delivered."
            }
            Err(err) => {
                tracing::error!("Failed to post warning: {}", err);
                "Could not post the warning in this channel."
            }
        };

        interaction.responder.reply(reply).await?;
        Ok(EventHandled::Yes)
    }
}
