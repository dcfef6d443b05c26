use crate::{
    commands::{KICK, MUTE},
    event::*,
    interaction::Interaction,
    moderation::{self, Refusal, Sanction},
    plugin::*,
};
use anyhow::Result;

/// `/kick` and `/mute`
pub struct PluginModerate;

#[serenity::async_trait]
impl Plugin for PluginModerate {
    fn name(&self) -> &'static str {
        "moderate"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let (interaction, sanction) = if let Some(interaction) = event.is_command(KICK) {
            (interaction, Sanction::Kick)
        } else if let Some(interaction) = event.is_command(MUTE) {
            let minutes = interaction.request.integer("duration");
            (interaction, Sanction::Mute { minutes })
        } else {
            return Ok(EventHandled::No);
        };

        sanction_member(ctx, interaction, sanction).await?;
        Ok(EventHandled::Yes)
    }
}

async fn sanction_member(
    ctx: &Context<'_>,
    interaction: &Interaction,
    sanction: Sanction,
) -> Result<()> {
    let Some((guild_id, admin)) = guild_admin(ctx, interaction).await? else {
        return Ok(());
    };

    let request = &interaction.request;
    let reason = moderation::reason_or_default(request.string("reason"));
    let result = match request.user("user") {
        Some(target_id) => {
            moderation::apply(
                ctx.directory,
                guild_id,
                ctx.bot_id,
                sanction,
                &admin,
                target_id,
                &reason,
            )
            .await
        }
        None => Err(Refusal::TargetNotFound),
    };

    let reply = match result {
        Ok(success) => success,
        Err(refusal) => {
            if let Refusal::Failed(sanction, err) = &refusal {
                tracing::error!("Failed to {} member: {}", sanction.verb(), err);
            }
            refusal.reply_text()
        }
    };
    interaction.responder.reply(&reply).await?;
    Ok(())
}
