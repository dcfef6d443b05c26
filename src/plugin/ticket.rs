use crate::{
    commands::{CLOSE_TICKET_BUTTON, OPEN_TICKET_BUTTON},
    directory::{ChannelKind, ThreadVisibility},
    event::*,
    interaction::Interaction,
    log_internal,
    logging::*,
    plugin::*,
    ticket::{self, OpenOutcome},
};
use anyhow::Result;

const CREATE_FAILED: &str = "Could not create your ticket. Please contact a moderator.";
const CLOSE_FAILED: &str = "Could not close this ticket. Please contact a moderator.";

/// The "Open Ticket" and "Close Ticket" buttons
pub struct PluginTicket;

#[serenity::async_trait]
impl Plugin for PluginTicket {
    fn name(&self) -> &'static str {
        "ticket"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some(interaction) = event.is_component(OPEN_TICKET_BUTTON) {
            open(ctx, interaction).await?;
            return Ok(EventHandled::Yes);
        }

        if let Some(interaction) = event.is_component(CLOSE_TICKET_BUTTON) {
            close(ctx, interaction).await?;
            return Ok(EventHandled::Yes);
        }

        Ok(EventHandled::No)
    }
}

async fn open(ctx: &Context<'_>, interaction: &Interaction) -> Result<()> {
    let Some(guild_id) = interaction.require_guild().await? else {
        return Ok(());
    };

    // Thread creation can take a while.
    interaction.responder.defer().await?;

    let reply = match ticket::open_ticket(
        ctx.directory,
        ctx.cfg,
        ctx.tickets,
        guild_id,
        &interaction.request.actor,
    )
    .await
    {
        Ok(outcome) => {
            if let OpenOutcome::Created { thread, visibility } = &outcome {
                log_internal!(
                    "Opened {} ticket {} for {}",
                    match visibility {
                        ThreadVisibility::Private => "private",
                        ThreadVisibility::Public => "public",
                    },
                    thread.color(),
                    interaction.request.actor.color(),
                );
            }
            outcome.reply_text()
        }
        Err(err) => {
            tracing::error!("Failed to create ticket thread: {}", err);
            CREATE_FAILED.to_owned()
        }
    };

    interaction.responder.reply(&reply).await?;
    Ok(())
}

async fn close(ctx: &Context<'_>, interaction: &Interaction) -> Result<()> {
    if interaction.require_guild().await?.is_none() {
        return Ok(());
    }

    let thread = match ctx.directory.channel(interaction.request.channel_id).await {
        Ok(channel) if channel.kind == ChannelKind::Thread => channel,
        _ => {
            interaction
                .responder
                .reply("This button only works inside ticket threads.")
                .await?;
            return Ok(());
        }
    };

    let Some((_, member)) = guild_member(ctx, interaction).await? else {
        return Ok(());
    };

    if !ticket::can_close(&thread, &member) {
        interaction
            .responder
            .reply("Only staff or the ticket creator can close this ticket.")
            .await?;
        return Ok(());
    }

    interaction.responder.defer().await?;

    match ticket::close_ticket(ctx.directory, &thread, &interaction.request.actor).await {
        Ok(()) => interaction.responder.reply("Ticket closed. Thank you!").await?,
        Err(err) => {
            tracing::error!("Failed to archive ticket thread: {}", err);
            interaction.responder.reply(CLOSE_FAILED).await?;
        }
    }
    Ok(())
}
