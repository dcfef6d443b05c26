use crate::{
    context::Context,
    directory::{resolve_member, Member, MemberResolution},
    event::EventHandled,
    interaction::Interaction,
};
use anyhow::Result;
use serenity::all::GuildId;

mod announce;
mod debug;
mod moderate;
mod onboarding;
mod ready;
mod ticket;
mod verify;
mod warn;

const PROFILE_UNAVAILABLE: &str =
    "Could not load your server profile. Please try again in a moment.";
const ADMIN_ONLY: &str = "Only administrators can use this command.";

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug
    fn name(&self) -> &'static str;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    /// handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context, event: &crate::event::Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    use crate::plugin::*;

    vec![
        // Core bot operations
        Box::new(debug::PluginDebug),
        Box::new(ready::PluginReady),
        Box::new(onboarding::PluginOnboarding),
        // Access gating
        Box::new(verify::PluginVerify),
        // Support desk
        Box::new(ticket::PluginTicket),
        // Admin commands
        Box::new(announce::PluginAnnounce),
        Box::new(warn::PluginWarn),
        Box::new(moderate::PluginModerate),
    ]
}

/// The guild and the actor's member record.  If either is unavailable the interaction has
/// already been answered and `None` is returned.
async fn guild_member(
    ctx: &Context<'_>,
    interaction: &Interaction,
) -> Result<Option<(GuildId, Member)>> {
    let Some(guild_id) = interaction.require_guild().await? else {
        return Ok(None);
    };

    let request = &interaction.request;
    match resolve_member(
        ctx.directory,
        guild_id,
        request.actor.id,
        request.member.as_ref(),
    )
    .await
    {
        MemberResolution::Resolved(member) => Ok(Some((guild_id, member))),
        MemberResolution::Unresolved(err) => {
            tracing::error!(
                "Failed to resolve guild member for {}: {}",
                request.identifier,
                err
            );
            interaction.responder.reply(PROFILE_UNAVAILABLE).await?;
            Ok(None)
        }
    }
}

/// Like [`guild_member`], additionally requiring the admin role.
async fn guild_admin(
    ctx: &Context<'_>,
    interaction: &Interaction,
) -> Result<Option<(GuildId, Member)>> {
    let Some((guild_id, member)) = guild_member(ctx, interaction).await? else {
        return Ok(None);
    };

    if !member.has_role(ctx.cfg.admin_role_id) {
        interaction.responder.reply(ADMIN_ONLY).await?;
        return Ok(None);
    }

    Ok(Some((guild_id, member)))
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        config::{tests::test_config, Config},
        context::Context,
        directory::{memory::MemoryDirectory, Member},
        event::Event,
        interaction::{
            tests::{actor, interaction, request, RecordingSink},
            InteractionKind,
        },
        ticket::TicketLocks,
        verification::tests::guild,
    };
    use serenity::all::{ChannelId, UserId};

    pub(crate) const BOT: u64 = 999;

    /// Everything a plugin test needs: configuration, the directory double and ticket locks
    pub(crate) struct Harness {
        pub cfg: Config,
        pub dir: MemoryDirectory,
        pub tickets: TicketLocks,
    }

    impl Harness {
        pub(crate) fn new(dir: MemoryDirectory) -> Self {
            Self {
                cfg: test_config(),
                dir,
                tickets: TicketLocks::default(),
            }
        }

        pub(crate) fn ctx(&self) -> Context<'_> {
            Context {
                cfg: &self.cfg,
                tickets: &self.tickets,
                directory: &self.dir,
                bot_id: UserId::new(BOT),
            }
        }

        /// Dispatch an interaction from `member` in `channel_id` through every plugin
        pub(crate) async fn dispatch(
            &self,
            kind: InteractionKind,
            identifier: &str,
            member: &Member,
            channel_id: ChannelId,
            build: impl FnOnce(&mut crate::interaction::InteractionRequest),
        ) -> RecordingSink {
            let mut req = request(
                kind,
                identifier,
                actor(member.user_id.get(), &member.username),
                Some(guild()),
                channel_id,
            );
            req.member = Some(member.clone());
            build(&mut req);
            let (interaction, sink) = interaction(req);
            Event::Interaction(interaction).handle(self.ctx()).await;
            sink
        }
    }
}
