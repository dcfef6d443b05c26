use crate::{
    config::OnboardingMode,
    directory::Member,
    event::*,
    log_internal,
    logging::*,
    notice::{Embed, Notice},
    plugin::*,
    verification,
};
use anyhow::Result;

/// Marks newcomers unverified and tells them how to get in.
pub struct PluginOnboarding;

#[serenity::async_trait]
impl Plugin for PluginOnboarding {
    fn name(&self) -> &'static str {
        "onboarding"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::MemberJoin { guild_id, member } = event else {
            return Ok(EventHandled::No);
        };

        match verification::mark_unverified(ctx.directory, ctx.cfg, *guild_id, member).await {
            Ok(true) => log_internal!("Marked {} unverified", member.color()),
            Ok(false) => {}
            Err(err) => tracing::error!("Failed to assign unverified role: {}", err),
        }

        // Delivery is best effort.
        if let Err(err) = deliver_instructions(ctx, member).await {
            tracing::error!(
                "Failed to deliver welcome instructions to new member: {}",
                err
            );
        }

        Ok(EventHandled::Yes)
    }
}

fn welcome_embed() -> Embed {
    Embed::new("Welcome to the server!", 0x5865F2)
        .description(
            "To gain access, go to the verification channel and click the **Verify Me** button.",
        )
        .footer("Vintra Verification System")
}

async fn deliver_instructions(ctx: &Context<'_>, member: &Member) -> Result<()> {
    match ctx.cfg.onboarding_mode {
        OnboardingMode::DirectMessage => {
            let notice = Notice::text(
                "Hi! Thanks for joining. Follow the instructions below to unlock the server.",
            )
            .with_embed(welcome_embed());
            ctx.directory.direct_message(member.user_id, &notice).await?;
        }
        OnboardingMode::Channel => {
            let notice = Notice::text(format!(
                "Welcome <@{}>! Click the **Verify Me** button in this channel to unlock the \
                 server.",
                member.user_id
            ))
            .with_embed(welcome_embed());
            ctx.directory
                .send_message(ctx.cfg.verification_channel_id, &notice)
                .await?;
        }
    }
    Ok(())
}
