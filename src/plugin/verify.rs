use crate::{
    commands::{VERIFY, VERIFY_BUTTON},
    event::*,
    log_internal,
    logging::*,
    plugin::*,
    verification::{self, VerifyOutcome},
};
use anyhow::Result;

/// `/verify` and the "Verify Me" button
pub struct PluginVerify;

#[serenity::async_trait]
impl Plugin for PluginVerify {
    fn name(&self) -> &'static str {
        "verify"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some(interaction) = event
            .is_command(VERIFY)
            .or_else(|| event.is_component(VERIFY_BUTTON))
        else {
            return Ok(EventHandled::No);
        };

        let Some((guild_id, member)) = guild_member(ctx, interaction).await? else {
            return Ok(EventHandled::Yes);
        };

        let outcome = verification::verify(ctx.directory, ctx.cfg, guild_id, &member).await;
        match &outcome {
            VerifyOutcome::Success => log_internal!("Verified {}", member.color()),
            VerifyOutcome::Error(err) => {
                tracing::error!("Failed to adjust roles during verification: {}", err)
            }
            VerifyOutcome::Already => {}
        }

        interaction.responder.reply(outcome.reply_text()).await?;
        Ok(EventHandled::Yes)
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::{VERIFY, VERIFY_BUTTON};
    use crate::directory::memory::{Call, Fail, MemoryDirectory};
    use crate::event::Event;
    use crate::interaction::tests::{actor, interaction, request};
    use crate::interaction::InteractionKind;
    use crate::plugin::tests::{Harness, BOT};
    use crate::verification::tests::{guild, newcomer};
    use serenity::all::{ChannelId, UserId};

    #[tokio::test]
    async fn join_then_button_verifies() {
        let member = newcomer(7, &[]);
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)).with_member(member.clone()));

        Event::MemberJoin {
            guild_id: guild(),
            member: member.clone(),
        }
        .handle(h.ctx())
        .await;
        assert_eq!(h.dir.member_roles(member.user_id), vec![h.cfg.unverified_role_id]);

        // The button payload reflects the role granted on join.
        let joined = newcomer(7, &[h.cfg.unverified_role_id]);
        let sink = h
            .dispatch(
                InteractionKind::Component,
                VERIFY_BUTTON,
                &joined,
                h.cfg.verification_channel_id,
                |_| {},
            )
            .await;

        assert_eq!(
            sink.final_text().as_deref(),
            Some("You are now verified! Welcome in! ✅")
        );
        assert_eq!(h.dir.member_roles(member.user_id), vec![h.cfg.verified_role_id]);
    }

    #[tokio::test]
    async fn command_twice_is_already_verified() {
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)));
        let member = newcomer(7, &[h.cfg.verified_role_id]);

        for _ in 0..2 {
            let sink = h
                .dispatch(InteractionKind::Command, VERIFY, &member, ChannelId::new(1), |_| {})
                .await;
            assert_eq!(
                sink.final_text().as_deref(),
                Some("You are already verified! ⚡")
            );
        }
        assert!(h.dir.mutations().is_empty());
    }

    #[tokio::test]
    async fn fetches_member_when_payload_lacks_it() {
        let member = newcomer(7, &[]);
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)).with_member(member.clone()));

        let sink = h
            .dispatch(InteractionKind::Command, VERIFY, &member, ChannelId::new(1), |req| {
                req.member = None
            })
            .await;

        assert_eq!(
            sink.final_text().as_deref(),
            Some("You are now verified! Welcome in! ✅")
        );
        assert_eq!(
            h.dir.mutations(),
            vec![Call::AddRole(member.user_id, h.cfg.verified_role_id)]
        );
    }

    #[tokio::test]
    async fn unresolvable_member_is_told_to_retry() {
        let member = newcomer(7, &[]);
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)));
        h.dir.fail(Fail::Member(member.user_id));

        let sink = h
            .dispatch(InteractionKind::Component, VERIFY_BUTTON, &member, ChannelId::new(1), |req| {
                req.member = None
            })
            .await;

        assert_eq!(
            sink.final_text().as_deref(),
            Some("Could not load your server profile. Please try again in a moment.")
        );
        assert!(h.dir.mutations().is_empty());
    }

    #[tokio::test]
    async fn direct_message_button_is_refused() {
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)));
        let (press, sink) = interaction(request(
            InteractionKind::Component,
            VERIFY_BUTTON,
            actor(7, "someone"),
            None,
            ChannelId::new(1),
        ));

        Event::Interaction(press).handle(h.ctx()).await;

        assert_eq!(
            sink.final_text().as_deref(),
            Some("Please use this button inside the server.")
        );
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn role_failure_is_reported() {
        let member = newcomer(7, &[]);
        let h = Harness::new(MemoryDirectory::new(UserId::new(BOT)).with_member(member.clone()));
        h.dir.fail(Fail::AddRole(h.cfg.verified_role_id));

        let sink = h
            .dispatch(InteractionKind::Command, VERIFY, &member, ChannelId::new(1), |_| {})
            .await;

        assert_eq!(
            sink.final_text().as_deref(),
            Some("Could not verify you. Please contact an administrator.")
        );
    }
}
