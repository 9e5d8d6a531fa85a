use super::{pause_between, ActionContext, ActionFailure, ActionResult, MentionCursor, Tally};
use crate::platform::Platform;
use crate::types::ActionKind;
use tracing::{debug, info};
use x_client::Post;

/// Reply once to every mention newer than `cursor`, oldest first.
///
/// The cursor moves past every mention that was looked at, including ones
/// whose reply failed, so a mention is never answered twice.
pub(super) async fn run<P: Platform + ?Sized>(
    ctx: &ActionContext<'_, P>,
    cursor: &mut MentionCursor,
) -> ActionResult {
    let page = ctx
        .platform
        .mentions(&ctx.me.id, cursor.last_seen())
        .await
        .map_err(|e| ActionFailure::from_error(ActionKind::ReplyMentions, "list mentions", &e))?;

    let mut fresh: Vec<&Post> = page.posts.iter().filter(|p| cursor.is_new(&p.id)).collect();
    fresh.sort_by(|a, b| a.id.cmp(&b.id));
    if fresh.is_empty() {
        debug!(action = %ActionKind::ReplyMentions, "no new mentions");
        return Ok(Default::default());
    }
    info!(action = %ActionKind::ReplyMentions, count = fresh.len(), "processing mentions");

    let mut tally = Tally::default();
    let mut sent = 0usize;
    for mention in fresh {
        cursor.advance(&mention.id);

        let Some(author_id) = mention.author_id.as_deref() else {
            debug!(id = %mention.id, "mention without author, skipping");
            continue;
        };
        if author_id == ctx.me.id {
            continue;
        }

        pause_between(ctx, sent).await;
        sent += 1;

        let username = match page.author(author_id) {
            Some(user) => user.username.clone(),
            None => match ctx.platform.user(author_id).await {
                Ok(user) => user.username,
                Err(e) => {
                    let context = format!("look up author {author_id}");
                    tally.failed(ActionFailure::from_error(
                        ActionKind::ReplyMentions,
                        &context,
                        &e,
                    ));
                    continue;
                }
            },
        };

        let text = ctx.config.content.render_reply(&username);
        match ctx.platform.create_post(&text, Some(&mention.id)).await {
            Ok(created) => {
                info!(
                    action = %ActionKind::ReplyMentions,
                    mention = %mention.id,
                    reply = %created.id,
                    "replied to @{username}"
                );
                tally.success();
            }
            Err(e) => {
                let context = format!("reply to {}", mention.id);
                tally.failed(ActionFailure::from_error(
                    ActionKind::ReplyMentions,
                    &context,
                    &e,
                ));
            }
        }
    }

    tally.finish()
}
