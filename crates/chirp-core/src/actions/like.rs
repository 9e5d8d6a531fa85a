use super::{pause_between, ActionContext, ActionFailure, ActionReport, ActionResult, Tally};
use crate::platform::Platform;
use crate::types::ActionKind;
use rand::seq::SliceRandom;
use tracing::{info, warn};

pub(super) fn search_query(topic: &str) -> String {
    let topic = topic.trim().trim_start_matches('#');
    format!("#{topic} -is:retweet lang:en")
}

/// Search a random topic and like up to `max_likes_per_run` of the results.
pub(super) async fn run<P: Platform + ?Sized>(ctx: &ActionContext<'_, P>) -> ActionResult {
    let topic = {
        let topics: Vec<&String> = ctx
            .config
            .content
            .topics
            .iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        let mut rng = rand::thread_rng();
        topics.choose(&mut rng).map(|s| s.to_string())
    };
    let Some(topic) = topic else {
        return Ok(ActionReport::default().with_detail("no topics configured"));
    };
    let query = search_query(&topic);

    let posts = ctx
        .platform
        .search_recent(&query, ctx.config.limits.search_max_results)
        .await
        .map_err(|e| ActionFailure::from_error(ActionKind::Like, "search", &e))?;
    if posts.is_empty() {
        info!(action = %ActionKind::Like, query = %query, "no posts found");
        return Ok(ActionReport::default().with_detail(query));
    }

    let mut tally = Tally::default();
    let me = &ctx.me.id;
    for (i, post) in posts
        .iter()
        .take(ctx.config.limits.max_likes_per_run)
        .enumerate()
    {
        pause_between(ctx, i).await;
        match ctx.platform.like(me, &post.id).await {
            Ok(true) => {
                info!(action = %ActionKind::Like, id = %post.id, "liked post");
                tally.success();
            }
            Ok(false) => {
                warn!(action = %ActionKind::Like, id = %post.id, "like was not applied");
                tally.no_effect();
            }
            Err(e) => {
                let context = format!("like {}", post.id);
                tally.failed(ActionFailure::from_error(ActionKind::Like, &context, &e));
            }
        }
    }

    tally.finish().map(|r| r.with_detail(query))
}
