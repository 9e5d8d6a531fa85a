use super::{pause_between, ActionContext, ActionFailure, ActionResult, Tally};
use crate::platform::Platform;
use crate::types::ActionKind;
use std::collections::HashSet;
use tracing::info;

/// Follow recent followers the account does not follow yet.
pub(super) async fn run<P: Platform + ?Sized>(ctx: &ActionContext<'_, P>) -> ActionResult {
    let limits = &ctx.config.limits;
    let me = &ctx.me.id;

    let followers = ctx
        .platform
        .followers(me, limits.followers_page)
        .await
        .map_err(|e| ActionFailure::from_error(ActionKind::FollowBack, "list followers", &e))?;
    ctx.courtesy_pause().await;
    let following = ctx
        .platform
        .following(me, limits.following_page)
        .await
        .map_err(|e| ActionFailure::from_error(ActionKind::FollowBack, "list following", &e))?;

    let already: HashSet<&str> = following.iter().map(|u| u.id.as_str()).collect();
    let targets: Vec<_> = followers
        .iter()
        .filter(|u| u.id != *me && !already.contains(u.id.as_str()))
        .take(limits.max_follows_per_run)
        .collect();

    let mut tally = Tally::default();
    for (i, target) in targets.iter().enumerate() {
        // The listing calls above already used the first slot.
        pause_between(ctx, i + 1).await;
        match ctx.platform.follow(me, &target.id).await {
            Ok(status) if status.following || status.pending_follow => {
                info!(
                    action = %ActionKind::FollowBack,
                    pending = status.pending_follow,
                    "followed @{}",
                    target.username
                );
                tally.success();
            }
            Ok(_) => tally.no_effect(),
            Err(e) => {
                let context = format!("follow @{}", target.username);
                tally.failed(ActionFailure::from_error(ActionKind::FollowBack, &context, &e));
            }
        }
    }

    tally.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FailureKind;
    use crate::config::Config;
    use crate::test_support::{me, user, FakePlatform};
    use x_client::{ApiProblem, XError};

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.actions.follow_back.enabled = true;
        cfg
    }

    #[tokio::test(start_paused = true)]
    async fn follows_only_missing_followers_up_to_limit() {
        let platform = FakePlatform::new();
        platform.set_followers((1..=8).map(|i| user(&i.to_string(), &format!("u{i}"))).collect());
        platform.set_following(vec![user("2", "u2")]);
        let config = config();
        let me = me();
        let ctx = ActionContext {
            platform: &platform,
            me: &me,
            config: &config,
        };

        let report = run(&ctx).await.unwrap();
        assert_eq!(report.succeeded, 5);
        assert_eq!(platform.followed(), vec!["1", "3", "4", "5", "6"]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_to_follow() {
        let platform = FakePlatform::new();
        platform.set_followers(vec![user("2", "u2")]);
        platform.set_following(vec![user("2", "u2")]);
        let config = config();
        let me = me();
        let ctx = ActionContext {
            platform: &platform,
            me: &me,
            config: &config,
        };

        let report = run(&ctx).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(platform.calls_to("follow"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_request_is_already_done() {
        let platform = FakePlatform::new();
        platform.set_followers(vec![user("2", "u2"), user("3", "u3")]);
        platform.fail_next(
            "follow",
            XError::api(403, ApiProblem::with_code(160, "already requested to follow")),
        );
        let config = config();
        let me = me();
        let ctx = ActionContext {
            platform: &platform,
            me: &me,
            config: &config,
        };

        let report = run(&ctx).await.unwrap();
        assert_eq!(report.already_done, 1);
        assert_eq!(platform.followed(), vec!["3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_stops_the_action() {
        let platform = FakePlatform::new();
        platform.fail_next("following", XError::api(500, ApiProblem::default()));
        platform.set_followers(vec![user("2", "u2")]);
        let config = config();
        let me = me();
        let ctx = ActionContext {
            platform: &platform,
            me: &me,
            config: &config,
        };

        assert_eq!(run(&ctx).await.unwrap_err().kind, FailureKind::Transient);
        assert_eq!(platform.calls_to("follow"), 0);
    }
}
