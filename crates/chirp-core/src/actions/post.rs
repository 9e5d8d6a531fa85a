use super::{ActionContext, ActionFailure, ActionReport, ActionResult};
use crate::classifier::FailureKind;
use crate::platform::Platform;
use crate::types::ActionKind;
use rand::seq::SliceRandom;
use tracing::info;

/// Post one randomly chosen content candidate.
pub(super) async fn run<P: Platform + ?Sized>(ctx: &ActionContext<'_, P>) -> ActionResult {
    let text = {
        let candidates: Vec<&String> = ctx
            .config
            .content
            .posts
            .iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        let mut rng = rand::thread_rng();
        candidates.choose(&mut rng).map(|s| s.to_string())
    };
    let Some(text) = text else {
        return Err(ActionFailure::new(
            FailureKind::Unknown,
            "no content candidates configured",
        ));
    };

    match ctx.platform.create_post(&text, None).await {
        Ok(created) => {
            info!(action = %ActionKind::Post, id = %created.id, "posted: {text}");
            Ok(ActionReport {
                attempted: 1,
                succeeded: 1,
                ..Default::default()
            }
            .with_detail(format!("post {}", created.id)))
        }
        Err(e) => {
            let failure = ActionFailure::from_error(ActionKind::Post, "create post", &e);
            if failure.kind.is_failure() {
                Err(failure)
            } else {
                Ok(ActionReport {
                    attempted: 1,
                    already_done: 1,
                    ..Default::default()
                }
                .with_detail("duplicate content"))
            }
        }
    }
}
