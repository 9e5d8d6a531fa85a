use async_trait::async_trait;
use x_client::{CreatedPost, FollowStatus, MentionPage, Post, PostId, User, XClient};

/// The remote calls the bot makes.
///
/// Implemented for [`XClient`]; tests drive actions and the scheduler with an
/// in-memory fake instead.
#[async_trait]
pub trait Platform: Send + Sync {
    /// The account the credentials belong to. Used as the login check.
    async fn verify_credentials(&self) -> x_client::Result<User>;

    async fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&PostId>,
    ) -> x_client::Result<CreatedPost>;

    async fn search_recent(&self, query: &str, max_results: u32) -> x_client::Result<Vec<Post>>;

    async fn like(&self, user_id: &str, post_id: &PostId) -> x_client::Result<bool>;

    async fn mentions(
        &self,
        user_id: &str,
        since_id: Option<&PostId>,
    ) -> x_client::Result<MentionPage>;

    async fn user(&self, user_id: &str) -> x_client::Result<User>;

    async fn followers(&self, user_id: &str, max_results: u32) -> x_client::Result<Vec<User>>;

    async fn following(&self, user_id: &str, max_results: u32) -> x_client::Result<Vec<User>>;

    async fn follow(&self, user_id: &str, target_user_id: &str)
        -> x_client::Result<FollowStatus>;
}

#[async_trait]
impl Platform for XClient {
    async fn verify_credentials(&self) -> x_client::Result<User> {
        self.me().await
    }

    async fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&PostId>,
    ) -> x_client::Result<CreatedPost> {
        XClient::create_post(self, text, in_reply_to).await
    }

    async fn search_recent(&self, query: &str, max_results: u32) -> x_client::Result<Vec<Post>> {
        XClient::search_recent(self, query, max_results).await
    }

    async fn like(&self, user_id: &str, post_id: &PostId) -> x_client::Result<bool> {
        XClient::like(self, user_id, post_id).await
    }

    async fn mentions(
        &self,
        user_id: &str,
        since_id: Option<&PostId>,
    ) -> x_client::Result<MentionPage> {
        XClient::mentions(self, user_id, since_id).await
    }

    async fn user(&self, user_id: &str) -> x_client::Result<User> {
        XClient::user(self, user_id).await
    }

    async fn followers(&self, user_id: &str, max_results: u32) -> x_client::Result<Vec<User>> {
        XClient::followers(self, user_id, max_results).await
    }

    async fn following(&self, user_id: &str, max_results: u32) -> x_client::Result<Vec<User>> {
        XClient::following(self, user_id, max_results).await
    }

    async fn follow(
        &self,
        user_id: &str,
        target_user_id: &str,
    ) -> x_client::Result<FollowStatus> {
        XClient::follow(self, user_id, target_user_id).await
    }
}
