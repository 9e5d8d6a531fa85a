//! In-memory [`Platform`] used by action and scheduler tests.

use crate::platform::Platform;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use x_client::{CreatedPost, FollowStatus, MentionPage, Post, PostId, User, XError};

pub(crate) fn me() -> User {
    user("1000", "chirpbot")
}

pub(crate) fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        name: username.to_string(),
        username: username.to_string(),
    }
}

pub(crate) fn post(id: &str, author_id: &str) -> Post {
    Post {
        id: PostId::new(id),
        text: format!("post {id}"),
        author_id: Some(author_id.to_string()),
        created_at: None,
    }
}

#[derive(Default)]
struct State {
    auth_error: Option<XError>,
    next_failures: HashMap<&'static str, VecDeque<XError>>,
    persistent: HashMap<&'static str, fn() -> XError>,
    panic_on: Option<&'static str>,

    search_results: Vec<Post>,
    mention_pages: VecDeque<MentionPage>,
    users: HashMap<String, User>,
    followers: Vec<User>,
    following: Vec<User>,
    already_liked: Vec<PostId>,

    calls: Vec<&'static str>,
    posted: Vec<(String, Option<PostId>)>,
    liked: Vec<PostId>,
    followed: Vec<String>,
    mention_queries: Vec<Option<PostId>>,
    next_id: u64,
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().next_id = 5000;
        fake
    }

    // ── Scripting ────────────────────────────────────────────────────────

    pub fn fail_auth(&self, err: XError) {
        self.state.lock().unwrap().auth_error = Some(err);
    }

    /// Fail the next call to `method` with `err`. Queued per method.
    pub fn fail_next(&self, method: &'static str, err: XError) {
        let mut s = self.state.lock().unwrap();
        s.next_failures.entry(method).or_default().push_back(err);
    }

    /// Fail every call to `method`.
    pub fn fail_always(&self, method: &'static str, make: fn() -> XError) {
        self.state.lock().unwrap().persistent.insert(method, make);
    }

    pub fn panic_on(&self, method: &'static str) {
        self.state.lock().unwrap().panic_on = Some(method);
    }

    pub fn set_search_results(&self, posts: Vec<Post>) {
        self.state.lock().unwrap().search_results = posts;
    }

    /// `like` answers `liked: false` for these ids.
    pub fn set_already_liked(&self, ids: Vec<PostId>) {
        self.state.lock().unwrap().already_liked = ids;
    }

    pub fn push_mentions(&self, page: MentionPage) {
        self.state.lock().unwrap().mention_pages.push_back(page);
    }

    pub fn add_user(&self, user: User) {
        let mut s = self.state.lock().unwrap();
        s.users.insert(user.id.clone(), user);
    }

    pub fn set_followers(&self, users: Vec<User>) {
        self.state.lock().unwrap().followers = users;
    }

    pub fn set_following(&self, users: Vec<User>) {
        self.state.lock().unwrap().following = users;
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| **c == method).count()
    }

    pub fn posted(&self) -> Vec<(String, Option<PostId>)> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn liked(&self) -> Vec<PostId> {
        self.state.lock().unwrap().liked.clone()
    }

    pub fn followed(&self) -> Vec<String> {
        self.state.lock().unwrap().followed.clone()
    }

    pub fn mention_queries(&self) -> Vec<Option<PostId>> {
        self.state.lock().unwrap().mention_queries.clone()
    }

    /// Log the call and return the scripted failure, if any. Panics (outside
    /// the lock) when the method is marked with [`FakePlatform::panic_on`].
    fn enter(&self, method: &'static str) -> Result<(), XError> {
        let should_panic = {
            let mut s = self.state.lock().unwrap();
            s.calls.push(method);
            s.panic_on == Some(method)
        };
        if should_panic {
            panic!("scripted panic in {method}");
        }
        let mut s = self.state.lock().unwrap();
        if let Some(err) = s.next_failures.get_mut(method).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        if let Some(make) = s.persistent.get(method) {
            return Err(make());
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn verify_credentials(&self) -> x_client::Result<User> {
        self.enter("verify_credentials")?;
        match self.state.lock().unwrap().auth_error.take() {
            Some(err) => Err(err),
            None => Ok(me()),
        }
    }

    async fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&PostId>,
    ) -> x_client::Result<CreatedPost> {
        self.enter("create_post")?;
        let mut s = self.state.lock().unwrap();
        s.next_id += 1;
        let id = PostId::new(s.next_id.to_string());
        s.posted.push((text.to_string(), in_reply_to.cloned()));
        Ok(CreatedPost {
            id,
            text: text.to_string(),
        })
    }

    async fn search_recent(&self, _query: &str, max_results: u32) -> x_client::Result<Vec<Post>> {
        self.enter("search_recent")?;
        let s = self.state.lock().unwrap();
        Ok(s.search_results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn like(&self, _user_id: &str, post_id: &PostId) -> x_client::Result<bool> {
        self.enter("like")?;
        let mut s = self.state.lock().unwrap();
        if s.already_liked.contains(post_id) {
            return Ok(false);
        }
        s.liked.push(post_id.clone());
        Ok(true)
    }

    async fn mentions(
        &self,
        _user_id: &str,
        since_id: Option<&PostId>,
    ) -> x_client::Result<MentionPage> {
        self.enter("mentions")?;
        let mut s = self.state.lock().unwrap();
        s.mention_queries.push(since_id.cloned());
        Ok(s.mention_pages.pop_front().unwrap_or_default())
    }

    async fn user(&self, user_id: &str) -> x_client::Result<User> {
        self.enter("user")?;
        let s = self.state.lock().unwrap();
        s.users
            .get(user_id)
            .cloned()
            .ok_or(XError::MissingData("user"))
    }

    async fn followers(&self, _user_id: &str, max_results: u32) -> x_client::Result<Vec<User>> {
        self.enter("followers")?;
        let s = self.state.lock().unwrap();
        Ok(s.followers.iter().take(max_results as usize).cloned().collect())
    }

    async fn following(&self, _user_id: &str, max_results: u32) -> x_client::Result<Vec<User>> {
        self.enter("following")?;
        let s = self.state.lock().unwrap();
        Ok(s.following.iter().take(max_results as usize).cloned().collect())
    }

    async fn follow(
        &self,
        _user_id: &str,
        target_user_id: &str,
    ) -> x_client::Result<FollowStatus> {
        self.enter("follow")?;
        let mut s = self.state.lock().unwrap();
        s.followed.push(target_user_id.to_string());
        Ok(FollowStatus {
            following: true,
            pending_follow: false,
        })
    }
}
