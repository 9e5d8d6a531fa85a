use crate::backoff::ForbiddenPolicy;
use crate::error::{ChirpError, Result};
use crate::types::ActionKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "chirp.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Sleep between cycles when the last cycle succeeded.
    #[serde(default = "default_steady_interval")]
    pub steady_interval_secs: u64,
    /// Pause between consecutive remote calls inside one cycle.
    #[serde(default = "default_courtesy_delay")]
    pub courtesy_delay_secs: u64,
}

fn default_steady_interval() -> u64 {
    100
}

fn default_courtesy_delay() -> u64 {
    5
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            steady_interval_secs: default_steady_interval(),
            courtesy_delay_secs: default_courtesy_delay(),
        }
    }
}

impl ScheduleConfig {
    pub fn steady_interval(&self) -> Duration {
        Duration::from_secs(self.steady_interval_secs)
    }

    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_secs(self.courtesy_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// BackoffConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base")]
    pub base_secs: u64,
    #[serde(default = "default_cap")]
    pub cap_secs: u64,
    /// Consecutive failed cycles after which the bot gives up.
    #[serde(default = "default_fatal_threshold")]
    pub fatal_threshold: u32,
    #[serde(default)]
    pub forbidden_policy: ForbiddenPolicy,
}

fn default_base() -> u64 {
    300
}

fn default_cap() -> u64 {
    3600
}

fn default_fatal_threshold() -> u32 {
    5
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: default_base(),
            cap_secs: default_cap(),
            fatal_threshold: default_fatal_threshold(),
            forbidden_policy: ForbiddenPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionsConfig
// ---------------------------------------------------------------------------

/// Per-action switch and cadence.
///
/// A block that is present in the file is enabled unless it says
/// `enabled: false`; an omitted `interval_secs` falls back to the action's
/// built-in cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ActionSettings {
    fn builtin(kind: ActionKind) -> Self {
        Self {
            enabled: kind.enabled_by_default(),
            interval_secs: Some(kind.default_interval().as_secs()),
        }
    }

    pub fn interval(&self, kind: ActionKind) -> Duration {
        self.interval_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| kind.default_interval())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_reply_mentions")]
    pub reply_mentions: ActionSettings,
    #[serde(default = "default_post")]
    pub post: ActionSettings,
    #[serde(default = "default_like")]
    pub like: ActionSettings,
    #[serde(default = "default_follow_back")]
    pub follow_back: ActionSettings,
}

fn default_reply_mentions() -> ActionSettings {
    ActionSettings::builtin(ActionKind::ReplyMentions)
}

fn default_post() -> ActionSettings {
    ActionSettings::builtin(ActionKind::Post)
}

fn default_like() -> ActionSettings {
    ActionSettings::builtin(ActionKind::Like)
}

fn default_follow_back() -> ActionSettings {
    ActionSettings::builtin(ActionKind::FollowBack)
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            reply_mentions: default_reply_mentions(),
            post: default_post(),
            like: default_like(),
            follow_back: default_follow_back(),
        }
    }
}

impl ActionsConfig {
    pub fn settings(&self, kind: ActionKind) -> &ActionSettings {
        match kind {
            ActionKind::ReplyMentions => &self.reply_mentions,
            ActionKind::Post => &self.post,
            ActionKind::Like => &self.like,
            ActionKind::FollowBack => &self.follow_back,
        }
    }

    pub fn settings_mut(&mut self, kind: ActionKind) -> &mut ActionSettings {
        match kind {
            ActionKind::ReplyMentions => &mut self.reply_mentions,
            ActionKind::Post => &mut self.post,
            ActionKind::Like => &mut self.like,
            ActionKind::FollowBack => &mut self.follow_back,
        }
    }

    pub fn is_enabled(&self, kind: ActionKind) -> bool {
        self.settings(kind).enabled
    }
}

// ---------------------------------------------------------------------------
// ContentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Candidates for the post action; one is picked at random per run.
    #[serde(default = "default_posts")]
    pub posts: Vec<String>,
    /// Hashtags (without `#`) searched by the like action.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// Reply text for mentions. `{username}` is replaced with the author.
    #[serde(default = "default_reply_template")]
    pub reply_template: String,
}

fn default_posts() -> Vec<String> {
    [
        "Just another day coding with Python! #Python #Coding",
        "Exploring new programming techniques today. #Coding #Technology",
        "Automation makes life easier! #Python #Technology",
        "Building cool stuff with code. #Coding #Development",
        "Learning something new every day in tech. #Technology #Learning",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_topics() -> Vec<String> {
    vec![
        "python".to_string(),
        "coding".to_string(),
        "technology".to_string(),
    ]
}

fn default_reply_template() -> String {
    "@{username} Thanks for the mention! This is an automated reply.".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts: default_posts(),
            topics: default_topics(),
            reply_template: default_reply_template(),
        }
    }
}

impl ContentConfig {
    pub fn render_reply(&self, username: &str) -> String {
        self.reply_template.replace("{username}", username)
    }
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_likes")]
    pub max_likes_per_run: usize,
    #[serde(default = "default_max_follows")]
    pub max_follows_per_run: usize,
    #[serde(default = "default_search_max_results")]
    pub search_max_results: u32,
    #[serde(default = "default_followers_page")]
    pub followers_page: u32,
    #[serde(default = "default_following_page")]
    pub following_page: u32,
}

fn default_max_likes() -> usize {
    3
}

fn default_max_follows() -> usize {
    5
}

fn default_search_max_results() -> u32 {
    10
}

fn default_followers_page() -> u32 {
    20
}

fn default_following_page() -> u32 {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_likes_per_run: default_max_likes(),
            max_follows_per_run: default_max_follows(),
            search_max_results: default_search_max_results(),
            followers_page: default_followers_page(),
            following_page: default_following_page(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file written alongside stdout. `null` disables it.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("chirp.log"))
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChirpError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // An empty file means "all defaults".
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Enabled actions in priority order.
    pub fn enabled_actions(&self) -> Vec<ActionKind> {
        ActionKind::all()
            .iter()
            .copied()
            .filter(|k| self.actions.is_enabled(*k))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.backoff.fatal_threshold == 0 {
            error("backoff.fatal_threshold must be at least 1".to_string());
        }
        if self.actions.post.enabled
            && self.content.posts.iter().all(|p| p.trim().is_empty())
        {
            error("actions.post is enabled but content.posts is empty".to_string());
        }
        if self.actions.like.enabled && self.content.topics.iter().all(|t| t.trim().is_empty()) {
            error("actions.like is enabled but content.topics is empty".to_string());
        }
        if self.schedule.steady_interval_secs == 0 {
            error("schedule.steady_interval_secs must be greater than 0".to_string());
        }

        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };

        if self.backoff.base_secs > self.backoff.cap_secs {
            warn(format!(
                "backoff.base_secs ({}) exceeds backoff.cap_secs ({}); every backoff will be {}s",
                self.backoff.base_secs, self.backoff.cap_secs, self.backoff.cap_secs
            ));
        }
        if self.backoff.base_secs == 0 {
            warn("backoff.base_secs is 0; failed cycles will retry immediately".to_string());
        }
        if self.actions.reply_mentions.enabled
            && !self.content.reply_template.contains("{username}")
        {
            warn(
                "content.reply_template has no {username} placeholder; replies will not mention the author"
                    .to_string(),
            );
        }
        if self.actions.like.enabled && self.limits.max_likes_per_run == 0 {
            warn("actions.like is enabled but limits.max_likes_per_run is 0".to_string());
        }
        if self.actions.follow_back.enabled && self.limits.max_follows_per_run == 0 {
            warn("actions.follow_back is enabled but limits.max_follows_per_run is 0".to_string());
        }
        if !(10..=100).contains(&self.limits.search_max_results) {
            warn(format!(
                "limits.search_max_results={} is outside the API range 10..=100 and will be clamped",
                self.limits.search_max_results
            ));
        }
        if self.enabled_actions().is_empty() {
            warn("no actions are enabled; the bot will only idle".to_string());
        }

        warnings
    }

    /// True when `validate()` reports at least one error.
    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(|w| w.level == WarnLevel::Error)
    }

    /// Fail with every error-level finding; hand back the warnings.
    pub fn ensure_valid(&self) -> Result<Vec<ConfigWarning>> {
        let (errors, warnings): (Vec<_>, Vec<_>) = self
            .validate()
            .into_iter()
            .partition(|w| w.level == WarnLevel::Error);
        if !errors.is_empty() {
            let messages: Vec<String> = errors.into_iter().map(|w| w.message).collect();
            return Err(ChirpError::InvalidConfig(messages.join("; ")));
        }
        Ok(warnings)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
