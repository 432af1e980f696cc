//! Community forum service.
//!
//! Posts and comments are validated, passed through AI moderation, and
//! stored locally. Moderation fails open: if the advisor is unreachable the
//! content is accepted unmoderated and the failure is logged.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::instrument;

use khula_advisor::{prompts, AdvisorClient, AdvisorError, ModerationVerdict};

use crate::forum_store::{Comment, Post, SqliteForumStore};

/// Forum categories accepted for posts.
pub const CATEGORIES: &[&str] = &[
    "crop_management",
    "pest_control",
    "soil_health",
    "irrigation",
    "market_prices",
    "equipment",
    "weather_discussion",
    "success_stories",
    "questions_help",
    "general_discussion",
];

/// Maximum title length for posts.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum content length for posts and comments.
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// How many recent posts feed the trending-topics digest.
const TRENDING_SAMPLE: usize = 10;

/// Errors that can occur during forum operations.
#[derive(Debug, Error)]
pub enum ForumError {
    /// Post was not found.
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// Category is not one of `CATEGORIES`.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Validation error (e.g., empty content, content too long).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Content was rejected by moderation.
    #[error("Content rejected: {0}")]
    Rejected(String),

    /// Storage error (database, task scheduling).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Advisor failure outside the fail-open moderation path.
    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),
}

impl ForumError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

/// Result type for forum operations.
pub type ForumResult<T> = Result<T, ForumError>;

/// Validate a post title.
pub fn validate_title(title: &str) -> ForumResult<()> {
    if title.trim().is_empty() {
        return Err(ForumError::validation("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(ForumError::validation(format!(
            "Title exceeds maximum length of {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// Validate post or comment content.
pub fn validate_content(content: &str) -> ForumResult<()> {
    if content.trim().is_empty() {
        return Err(ForumError::validation("Content cannot be empty"));
    }
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(ForumError::validation(format!(
            "Content exceeds maximum length of {} characters",
            MAX_CONTENT_LENGTH
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> ForumResult<()> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ForumError::InvalidCategory(category.to_string()))
    }
}

/// Community forum operations over the local store and the AI advisor.
#[derive(Clone)]
pub struct ForumService {
    store: Arc<Mutex<SqliteForumStore>>,
    advisor: Arc<AdvisorClient>,
}

impl ForumService {
    pub fn new(store: SqliteForumStore, advisor: Arc<AdvisorClient>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            advisor,
        }
    }

    /// Create a new forum post after validation and moderation.
    #[instrument(skip(self, content), level = "info")]
    pub async fn create_post(
        &self,
        author: &str,
        title: &str,
        content: &str,
        category: &str,
    ) -> ForumResult<Post> {
        validate_category(category)?;
        validate_title(title)?;
        validate_content(content)?;

        let submission = format!("{} {}", title, content);
        self.moderate(&submission).await?;

        let store = self.store.clone();
        let (author, title, content, category) = (
            author.to_string(),
            title.to_string(),
            content.to_string(),
            category.to_string(),
        );
        tokio::task::spawn_blocking(move || {
            store.lock().create_post(&author, &title, &content, &category)
        })
        .await
        .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// List posts, newest first, optionally filtered by category.
    pub async fn list_posts(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> ForumResult<Vec<Post>> {
        if let Some(category) = category {
            validate_category(category)?;
        }

        let store = self.store.clone();
        let category = category.map(str::to_string);
        tokio::task::spawn_blocking(move || store.lock().list_posts(category.as_deref(), limit))
            .await
            .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// Get a post and record the view.
    pub async fn view_post(&self, post_id: i64) -> ForumResult<Post> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let store = store.lock();
            store.record_view(post_id)?;
            store.get_post(post_id)?.ok_or(ForumError::NotFound(post_id))
        })
        .await
        .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// Like a post.
    pub async fn like_post(&self, post_id: i64) -> ForumResult<Post> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.lock().add_like(post_id))
            .await
            .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// Add a moderated comment to a post.
    #[instrument(skip(self, content), level = "info")]
    pub async fn add_comment(
        &self,
        post_id: i64,
        author: &str,
        content: &str,
    ) -> ForumResult<Comment> {
        validate_content(content)?;
        self.moderate(content).await?;

        let store = self.store.clone();
        let (author, content) = (author.to_string(), content.to_string());
        tokio::task::spawn_blocking(move || store.lock().add_comment(post_id, &author, &content))
            .await
            .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// List comments on a post, oldest first.
    pub async fn comments(&self, post_id: i64) -> ForumResult<Vec<Comment>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.lock().list_comments(post_id))
            .await
            .map_err(|e| ForumError::storage(e.to_string()))?
    }

    /// AI farming advice for a community question.
    pub async fn farming_advice(&self, question: &str, category: &str) -> ForumResult<String> {
        let prompt = prompts::farming_advice(question, category);
        Ok(self.advisor.generate(&prompt).await?)
    }

    /// AI digest of trending topics across recent posts.
    pub async fn trending_topics(&self) -> ForumResult<String> {
        let store = self.store.clone();
        let recent = tokio::task::spawn_blocking(move || store.lock().list_posts(None, 50))
            .await
            .map_err(|e| ForumError::storage(e.to_string()))??;

        let digest: String = recent
            .iter()
            .take(TRENDING_SAMPLE)
            .map(|post| format!("Title: {}\nCategory: {}\n\n", post.title, post.category))
            .collect();

        let prompt = prompts::trending_topics(&digest);
        Ok(self.advisor.generate(&prompt).await?)
    }

    /// Run content through AI moderation.
    ///
    /// Advisor failures approve the content (fail-open) so a moderation
    /// outage does not take the forum down with it.
    async fn moderate(&self, content: &str) -> ForumResult<()> {
        let prompt = prompts::moderation(content);
        match self.advisor.generate(&prompt).await {
            Ok(response) => {
                let verdict = ModerationVerdict::parse(&response);
                if verdict.approved {
                    Ok(())
                } else {
                    Err(ForumError::Rejected(
                        verdict
                            .reason
                            .unwrap_or_else(|| "Content policy violation".to_string()),
                    ))
                }
            }
            Err(e) => {
                tracing::warn!("Moderation unavailable, accepting content: {}", e);
                Ok(())
            }
        }
    }
}
