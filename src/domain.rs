use crate::errors::{HashError, RepoError};
use crate::models::{Meme, ShownRecord, Vote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Trait defining operations for storing and retrieving Meme metadata.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static {
    async fn create(&self, meme: &Meme) -> Result<(), RepoError>;

    /// Returns Ok(None) if the meme is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError>;

    /// The `limit` most recently created memes, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Meme>, RepoError>;

    /// The `limit` memes with the most likes, most liked first.
    async fn list_top(&self, limit: usize) -> Result<Vec<Meme>, RepoError>;
}

/// Append-only store of swipe votes.
#[async_trait]
pub trait VoteRepository: Send + Sync + 'static {
    async fn record(&self, vote: &Vote) -> Result<(), RepoError>;

    /// All-time dislike counts for a user, keyed by cluster id.
    async fn disliked_clusters(&self, user_id: &str) -> Result<HashMap<String, u64>, RepoError>;
}

/// Append-only log of what each user has been shown.
#[async_trait]
pub trait FeedHistoryRepository: Send + Sync + 'static {
    async fn record_shown(&self, records: &[ShownRecord]) -> Result<(), RepoError>;

    /// Counts of shown records at or after `since`, keyed by cluster id.
    async fn shown_clusters_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, RepoError>;
}

/// Computes the perceptual hash of the image behind a URL.
#[async_trait]
pub trait PerceptualHasher: Send + Sync + 'static {
    async fn hash(&self, image_url: &str) -> Result<String, HashError>;
}
