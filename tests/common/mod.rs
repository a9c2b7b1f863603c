//! In-memory stand-ins for DynamoDB and the hashing service.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use meme_swipe_api::{
    auth::{Claims, JwtValidator},
    domain::{FeedHistoryRepository, MemeRepository, PerceptualHasher, VoteRepository},
    errors::{HashError, RepoError},
    models::{Meme, ShownRecord, Vote, VoteKind},
    ranking,
    AppState,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-0123456789";

#[derive(Default)]
pub struct InMemoryMemes {
    pub memes: Mutex<Vec<Meme>>,
}

#[async_trait]
impl MemeRepository for InMemoryMemes {
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        self.memes.lock().unwrap().push(meme.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        Ok(self
            .memes
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.meme_id == id)
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Meme>, RepoError> {
        let mut memes = self.memes.lock().unwrap().clone();
        memes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        memes.truncate(limit);
        Ok(memes)
    }

    async fn list_top(&self, limit: usize) -> Result<Vec<Meme>, RepoError> {
        let memes = self.memes.lock().unwrap().clone();
        Ok(ranking::top_by_likes(memes, limit))
    }
}

#[derive(Default)]
pub struct InMemoryVotes {
    pub votes: Mutex<Vec<Vote>>,
    pub fail_reads: AtomicBool,
}

#[async_trait]
impl VoteRepository for InMemoryVotes {
    async fn record(&self, vote: &Vote) -> Result<(), RepoError> {
        self.votes.lock().unwrap().push(vote.clone());
        Ok(())
    }

    async fn disliked_clusters(&self, user_id: &str) -> Result<HashMap<String, u64>, RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::BackendError(anyhow::anyhow!("votes table unavailable")));
        }
        let mut counts = HashMap::new();
        for vote in self.votes.lock().unwrap().iter() {
            if vote.user_id == user_id && vote.vote_type == VoteKind::Dislike {
                *counts.entry(vote.cluster_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct InMemoryHistory {
    pub records: Mutex<Vec<ShownRecord>>,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl FeedHistoryRepository for InMemoryHistory {
    async fn record_shown(&self, records: &[ShownRecord]) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::BackendError(anyhow::anyhow!("history table unavailable")));
        }
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn shown_clusters_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, RepoError> {
        let mut counts = HashMap::new();
        for record in self.records.lock().unwrap().iter() {
            if record.user_id == user_id && record.shown_at >= since {
                *counts.entry(record.cluster_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

pub struct FixedHasher(pub String);

#[async_trait]
impl PerceptualHasher for FixedHasher {
    async fn hash(&self, _image_url: &str) -> Result<String, HashError> {
        Ok(self.0.clone())
    }
}

pub struct TestBackend {
    pub memes: Arc<InMemoryMemes>,
    pub votes: Arc<InMemoryVotes>,
    pub history: Arc<InMemoryHistory>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            memes: Arc::new(InMemoryMemes::default()),
            votes: Arc::new(InMemoryVotes::default()),
            history: Arc::new(InMemoryHistory::default()),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            meme_repo: self.memes.clone(),
            vote_repo: self.votes.clone(),
            history_repo: self.history.clone(),
            hasher: Arc::new(FixedHasher("8f373714acfcf4d0".to_string())),
            jwt: JwtValidator::new(SECRET, Algorithm::HS256),
        })
    }

    pub fn insert(&self, meme: Meme) -> Meme {
        self.memes.memes.lock().unwrap().push(meme.clone());
        meme
    }

    pub fn dislike(&self, user_id: &str, cluster_id: &str, times: usize) {
        let mut votes = self.votes.votes.lock().unwrap();
        for _ in 0..times {
            votes.push(Vote {
                vote_id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                meme_id: Uuid::new_v4(),
                vote_type: VoteKind::Dislike,
                cluster_id: cluster_id.to_string(),
                created_at: Utc::now(),
            });
        }
    }
}

pub fn meme(cluster: &str, likes: u64, created_at: DateTime<Utc>) -> Meme {
    Meme {
        meme_id: Uuid::new_v4(),
        image_url: format!("https://img.example/{}.png", Uuid::new_v4()),
        perceptual_hash: cluster.to_string(),
        cluster_id: cluster.to_string(),
        created_at,
        like_count: likes,
        share_count: 0,
        user_id: None,
        title: None,
        description: None,
    }
}

pub fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - Duration::hours(hours)
}

pub fn bearer(sub: &str) -> String {
    let claims = Claims {
        sub: Some(sub.to_string()),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as u64,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
