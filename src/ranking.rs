//! Feed ranking: decayed-popularity scoring and the per-cluster diversity filter.

use crate::models::{Meme, UserLimits};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Added to the age so that brand-new memes do not divide by zero.
pub const AGE_EPSILON_HOURS: f64 = 0.001;
/// Maximum number of memes returned per feed page.
pub const FEED_PAGE_SIZE: usize = 20;
/// Maximum memes from one cluster in a single feed page.
pub const MAX_PER_CLUSTER: u64 = 2;
/// Clusters the user disliked this many times are never shown again.
pub const DISLIKE_THRESHOLD: u64 = 3;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// `(likes + shares) / (age_hours + ε)`.
///
/// Memes dated in the future are treated as just created, so the score is
/// always finite and non-negative.
pub fn score(like_count: u64, share_count: u64, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - created_at).num_milliseconds() as f64 / MILLIS_PER_HOUR;
    let engagement = like_count.saturating_add(share_count) as f64;
    engagement / (age_hours.max(0.0) + AGE_EPSILON_HOURS)
}

pub fn score_meme(meme: &Meme, now: DateTime<Utc>) -> f64 {
    score(meme.like_count, meme.share_count, meme.created_at, now)
}

/// Sorts by descending score; equal scores fall back to ascending meme id.
pub fn rank(candidates: Vec<Meme>, now: DateTime<Utc>) -> Vec<Meme> {
    let mut scored: Vec<(f64, Meme)> = candidates
        .into_iter()
        .map(|meme| (score_meme(&meme, now), meme))
        .collect();
    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .total_cmp(a_score)
            .then_with(|| a.meme_id.cmp(&b.meme_id))
    });
    scored.into_iter().map(|(_, meme)| meme).collect()
}

/// Ranks the candidates and walks them once, dropping clusters the user has
/// disliked too often and capping each cluster's share of the page.
///
/// `limits.shown_last_day` is not consulted here.
pub fn select_feed(candidates: Vec<Meme>, limits: &UserLimits, now: DateTime<Utc>) -> Vec<Meme> {
    let mut per_cluster: HashMap<String, u64> = HashMap::new();
    let mut selected = Vec::with_capacity(FEED_PAGE_SIZE.min(candidates.len()));

    for meme in rank(candidates, now) {
        if selected.len() >= FEED_PAGE_SIZE {
            break;
        }
        if limits.dislikes_for(&meme.cluster_id) >= DISLIKE_THRESHOLD {
            continue;
        }
        let taken = per_cluster.entry(meme.cluster_id.clone()).or_insert(0);
        if *taken >= MAX_PER_CLUSTER {
            continue;
        }
        *taken += 1;
        selected.push(meme);
    }

    selected
}

/// Keeps the `limit` most-liked memes, newest first among equal like counts.
pub fn top_by_likes(mut memes: Vec<Meme>, limit: usize) -> Vec<Meme> {
    memes.sort_by(|a, b| {
        b.like_count
            .cmp(&a.like_count)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.meme_id.cmp(&b.meme_id))
    });
    memes.truncate(limit);
    memes
}
