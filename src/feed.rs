use crate::{
    AppState,
    errors::RepoError,
    models::{Meme, ShownRecord, UserLimits},
    ranking,
};
use chrono::{DateTime, Duration, Utc};
use tracing;

/// How many of the newest memes are considered for a feed page.
pub const CANDIDATE_WINDOW: usize = 1000;
/// Trailing window for the recently-shown aggregate.
pub const SHOWN_WINDOW_HOURS: i64 = 24;

/// Fetches the per-cluster exposure and dislike counts for a user.
///
/// Either query failing fails the lookup.
pub async fn fetch_user_limits(
    state: &AppState,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<UserLimits, RepoError> {
    let since = now - Duration::hours(SHOWN_WINDOW_HOURS);
    let (shown_last_day, disliked) = tokio::try_join!(
        state.history_repo.shown_clusters_since(user_id, since),
        state.vote_repo.disliked_clusters(user_id),
    )?;

    tracing::debug!(
        %user_id,
        recently_shown_clusters = shown_last_day.len(),
        disliked_clusters = disliked.len(),
        "Loaded user limits"
    );
    Ok(UserLimits {
        shown_last_day,
        disliked,
    })
}

/// Builds one feed page for `user_id` and records it in the feed history.
///
/// Recording is best-effort: a failed write is logged and the page is still returned.
pub async fn assemble_feed(
    state: &AppState,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Meme>, RepoError> {
    let limits = fetch_user_limits(state, user_id, now).await?;
    let candidates = state.meme_repo.list_recent(CANDIDATE_WINDOW).await?;
    let candidate_count = candidates.len();

    let feed = ranking::select_feed(candidates, &limits, now);
    tracing::info!(%user_id, candidate_count, selected = feed.len(), "Assembled feed");

    if !feed.is_empty() {
        let records: Vec<ShownRecord> = feed
            .iter()
            .map(|meme| ShownRecord {
                user_id: user_id.to_string(),
                meme_id: meme.meme_id,
                cluster_id: meme.cluster_id.clone(),
                shown_at: now,
            })
            .collect();
        if let Err(e) = state.history_repo.record_shown(&records).await {
            tracing::warn!(%user_id, error = %e, "Failed to record feed history, returning feed anyway");
        }
    }

    Ok(feed)
}
