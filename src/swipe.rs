use crate::{
    AppState,
    errors::RepoError,
    models::{Vote, VoteKind},
};
use chrono::{DateTime, Utc};
use tracing;
use uuid::Uuid;

/// Records a swipe, tagging the vote with the meme's current cluster.
///
/// Returns `RepoError::NotFound` without writing anything if the meme does not exist.
pub async fn record_swipe(
    state: &AppState,
    user_id: &str,
    meme_id: Uuid,
    kind: VoteKind,
    now: DateTime<Utc>,
) -> Result<Vote, RepoError> {
    let meme = state
        .meme_repo
        .get_by_id(meme_id)
        .await?
        .ok_or(RepoError::NotFound(meme_id))?;

    let vote = Vote {
        vote_id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        meme_id,
        vote_type: kind,
        cluster_id: meme.cluster_id,
        created_at: now,
    };
    state.vote_repo.record(&vote).await?;

    tracing::info!(%user_id, %meme_id, vote_type = %kind, cluster_id = %vote.cluster_id, "Swipe recorded");
    Ok(vote)
}
