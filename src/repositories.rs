use crate::{
    domain::{FeedHistoryRepository, MemeRepository, VoteRepository},
    errors::RepoError,
    models::{format_timestamp, parse_timestamp, Meme, ShownRecord, Vote, VoteKind},
    ranking,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    types::{AttributeValue, PutRequest, WriteRequest},
    Client as DynamoDbClient,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

/// GSI on the memes table ordering all memes by `created_at`.
pub const CREATED_AT_INDEX: &str = "created_at_index";
/// Every meme carries the same GSI partition value so one query spans them all.
pub const FEED_PARTITION: &str = "all";
/// BatchWriteItem accepts at most this many requests.
const BATCH_WRITE_LIMIT: usize = 25;

type Item = HashMap<String, AttributeValue>;

// --- Memes ---

#[derive(Debug, Clone)]
pub struct DynamoDbMemeRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbMemeRepository {
    /// Creates a new repository instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbMemeRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl MemeRepository for DynamoDbMemeRepository {
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(meme_to_item(meme)))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to put meme (id: {})",
                self.table_name, meme.meme_id
            ))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        let id_str = id.to_string();
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("meme_id", AttributeValue::S(id_str.clone()))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to get meme (id: {})",
                self.table_name, id_str
            ))?;

        match resp.item {
            Some(item) => item_to_meme(&item).map(Some).map_err(|reason| {
                tracing::error!(meme_id = %id_str, table_name = %self.table_name, %reason, "DynamoDB: Retrieved item but failed to parse into Meme");
                RepoError::DataCorruption(format!(
                    "meme {} in table '{}': {}",
                    id_str, self.table_name, reason
                ))
            }),
            None => Ok(None), // Item not found is not an error
        }
    }

    /// Queries the `created_at` index newest-first, following pages until `limit` memes are read.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Meme>, RepoError> {
        let mut memes: Vec<Meme> = Vec::with_capacity(limit);
        let mut last_evaluated_key: Option<Item> = None;

        while memes.len() < limit {
            let page_limit = i32::try_from(limit - memes.len()).unwrap_or(i32::MAX);
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(CREATED_AT_INDEX)
                .key_condition_expression("feed_partition = :p")
                .expression_attribute_values(":p", AttributeValue::S(FEED_PARTITION.to_string()))
                .scan_index_forward(false)
                .limit(page_limit)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!(
                    "DynamoDB: Failed to query recent memes from table '{}'",
                    self.table_name
                ))?;

            for item in resp.items.unwrap_or_default() {
                let meme = item_to_meme(&item).map_err(|reason| {
                    let item_id = item.get("meme_id").and_then(|v| v.as_s().ok());
                    tracing::error!(item.id = ?item_id, table_name = %self.table_name, %reason, "DynamoDB: Failed to parse queried item into Meme");
                    RepoError::DataCorruption(format!(
                        "item {:?} in table '{}': {}",
                        item_id, self.table_name, reason
                    ))
                })?;
                memes.push(meme);
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        memes.truncate(limit);
        tracing::debug!(table_name = %self.table_name, count = memes.len(), "DynamoDB: Listed recent memes");
        Ok(memes)
    }

    /// Scans the whole table (handling pagination) and keeps the most liked.
    /// There is no index on `like_count`, so this reads every meme.
    async fn list_top(&self, limit: usize) -> Result<Vec<Meme>, RepoError> {
        tracing::debug!("DynamoDB: Scanning table '{}' for top memes", self.table_name);
        let mut memes: Vec<Meme> = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB: Failed to scan table '{}'", self.table_name))?;

            for item in resp.items.unwrap_or_default() {
                let meme = item_to_meme(&item).map_err(|reason| {
                    let item_id = item.get("meme_id").and_then(|v| v.as_s().ok());
                    tracing::error!(item.id = ?item_id, table_name = %self.table_name, %reason, "DynamoDB: Failed to parse item from scan into Meme");
                    RepoError::DataCorruption(format!(
                        "item {:?} in table '{}': {}",
                        item_id, self.table_name, reason
                    ))
                })?;
                memes.push(meme);
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        let top = ranking::top_by_likes(memes, limit);
        tracing::info!("DynamoDB (table: {}): Selected {} top memes", self.table_name, top.len());
        Ok(top)
    }
}

// --- Votes ---

#[derive(Debug, Clone)]
pub struct DynamoDbVoteRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbVoteRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbVoteRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl VoteRepository for DynamoDbVoteRepository {
    async fn record(&self, vote: &Vote) -> Result<(), RepoError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(vote_to_item(vote)))
            .send()
            .await
            .context(format!(
                "DynamoDB (table: {}): Failed to record vote by {} on meme {}",
                self.table_name, vote.user_id, vote.meme_id
            ))?;
        Ok(())
    }

    async fn disliked_clusters(&self, user_id: &str) -> Result<HashMap<String, u64>, RepoError> {
        let mut counts = HashMap::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("user_id = :u")
                .filter_expression("vote_type = :d")
                .projection_expression("cluster_id")
                .expression_attribute_values(":u", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":d", AttributeValue::S(VoteKind::Dislike.as_str().to_string()))
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!(
                    "DynamoDB (table: {}): Failed to aggregate dislikes for user {}",
                    self.table_name, user_id
                ))?;

            tally_clusters(&mut counts, resp.items.unwrap_or_default(), &self.table_name)?;

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(counts)
    }
}

// --- Feed history ---

#[derive(Debug, Clone)]
pub struct DynamoDbFeedHistoryRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbFeedHistoryRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbFeedHistoryRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl FeedHistoryRepository for DynamoDbFeedHistoryRepository {
    async fn record_shown(&self, records: &[ShownRecord]) -> Result<(), RepoError> {
        let mut unprocessed = 0usize;

        for chunk in records.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|record| {
                    PutRequest::builder()
                        .set_item(Some(shown_record_to_item(record)))
                        .build()
                        .map(|put| WriteRequest::builder().put_request(put).build())
                })
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to build feed history write requests")?;

            let resp = self
                .client
                .batch_write_item()
                .request_items(self.table_name.clone(), requests)
                .send()
                .await
                .context(format!(
                    "DynamoDB (table: {}): Failed to write {} feed history records",
                    self.table_name,
                    chunk.len()
                ))?;

            unprocessed += resp
                .unprocessed_items
                .as_ref()
                .and_then(|pending| pending.get(&self.table_name))
                .map_or(0, Vec::len);
        }

        if unprocessed > 0 {
            return Err(RepoError::BackendError(anyhow!(
                "DynamoDB (table: {}): {} feed history records left unprocessed",
                self.table_name,
                unprocessed
            )));
        }
        tracing::debug!(table_name = %self.table_name, count = records.len(), "DynamoDB: Recorded feed history");
        Ok(())
    }

    async fn shown_clusters_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, u64>, RepoError> {
        let mut counts = HashMap::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("user_id = :u AND shown_key >= :since")
                .projection_expression("cluster_id")
                .expression_attribute_values(":u", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":since", AttributeValue::S(format_timestamp(&since)))
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!(
                    "DynamoDB (table: {}): Failed to aggregate shown history for user {}",
                    self.table_name, user_id
                ))?;

            tally_clusters(&mut counts, resp.items.unwrap_or_default(), &self.table_name)?;

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        Ok(counts)
    }
}

// --- Item conversion ---

fn tally_clusters(
    counts: &mut HashMap<String, u64>,
    items: Vec<Item>,
    table_name: &str,
) -> Result<(), RepoError> {
    for item in items {
        let cluster_id = required_s(&item, "cluster_id").map_err(|reason| {
            RepoError::DataCorruption(format!("row in table '{}': {}", table_name, reason))
        })?;
        *counts.entry(cluster_id).or_insert(0) += 1;
    }
    Ok(())
}

fn required_s(item: &Item, field: &str) -> Result<String, String> {
    item.get(field)
        .ok_or_else(|| format!("missing field '{}'", field))?
        .as_s()
        .map(|s| s.to_string())
        .map_err(|_| format!("field '{}' is not a string", field))
}

fn optional_s(item: &Item, field: &str) -> Option<String> {
    item.get(field).and_then(|v| v.as_s().ok()).cloned()
}

// Counters are written as 0 on create, but rows from other writers may omit them.
fn counter(item: &Item, field: &str) -> Result<u64, String> {
    match item.get(field) {
        None => Ok(0),
        Some(value) => value
            .as_n()
            .map_err(|_| format!("field '{}' is not a number", field))?
            .parse::<u64>()
            .map_err(|e| format!("field '{}' is not a non-negative integer: {}", field, e)),
    }
}

pub(crate) fn meme_to_item(meme: &Meme) -> Item {
    let mut item = HashMap::from([
        ("meme_id".to_string(), AttributeValue::S(meme.meme_id.to_string())),
        ("image_url".to_string(), AttributeValue::S(meme.image_url.clone())),
        ("perceptual_hash".to_string(), AttributeValue::S(meme.perceptual_hash.clone())),
        ("cluster_id".to_string(), AttributeValue::S(meme.cluster_id.clone())),
        ("created_at".to_string(), AttributeValue::S(format_timestamp(&meme.created_at))),
        ("like_count".to_string(), AttributeValue::N(meme.like_count.to_string())),
        ("share_count".to_string(), AttributeValue::N(meme.share_count.to_string())),
        ("feed_partition".to_string(), AttributeValue::S(FEED_PARTITION.to_string())),
    ]);
    let optional = [
        ("user_id", &meme.user_id),
        ("title", &meme.title),
        ("description", &meme.description),
    ];
    for (field, value) in optional {
        if let Some(value) = value {
            item.insert(field.to_string(), AttributeValue::S(value.clone()));
        }
    }
    item
}

/// Converts a DynamoDB item into a `Meme`, naming the first field that does not fit.
pub(crate) fn item_to_meme(item: &Item) -> Result<Meme, String> {
    let meme_id_str = required_s(item, "meme_id")?;
    let meme_id = Uuid::parse_str(&meme_id_str)
        .map_err(|e| format!("meme_id '{}' is not a UUID: {}", meme_id_str, e))?;
    let created_at_str = required_s(item, "created_at")?;
    let created_at = parse_timestamp(&created_at_str)
        .ok_or_else(|| format!("created_at '{}' is not a timestamp", created_at_str))?;

    Ok(Meme {
        meme_id,
        image_url: required_s(item, "image_url")?,
        perceptual_hash: required_s(item, "perceptual_hash")?,
        cluster_id: required_s(item, "cluster_id")?,
        created_at,
        like_count: counter(item, "like_count")?,
        share_count: counter(item, "share_count")?,
        user_id: optional_s(item, "user_id"),
        title: optional_s(item, "title"),
        description: optional_s(item, "description"),
    })
}

fn vote_to_item(vote: &Vote) -> Item {
    HashMap::from([
        ("user_id".to_string(), AttributeValue::S(vote.user_id.clone())),
        ("vote_id".to_string(), AttributeValue::S(vote.vote_id.to_string())),
        ("meme_id".to_string(), AttributeValue::S(vote.meme_id.to_string())),
        ("vote_type".to_string(), AttributeValue::S(vote.vote_type.as_str().to_string())),
        ("cluster_id".to_string(), AttributeValue::S(vote.cluster_id.clone())),
        ("created_at".to_string(), AttributeValue::S(format_timestamp(&vote.created_at))),
    ])
}

/// Sort key for feed history rows; prefixing the timestamp makes the 24h window a key range.
pub(crate) fn shown_key(record: &ShownRecord) -> String {
    format!("{}#{}", format_timestamp(&record.shown_at), record.meme_id)
}

fn shown_record_to_item(record: &ShownRecord) -> Item {
    HashMap::from([
        ("user_id".to_string(), AttributeValue::S(record.user_id.clone())),
        ("shown_key".to_string(), AttributeValue::S(shown_key(record))),
        ("meme_id".to_string(), AttributeValue::S(record.meme_id.to_string())),
        ("cluster_id".to_string(), AttributeValue::S(record.cluster_id.clone())),
        ("shown_at".to_string(), AttributeValue::S(format_timestamp(&record.shown_at))),
    ])
}
