use crate::{config::TableNames, errors::AppError, repositories::CREATED_AT_INDEX};
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{
        AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
        Projection, ProjectionType, ScalarAttributeType,
    },
    Client as DynamoDbClient,
};
use aws_smithy_types::error::operation::BuildError;
use tracing;

/// Key layout of one table: partition key, optional sort key, optional
/// `(index, partition, sort)` global secondary index. All keys are strings.
struct TableSpec<'a> {
    name: &'a str,
    partition_key: &'static str,
    sort_key: Option<&'static str>,
    index: Option<(&'static str, &'static str, &'static str)>,
}

fn init_error(context: &str) -> impl Fn(BuildError) -> AppError + '_ {
    move |e| AppError::InitError(format!("{}: {}", context, e))
}

fn string_attribute(name: &str) -> Result<AttributeDefinition, AppError> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(init_error("Failed to build attribute definition"))
}

fn key(name: &str, key_type: KeyType) -> Result<KeySchemaElement, AppError> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(init_error("Failed to build key schema"))
}

/// Creates the DynamoDB table if it doesn't exist.
async fn create_table_if_not_exists(client: &DynamoDbClient, spec: &TableSpec<'_>) -> Result<(), AppError> {
    let mut attributes = vec![string_attribute(spec.partition_key)?];
    let mut request = client
        .create_table()
        .table_name(spec.name)
        .key_schema(key(spec.partition_key, KeyType::Hash)?)
        .billing_mode(BillingMode::PayPerRequest);

    if let Some(sort_key) = spec.sort_key {
        attributes.push(string_attribute(sort_key)?);
        request = request.key_schema(key(sort_key, KeyType::Range)?);
    }

    if let Some((index_name, partition, sort)) = spec.index {
        attributes.push(string_attribute(partition)?);
        attributes.push(string_attribute(sort)?);
        let index = GlobalSecondaryIndex::builder()
            .index_name(index_name)
            .key_schema(key(partition, KeyType::Hash)?)
            .key_schema(key(sort, KeyType::Range)?)
            .projection(Projection::builder().projection_type(ProjectionType::All).build())
            .build()
            .map_err(init_error("Failed to build secondary index"))?;
        request = request.global_secondary_indexes(index);
    }

    let result = request.set_attribute_definitions(Some(attributes)).send().await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", spec.name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", spec.name);
                    return Ok(());
                }
                let context = format!("Startup: Service error creating DynamoDB table '{}'", spec.name);
                tracing::error!("{}: {:?}", context, service_err);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", spec.name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Creates the memes, votes and feed history tables for local development.
pub async fn init_resources(client: &DynamoDbClient, tables: &TableNames) -> Result<(), AppError> {
    tracing::info!("Startup: Initializing DynamoDB tables...");
    let specs = [
        TableSpec {
            name: &tables.memes,
            partition_key: "meme_id",
            sort_key: None,
            index: Some((CREATED_AT_INDEX, "feed_partition", "created_at")),
        },
        TableSpec {
            name: &tables.votes,
            partition_key: "user_id",
            sort_key: Some("vote_id"),
            index: None,
        },
        TableSpec {
            name: &tables.feed_history,
            partition_key: "user_id",
            sort_key: Some("shown_key"),
            index: None,
        },
    ];
    for spec in &specs {
        create_table_if_not_exists(client, spec).await?;
    }
    tracing::info!("Startup: DynamoDB table initialization complete.");
    Ok(())
}
