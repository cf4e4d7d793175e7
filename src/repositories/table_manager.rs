use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::map_dynamodb_error;
use super::user_repository::USER_ID_INDEX;
use crate::models::{RepositoryError, RepositoryResult};

const MAX_ACTIVE_CHECKS: u32 = 30;
const ACTIVE_CHECK_INTERVAL: Duration = Duration::from_secs(10);

fn build_error(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::AwsSdk {
        message: format!("Failed to build {}: {}", what, e),
    }
}

fn string_attribute(name: &str) -> RepositoryResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| build_error("attribute definition", e))
}

fn hash_key(name: &str) -> RepositoryResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| build_error("key schema", e))
}

/// Users are keyed on email; `UserIdIndex` resolves the stable user ID.
pub(crate) fn users_table_schema(
) -> RepositoryResult<(Vec<AttributeDefinition>, Vec<KeySchemaElement>, GlobalSecondaryIndex)> {
    let attributes = vec![string_attribute("email")?, string_attribute("user_id")?];
    let key_schema = vec![hash_key("email")?];
    let user_id_index = GlobalSecondaryIndex::builder()
        .index_name(USER_ID_INDEX)
        .key_schema(hash_key("user_id")?)
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .map_err(|e| build_error("GSI", e))?;

    Ok((attributes, key_schema, user_id_index))
}

pub(crate) fn carts_table_schema(
) -> RepositoryResult<(Vec<AttributeDefinition>, Vec<KeySchemaElement>)> {
    Ok((vec![string_attribute("user_id")?], vec![hash_key("user_id")?]))
}

/// Manages DynamoDB table creation for the users and carts tables
pub struct TableManager {
    client: Arc<DynamoDbClient>,
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self { client }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_users_table(&self, table_name: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let (attributes, key_schema, user_id_index) = users_table_schema()?;

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attributes))
            .set_key_schema(Some(key_schema))
            .global_secondary_indexes(user_id_index)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

        info!("Users table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_carts_table(&self, table_name: &str) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let (attributes, key_schema) = carts_table_schema()?;

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attributes))
            .set_key_schema(Some(key_schema))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

        info!("Carts table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", service_error);
                    Err(RepositoryError::ConnectionFailed)
                }
            }
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        for _ in 0..MAX_ACTIVE_CHECKS {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), table_name))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            tokio::time::sleep(ACTIVE_CHECK_INTERVAL).await;
        }

        error!("Timeout waiting for table {} to become active", table_name);
        Err(RepositoryError::Timeout)
    }

    #[instrument(skip(self))]
    pub async fn create_all_tables(
        &self,
        users_table: &str,
        carts_table: &str,
    ) -> RepositoryResult<()> {
        let (users_result, carts_result) = tokio::join!(
            self.create_users_table(users_table),
            self.create_carts_table(carts_table)
        );

        users_result?;
        carts_result?;

        info!("All tables ready");
        Ok(())
    }
}
