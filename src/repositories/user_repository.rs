use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, Instrument};

use super::dynamodb::{
    dynamodb_span, map_dynamodb_error, optional_string, required_string, required_timestamp,
};
use crate::models::{RepositoryError, RepositoryResult, User, UserRole};

/// Name of the secondary index used to resolve users by their stable ID
pub const USER_ID_INDEX: &str = "UserIdIndex";

/// Trait defining the interface for account storage
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `ConstraintViolation` if the email is
    /// already taken; the check and the insert are a single step.
    async fn create_user(&self, user: User) -> RepositoryResult<User>;

    /// Find a user by normalized email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, user_id: &str) -> RepositoryResult<Option<User>>;
}

/// DynamoDB implementation of the UserRepository trait. The table is keyed
/// on `email`, which makes the uniqueness check a conditional put.
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn user_to_item(&self, user: &User) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
        item.insert("user_id".to_string(), AttributeValue::S(user.id.clone()));
        item.insert("name".to_string(), AttributeValue::S(user.name.clone()));
        if let Some(mobile) = &user.mobile {
            item.insert("mobile".to_string(), AttributeValue::S(mobile.clone()));
        }
        item.insert(
            "role".to_string(),
            AttributeValue::S(user.role.to_string()),
        );
        item.insert(
            "credential_hash".to_string(),
            AttributeValue::S(user.credential_hash.clone()),
        );
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(user.created_at.to_rfc3339()),
        );

        item
    }

    pub fn item_to_user(&self, item: HashMap<String, AttributeValue>) -> RepositoryResult<User> {
        let role = match optional_string(&item, "role") {
            Some(role) => role
                .parse::<UserRole>()
                .map_err(|message| RepositoryError::InvalidItem { message })?,
            None => UserRole::default(),
        };

        Ok(User {
            id: required_string(&item, "user_id")?,
            name: required_string(&item, "name")?,
            email: required_string(&item, "email")?,
            mobile: optional_string(&item, "mobile"),
            role,
            credential_hash: required_string(&item, "credential_hash")?,
            created_at: required_timestamp(&item, "created_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self, user), fields(table = %self.table_name, user_id = %user.id))]
    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        info!("Creating user");

        let item = self.user_to_item(&user);
        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(email)")
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(put_span)
        .await?;

        info!("User created");
        Ok(user)
    }

    #[instrument(skip(self, email), fields(table = %self.table_name))]
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("email", AttributeValue::S(email.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        response.item.map(|item| self.item_to_user(item)).transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, user_id = %user_id))]
    async fn find_by_id(&self, user_id: &str) -> RepositoryResult<Option<User>> {
        let query_span = dynamodb_span("Query", &self.table_name, &self.region);

        let response = async {
            self.client
                .query()
                .table_name(&self.table_name)
                .index_name(USER_ID_INDEX)
                .key_condition_expression("user_id = :user_id")
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .limit(1)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(query_span)
        .await?;

        response
            .items
            .and_then(|items| items.into_iter().next())
            .map(|item| self.item_to_user(item))
            .transpose()
    }
}
