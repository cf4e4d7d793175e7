use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_dynamodb::Error as DynamoDbError;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use super::dynamodb::{dynamodb_span, map_dynamodb_error, required_string, required_timestamp};
use crate::models::{Cart, CartItem, RepositoryError, RepositoryResult};

/// Trait defining the interface for cart data access operations
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find a cart by user ID
    async fn find_cart(&self, user_id: &str) -> RepositoryResult<Option<Cart>>;

    /// Save a cart read at `cart.version`. Fails with `VersionConflict`
    /// when another writer saved in between; otherwise returns the cart at
    /// its new version.
    async fn save_cart(&self, cart: Cart) -> RepositoryResult<Cart>;
}

/// A put lands only on a missing item, a pre-versioning item, or the version
/// the cart was read at
const SAVE_CONDITION: &str = "attribute_not_exists(version) OR version = :expected";

/// DynamoDB implementation of the CartRepository trait
pub struct DynamoDbCartRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbCartRepository {
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

    /// Convert a Cart struct to DynamoDB attribute values
    pub fn cart_to_item(&self, cart: &Cart) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert(
            "user_id".to_string(),
            AttributeValue::S(cart.user_id.clone()),
        );

        let items: Vec<AttributeValue> = cart
            .items
            .iter()
            .map(|cart_item| {
                let mut item_map = HashMap::new();
                item_map.insert(
                    "food_id".to_string(),
                    AttributeValue::S(cart_item.food_id.clone()),
                );
                item_map.insert(
                    "quantity".to_string(),
                    AttributeValue::N(cart_item.quantity.to_string()),
                );
                item_map.insert(
                    "unit_price".to_string(),
                    AttributeValue::N(cart_item.unit_price.to_string()),
                );
                item_map.insert(
                    "added_at".to_string(),
                    AttributeValue::S(cart_item.added_at.to_rfc3339()),
                );
                AttributeValue::M(item_map)
            })
            .collect();

        item.insert("items".to_string(), AttributeValue::L(items));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(cart.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(cart.updated_at.to_rfc3339()),
        );
        item.insert(
            "version".to_string(),
            AttributeValue::N(cart.version.to_string()),
        );

        item
    }

    /// Convert a DynamoDB item to a Cart. Lines that fail to decode or carry
    /// a zero quantity are dropped.
    pub fn item_to_cart(&self, item: HashMap<String, AttributeValue>) -> RepositoryResult<Cart> {
        let user_id = required_string(&item, "user_id")?;

        let items = item
            .get("items")
            .and_then(|v| v.as_l().ok())
            .map(|list| {
                list.iter()
                    .filter_map(|item_attr| match item_attr.as_m() {
                        Ok(item_map) => match self.map_to_cart_item(item_map) {
                            Ok(cart_item) if cart_item.quantity > 0 => Some(cart_item),
                            Ok(_) => None,
                            Err(e) => {
                                warn!(user_id = %user_id, error = %e, "Skipping undecodable cart line");
                                None
                            }
                        },
                        Err(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let created_at = required_timestamp(&item, "created_at")?;
        // Older items may lack updated_at; fall back to created_at
        let updated_at = required_timestamp(&item, "updated_at").unwrap_or(created_at);
        // Items written before versioning count as version 0
        let version = item
            .get("version")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        Ok(Cart {
            user_id,
            items,
            created_at,
            updated_at,
            version,
        })
    }

    /// Convert a DynamoDB map to a CartItem
    pub fn map_to_cart_item(
        &self,
        item_map: &HashMap<String, AttributeValue>,
    ) -> RepositoryResult<CartItem> {
        let food_id = required_string(item_map, "food_id")?;

        let quantity = item_map
            .get("quantity")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| RepositoryError::InvalidItem {
                message: "Invalid quantity in cart item".to_string(),
            })?;

        let unit_price = item_map
            .get("unit_price")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| Decimal::from_str(s).ok())
            .ok_or_else(|| RepositoryError::InvalidItem {
                message: "Invalid unit_price in cart item".to_string(),
            })?;

        let added_at = required_timestamp(item_map, "added_at")?;

        Ok(CartItem {
            food_id,
            quantity,
            unit_price,
            added_at,
        })
    }
}

#[async_trait]
impl CartRepository for DynamoDbCartRepository {
    #[instrument(skip(self), fields(table = %self.table_name, user_id = %user_id))]
    async fn find_cart(&self, user_id: &str) -> RepositoryResult<Option<Cart>> {
        info!("Finding cart for user");

        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("user_id", AttributeValue::S(user_id.to_string()))
                .consistent_read(true)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(e.into(), &self.table_name))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => {
                let cart = self.item_to_cart(item)?;
                info!("Cart found with {} items", cart.items.len());
                Ok(Some(cart))
            }
            None => {
                info!("Cart not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, cart), fields(table = %self.table_name, user_id = %cart.user_id, item_count = cart.items.len(), version = cart.version))]
    async fn save_cart(&self, mut cart: Cart) -> RepositoryResult<Cart> {
        info!("Saving cart");

        let expected = cart.version;
        cart.version += 1;
        let item = self.cart_to_item(&cart);
        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression(SAVE_CONDITION)
                .expression_attribute_values(":expected", AttributeValue::N(expected.to_string()))
                .send()
                .await
                .map_err(|e| match DynamoDbError::from(e) {
                    DynamoDbError::ConditionalCheckFailedException(_) => {
                        RepositoryError::VersionConflict {
                            user_id: cart.user_id.clone(),
                        }
                    }
                    other => map_dynamodb_error(other, &self.table_name),
                })
        }
        .instrument(put_span)
        .await?;

        info!(version = cart.version, "Cart saved successfully");
        Ok(cart)
    }
}
