use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::error;

use crate::models::{RepositoryError, RepositoryResult};

/// Create a DynamoDB client span carrying the OpenTelemetry database
/// conventions, so every call shows up as its own subsegment.
pub(crate) fn dynamodb_span(operation: &str, table_name: &str, region: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
    )
}

/// Convert a DynamoDB error to a RepositoryError
pub(crate) fn map_dynamodb_error(error: DynamoDbError, table_name: &str) -> RepositoryError {
    match error {
        DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
            table_name: table_name.to_string(),
        },
        DynamoDbError::ConditionalCheckFailedException(_) => {
            RepositoryError::ConstraintViolation {
                message: "Conditional write rejected".to_string(),
            }
        }
        other => {
            error!("DynamoDB error: {:?}", other);
            RepositoryError::AwsSdk {
                message: other.to_string(),
            }
        }
    }
}

pub(crate) fn required_string(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Missing {}", key),
        })
}

pub(crate) fn optional_string(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

pub(crate) fn required_timestamp(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> RepositoryResult<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_string() {
        let mut item = HashMap::new();
        item.insert("email".to_string(), AttributeValue::S("a@x.com".to_string()));
        item.insert("count".to_string(), AttributeValue::N("3".to_string()));

        assert_eq!(required_string(&item, "email").unwrap(), "a@x.com");
        assert!(required_string(&item, "count").is_err());
        assert!(required_string(&item, "missing").is_err());
        assert_eq!(optional_string(&item, "missing"), None);
    }

    #[test]
    fn test_required_timestamp() {
        let now = Utc::now();
        let mut item = HashMap::new();
        item.insert("created_at".to_string(), AttributeValue::S(now.to_rfc3339()));
        item.insert("broken".to_string(), AttributeValue::S("yesterday".to_string()));

        assert_eq!(required_timestamp(&item, "created_at").unwrap(), now);
        assert!(required_timestamp(&item, "broken").is_err());
    }
}
