use thiserror::Error;

/// Coarse classification of a service failure, used by the API layer to
/// pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthenticated,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Unavailable => "service_unavailable",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Food not found: {food_id}")]
    FoodNotFound { food_id: String },

    #[error("Unknown food in cart request: {food_id}")]
    UnknownFood { food_id: String },

    #[error("Cart item not found: food_id={food_id}, user_id={user_id}")]
    CartItemNotFound { food_id: String, user_id: String },

    #[error("User not found: {email}")]
    UserNotFound { email: String },

    #[error("Email already registered: {email}")]
    EmailAlreadyRegistered { email: String },

    #[error("Missing caller identity")]
    MissingIdentity,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },

    #[error("Credential error: {message}")]
    Credential { message: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::FoodNotFound { .. }
            | ServiceError::CartItemNotFound { .. }
            | ServiceError::UserNotFound { .. } => ErrorKind::NotFound,
            ServiceError::UnknownFood { .. }
            | ServiceError::ValidationError { .. }
            | ServiceError::InvalidQuantity { .. } => ErrorKind::Validation,
            ServiceError::EmailAlreadyRegistered { .. } => ErrorKind::Conflict,
            ServiceError::MissingIdentity => ErrorKind::Unauthenticated,
            ServiceError::Repository { source } => match source {
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::ConstraintViolation { .. }
                | RepositoryError::VersionConflict { .. } => ErrorKind::Conflict,
                RepositoryError::ConnectionFailed
                | RepositoryError::Timeout
                | RepositoryError::TableNotFound { .. } => ErrorKind::Unavailable,
                _ => ErrorKind::Internal,
            },
            ServiceError::Credential { .. } => ErrorKind::Internal,
        }
    }
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Item not found")]
    NotFound,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Invalid stored item: {message}")]
    InvalidItem { message: String },

    #[error("Catalog load failed: {message}")]
    CatalogLoad { message: String },

    #[error("Cart for {user_id} was changed by another writer")]
    VersionConflict { user_id: String },

    #[error("Timeout occurred during operation")]
    Timeout,
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Field too short: {field}, min_length={min_length}, actual_length={actual_length}")]
    TooShort {
        field: String,
        min_length: usize,
        actual_length: usize,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
