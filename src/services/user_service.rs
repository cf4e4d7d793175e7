use std::sync::Arc;
use tracing::{instrument, warn};

use crate::models::{
    normalize_email, RepositoryError, ServiceError, ServiceResult, User, UserRequest,
    UserResponse, Validate,
};
use crate::repositories::UserRepository;
use crate::services::CredentialHasher;

/// Service for registering users and resolving the caller's identity
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { repository, hasher }
    }

    /// Create a new account. The clear-text credential is hashed before it
    /// reaches the store and is never part of the response.
    #[instrument(skip(self, request), fields(email = %normalize_email(&request.email)))]
    pub async fn register_user(&self, request: UserRequest) -> ServiceResult<UserResponse> {
        crate::info_with_trace!("Registering user");

        request.validate()?;

        let hasher = self.hasher.clone();
        let credential = request.password.clone();
        // Argon2 is deliberately slow; keep it off the async workers
        let credential_hash = tokio::task::spawn_blocking(move || hasher.hash(&credential))
            .await
            .map_err(|e| ServiceError::Credential {
                message: e.to_string(),
            })??;

        let user = User::new(&request, credential_hash);
        let email = user.email.clone();

        let created = match self.repository.create_user(user).await {
            Ok(created) => created,
            Err(RepositoryError::ConstraintViolation { .. }) => {
                warn!("Email already registered");
                return Err(ServiceError::EmailAlreadyRegistered { email });
            }
            Err(e) => return Err(e.into()),
        };

        crate::info_with_trace!(user_id = %created.id, "User registered");
        Ok(created.to_response())
    }

    /// Resolve the authenticated caller to their user ID
    #[instrument(skip(self, identity))]
    pub async fn find_by_user_id(&self, identity: &str) -> ServiceResult<String> {
        Ok(self.resolve(identity).await?.id)
    }

    /// Public profile of the authenticated caller
    #[instrument(skip(self, identity))]
    pub async fn current_user(&self, identity: &str) -> ServiceResult<UserResponse> {
        Ok(self.resolve(identity).await?.to_response())
    }

    async fn resolve(&self, identity: &str) -> ServiceResult<User> {
        let email = normalize_email(identity);
        if email.is_empty() {
            return Err(ServiceError::MissingIdentity);
        }

        self.repository
            .find_by_email(&email)
            .await?
            .ok_or(ServiceError::UserNotFound { email })
    }
}
