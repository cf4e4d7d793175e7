use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{CartRepository, UserRepository};
use crate::models::{Cart, RepositoryError, RepositoryResult, User};

/// In-memory cart store, one cart per user ID.
#[derive(Clone, Default)]
pub struct InMemoryCartRepository {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of carts held, including empty ones
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find_cart(&self, user_id: &str) -> RepositoryResult<Option<Cart>> {
        Ok(self.carts.read().await.get(user_id).cloned())
    }

    /// Same contract as the DynamoDB store: the write only lands when the
    /// stored version still matches the one the cart was read at.
    async fn save_cart(&self, mut cart: Cart) -> RepositoryResult<Cart> {
        let mut carts = self.carts.write().await;

        let stored_version = carts.get(&cart.user_id).map_or(0, |stored| stored.version);
        if stored_version != cart.version {
            return Err(RepositoryError::VersionConflict {
                user_id: cart.user_id,
            });
        }

        cart.version += 1;
        carts.insert(cart.user_id.clone(), cart.clone());
        Ok(cart)
    }
}

#[derive(Default)]
struct UserTables {
    by_email: HashMap<String, User>,
    email_by_id: HashMap<String, String>,
}

/// In-memory account store. Email and ID lookups share one lock so the
/// uniqueness check and the insert cannot interleave.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<UserTables>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.by_email.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: User) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;

        if tables.by_email.contains_key(&user.email) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("email {} already exists", user.email),
            });
        }

        tables
            .email_by_id
            .insert(user.id.clone(), user.email.clone());
        tables.by_email.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().await.by_email.get(email).cloned())
    }

    async fn find_by_id(&self, user_id: &str) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .email_by_id
            .get(user_id)
            .and_then(|email| tables.by_email.get(email))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRequest;
    use rust_decimal_macros::dec;

    fn user(email: &str) -> User {
        User::new(
            &UserRequest {
                name: "Test".to_string(),
                email: email.to_string(),
                password: "password123".to_string(),
                mobile: None,
            },
            "hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_cart_save_and_find() {
        let repo = InMemoryCartRepository::new();
        assert!(repo.find_cart("u1").await.unwrap().is_none());

        let mut cart = Cart::new("u1".to_string());
        cart.add_item("1".to_string(), 2, dec!(299));
        let saved = repo.save_cart(cart).await.unwrap();

        assert_eq!(saved.version, 1);
        assert_eq!(repo.find_cart("u1").await.unwrap(), Some(saved));
        assert!(repo.find_cart("u2").await.unwrap().is_none());
        assert_eq!(repo.cart_count().await, 1);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_cart() {
        let repo = InMemoryCartRepository::new();
        let mut cart = Cart::new("u1".to_string());
        cart.add_item("1".to_string(), 2, dec!(299));
        let mut cart = repo.save_cart(cart).await.unwrap();

        cart.clear();
        repo.save_cart(cart).await.unwrap();

        let stored = repo.find_cart("u1").await.unwrap().unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let repo = InMemoryCartRepository::new();
        let mut first = Cart::new("u1".to_string());
        first.add_item("1".to_string(), 1, dec!(299));
        let mut second = first.clone();
        second.add_item("7".to_string(), 1, dec!(249));

        repo.save_cart(first).await.unwrap();
        let result = repo.save_cart(second).await;

        assert!(matches!(
            result,
            Err(RepositoryError::VersionConflict { ref user_id }) if user_id == "u1"
        ));
        let stored = repo.find_cart("u1").await.unwrap().unwrap();
        assert!(!stored.contains_item("7"));
    }

    #[tokio::test]
    async fn test_create_user_and_lookup() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create_user(user("a@x.com")).await.unwrap();

        let by_email = repo.find_by_email("a@x.com").await.unwrap().unwrap();
        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_email, created);
        assert_eq!(by_id, created);
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create_user(user("a@x.com")).await.unwrap();

        let result = repo.create_user(user("a@x.com")).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConstraintViolation { .. })
        ));

        assert_eq!(repo.user_count().await, 1);
        assert_eq!(repo.find_by_email("a@x.com").await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_concurrent_registration_admits_one() {
        let repo = InMemoryUserRepository::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_user(user("race@x.com")).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(repo.user_count().await, 1);
    }
}
