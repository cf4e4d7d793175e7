// Services module - business logic layer

pub mod cart_service;
pub mod catalog_service;
pub mod credentials;
pub mod locks;
pub mod user_service;

pub use cart_service::{CartService, WriteRetryPolicy};
pub use catalog_service::CatalogService;
pub use credentials::{Argon2CredentialHasher, CredentialHasher};
pub use locks::KeyedLocks;
pub use user_service::UserService;
