// Repositories module - data access layer

pub mod cart_repository;
pub(crate) mod dynamodb;
pub mod food_repository;
pub mod memory;
pub mod table_manager;
pub mod user_repository;


pub use cart_repository::{CartRepository, DynamoDbCartRepository};
pub use food_repository::{FoodRepository, InMemoryFoodRepository};
pub use memory::{InMemoryCartRepository, InMemoryUserRepository};
pub use table_manager::TableManager;
pub use user_repository::{DynamoDbUserRepository, UserRepository, USER_ID_INDEX};
