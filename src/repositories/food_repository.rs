use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::models::{Food, FoodFilters, RepositoryError, RepositoryResult};

/// Trait defining the interface for catalog lookups
#[async_trait]
pub trait FoodRepository: Send + Sync {
    /// Find all foods matching the filters, ordered by ID
    async fn find_all(&self, filters: FoodFilters) -> RepositoryResult<Vec<Food>>;

    /// Find a food by its ID
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Food>>;
}

// (id, name, category, price, description)
const DEFAULT_MENU: &[(&str, &str, &str, i64, &str)] = &[
    ("1", "Chicken Biryani", "Biryani", 299, "Basmati rice layered with spiced chicken"),
    ("2", "Mutton Biryani", "Biryani", 399, "Slow cooked mutton with saffron rice"),
    ("3", "Veg Biryani", "Biryani", 199, "Seasonal vegetables and whole spices"),
    ("4", "Classic Chicken Burger", "Burgers", 179, "Grilled chicken patty, lettuce and tomato"),
    ("5", "Veggie Burger", "Burgers", 149, "Vegetable patty with avocado"),
    ("6", "Cheese Burger", "Burgers", 199, "Beef patty with melted cheese and pickles"),
    ("7", "Margherita Pizza", "Pizzas", 249, "Tomato, mozzarella and basil"),
    ("8", "Pepperoni Pizza", "Pizzas", 299, "Pepperoni with mozzarella"),
    ("9", "Veggie Supreme Pizza", "Pizzas", 279, "Peppers, olives, onions and mushrooms"),
    ("10", "Butter Chicken", "Curries", 249, "Chicken in a creamy tomato gravy"),
    ("11", "Paneer Makhani", "Curries", 199, "Cottage cheese in butter masala"),
    ("12", "Fresh Lime Soda", "Drinks", 79, "Sweet or salted lime soda"),
    ("13", "Mango Lassi", "Drinks", 99, "Chilled yogurt and mango"),
    ("14", "Gulab Jamun", "Desserts", 89, "Milk dumplings in rose syrup"),
    ("15", "Chocolate Brownie", "Desserts", 119, "Warm brownie with fudge sauce"),
];

/// Read-only catalog held in memory. Loaded once at startup, either from a
/// JSON array of foods or from the built-in menu.
pub struct InMemoryFoodRepository {
    foods: HashMap<String, Food>,
}

impl InMemoryFoodRepository {
    /// Build a catalog from a list of foods. Duplicate IDs are rejected.
    pub fn new(foods: Vec<Food>) -> RepositoryResult<Self> {
        let mut by_id = HashMap::with_capacity(foods.len());
        for food in foods {
            if food.id.trim().is_empty() {
                return Err(RepositoryError::CatalogLoad {
                    message: format!("food '{}' has an empty id", food.name),
                });
            }
            if food.price < Decimal::ZERO {
                return Err(RepositoryError::CatalogLoad {
                    message: format!("food {} has a negative price", food.id),
                });
            }
            if let Some(previous) = by_id.insert(food.id.clone(), food) {
                return Err(RepositoryError::CatalogLoad {
                    message: format!("duplicate food id {}", previous.id),
                });
            }
        }
        Ok(Self { foods: by_id })
    }

    pub fn with_default_menu() -> Self {
        let foods = DEFAULT_MENU
            .iter()
            .map(|(id, name, category, price, description)| {
                (
                    id.to_string(),
                    Food::new(*id, *name, *category, Decimal::from(*price), *description),
                )
            })
            .collect();
        Self { foods }
    }

    /// Load the catalog from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RepositoryError::CatalogLoad {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
        let foods: Vec<Food> = serde_json::from_str(&raw)?;
        let repository = Self::new(foods)?;
        info!(path = %path.display(), count = repository.len(), "Loaded food catalog");
        Ok(repository)
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

/// Numeric IDs sort numerically, everything else lexically after them
fn id_order(a: &Food, b: &Food) -> std::cmp::Ordering {
    match (a.id.parse::<u64>(), b.id.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.id.cmp(&b.id),
    }
}

#[async_trait]
impl FoodRepository for InMemoryFoodRepository {
    async fn find_all(&self, filters: FoodFilters) -> RepositoryResult<Vec<Food>> {
        let mut foods: Vec<Food> = self
            .foods
            .values()
            .filter(|food| food.matches_filters(&filters))
            .cloned()
            .collect();
        foods.sort_by(id_order);
        Ok(foods)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Food>> {
        Ok(self.foods.get(id).cloned())
    }
}
