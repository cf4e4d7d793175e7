use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shopping cart for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Write counter bumped by the store on every save; 0 until first stored
    #[serde(default)]
    pub version: u64,
}

/// Individual item in a shopping cart. `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub food_id: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub added_at: DateTime<Utc>,
}

fn default_add_quantity() -> i64 {
    1
}

/// Request model for adding an item to the cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    #[serde(alias = "foodId")]
    pub food_id: String,
    #[serde(default = "default_add_quantity")]
    pub quantity: i64,
}

/// Request model for removing (or decrementing) an item in the cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveFromCartRequest {
    #[serde(alias = "foodId")]
    pub food_id: String,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Response model for cart operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartResponse {
    pub user_id: String,
    pub items: Vec<CartItemResponse>,
    pub total_items: u32,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart item enriched with catalog details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemResponse {
    pub food_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub is_available: bool,
    pub added_at: DateTime<Utc>,
}

/// What happened to a line when a quantity was taken out of the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Decremented { remaining: u32 },
}

impl Cart {
    /// Create a new empty cart for a user
    pub fn new(user_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Add an item to the cart or sum into the existing line for that food
    pub fn add_item(&mut self, food_id: String, quantity: u32, unit_price: Decimal) {
        if quantity == 0 {
            return;
        }
        if let Some(existing_item) = self.items.iter_mut().find(|item| item.food_id == food_id) {
            existing_item.quantity = existing_item.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem::new(food_id, quantity, unit_price));
        }
        self.updated_at = Utc::now();
    }

    /// Take `quantity` units of a food out of the cart. `None` (or anything
    /// at or above the current quantity) drops the whole line.
    ///
    /// Returns `None` when the food is not in the cart.
    pub fn remove_quantity(&mut self, food_id: &str, quantity: Option<u32>) -> Option<Removal> {
        let position = self.items.iter().position(|item| item.food_id == food_id)?;
        let current = self.items[position].quantity;

        let outcome = match quantity {
            Some(requested) if requested < current => {
                let remaining = current - requested;
                self.items[position].quantity = remaining;
                Removal::Decremented { remaining }
            }
            _ => {
                self.items.remove(position);
                Removal::Removed
            }
        };

        self.updated_at = Utc::now();
        Some(outcome)
    }

    /// Remove an item from the cart
    pub fn remove_item(&mut self, food_id: &str) -> bool {
        self.remove_quantity(food_id, None).is_some()
    }

    /// Clear all items from the cart
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    /// Get the total number of units in the cart
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Get the total price of all items in the cart
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(CartItem::total_price).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_item(&self, food_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.food_id == food_id)
    }

    pub fn contains_item(&self, food_id: &str) -> bool {
        self.get_item(food_id).is_some()
    }

    /// Quantity of a food in the cart, 0 if absent
    pub fn get_item_quantity(&self, food_id: &str) -> u32 {
        self.get_item(food_id).map(|item| item.quantity).unwrap_or(0)
    }
}

impl CartItem {
    pub fn new(food_id: String, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            food_id,
            quantity,
            unit_price,
            added_at: Utc::now(),
        }
    }

    /// unit_price * quantity
    pub fn total_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cart_creation() {
        let cart = Cart::new("user123".to_string());

        assert_eq!(cart.user_id, "user123");
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_amount(), dec!(0));
    }

    #[test]
    fn test_add_existing_item_sums_quantity() {
        let mut cart = Cart::new("user123".to_string());

        cart.add_item("1".to_string(), 2, dec!(299));
        cart.add_item("1".to_string(), 3, dec!(299));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.get_item_quantity("1"), 5);
        assert_eq!(cart.total_amount(), dec!(1495));
    }

    #[test]
    fn test_add_zero_quantity_is_ignored() {
        let mut cart = Cart::new("user123".to_string());
        cart.add_item("1".to_string(), 0, dec!(299));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_quantity_decrements() {
        let mut cart = Cart::new("user123".to_string());
        cart.add_item("1".to_string(), 5, dec!(299));

        let outcome = cart.remove_quantity("1", Some(2));
        assert_eq!(outcome, Some(Removal::Decremented { remaining: 3 }));
        assert_eq!(cart.get_item_quantity("1"), 3);
    }

    #[test]
    fn test_remove_quantity_at_or_above_current_drops_line() {
        let mut cart = Cart::new("user123".to_string());
        cart.add_item("1".to_string(), 5, dec!(299));
        cart.add_item("2".to_string(), 1, dec!(399));

        assert_eq!(cart.remove_quantity("1", Some(5)), Some(Removal::Removed));
        assert!(!cart.contains_item("1"));

        assert_eq!(cart.remove_quantity("2", Some(10)), Some(Removal::Removed));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_without_quantity_drops_line() {
        let mut cart = Cart::new("user123".to_string());
        cart.add_item("1".to_string(), 4, dec!(299));

        assert!(cart.remove_item("1"));
        assert!(cart.is_empty());
        assert!(!cart.remove_item("1"));
    }

    #[test]
    fn test_remove_missing_item() {
        let mut cart = Cart::new("user123".to_string());
        assert_eq!(cart.remove_quantity("404", Some(1)), None);
    }

    #[test]
    fn test_clear_cart() {
        let mut cart = Cart::new("user123".to_string());
        cart.add_item("1".to_string(), 2, dec!(299));
        cart.add_item("4".to_string(), 1, dec!(179));

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total_amount(), dec!(0));
    }

    #[test]
    fn test_add_request_accepts_camel_case_and_default_quantity() {
        let request: AddToCartRequest = serde_json::from_str(r#"{"foodId": "7"}"#).unwrap();
        assert_eq!(request.food_id, "7");
        assert_eq!(request.quantity, 1);

        let request: AddToCartRequest =
            serde_json::from_str(r#"{"food_id": "7", "quantity": 3}"#).unwrap();
        assert_eq!(request.quantity, 3);
    }

    #[test]
    fn test_remove_request_quantity_is_optional() {
        let request: RemoveFromCartRequest = serde_json::from_str(r#"{"foodId": "7"}"#).unwrap();
        assert_eq!(request.quantity, None);
    }
}
