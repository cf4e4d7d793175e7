use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

use crate::models::{
    AddToCartRequest, Cart, CartItem, CartItemResponse, CartResponse, Food, Removal,
    RemoveFromCartRequest, RepositoryError, ServiceError, ServiceResult, Validate,
};
use crate::repositories::{CartRepository, FoodRepository};
use crate::services::KeyedLocks;

const MAX_RETRY_DELAY: Duration = Duration::from_millis(250);

/// How often a cart write that lost to another writer is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRetryPolicy {
    /// Total tries, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl WriteRetryPolicy {
    /// Exponential backoff after the given failed attempt, capped
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

impl Default for WriteRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(10),
        }
    }
}

/// Service for managing shopping carts.
///
/// Mutations of one user's cart queue on that user's lock within this
/// process. Across processes sharing a store, each save is conditional on
/// the version the cart was read at; a save that loses re-reads and
/// reapplies the change.
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
    food_repository: Arc<dyn FoodRepository>,
    locks: KeyedLocks,
    retry: WriteRetryPolicy,
}

impl CartService {
    pub fn new(
        cart_repository: Arc<dyn CartRepository>,
        food_repository: Arc<dyn FoodRepository>,
    ) -> Self {
        Self {
            cart_repository,
            food_repository,
            locks: KeyedLocks::new(),
            retry: WriteRetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: WriteRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get a user's cart. A user without a cart gets an empty one; nothing
    /// is written.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &str) -> ServiceResult<CartResponse> {
        self.validate_user_id(user_id)?;

        let cart = self.load_cart(user_id).await?;
        let response = self.cart_to_response(cart).await?;

        crate::info_with_trace!("Cart retrieved with {} items", response.items.len());
        Ok(response)
    }

    /// Add a product to the cart, summing into an existing line
    #[instrument(skip(self, request), fields(user_id = %user_id, food_id = %request.food_id, quantity = request.quantity))]
    pub async fn add_to_cart(
        &self,
        user_id: &str,
        request: AddToCartRequest,
    ) -> ServiceResult<CartResponse> {
        self.validate_user_id(user_id)?;
        request.validate()?;

        let food_id = request.food_id.trim();
        let food = self
            .food_repository
            .find_by_id(food_id)
            .await?
            .ok_or_else(|| ServiceError::UnknownFood {
                food_id: food_id.to_string(),
            })?;

        if !food.is_available {
            return Err(ServiceError::ValidationError {
                message: format!("Food {} is not available", food.id),
            });
        }

        let quantity = u32::try_from(request.quantity).map_err(|_| {
            ServiceError::InvalidQuantity {
                quantity: request.quantity,
            }
        })?;

        let cart = self
            .update_cart(user_id, |cart| {
                if cart.get_item_quantity(&food.id).checked_add(quantity).is_none() {
                    return Err(ServiceError::InvalidQuantity {
                        quantity: request.quantity,
                    });
                }
                cart.add_item(food.id.clone(), quantity, food.price);
                Ok(true)
            })
            .await?;

        crate::info_with_trace!(
            line_quantity = cart.get_item_quantity(&food.id),
            "Item added to cart"
        );
        self.cart_to_response(cart).await
    }

    /// Take a quantity of a product out of the cart. Without a quantity, or
    /// with one at or above the line's quantity, the line is dropped.
    #[instrument(skip(self, request), fields(user_id = %user_id, food_id = %request.food_id, quantity = ?request.quantity))]
    pub async fn remove_from_cart(
        &self,
        user_id: &str,
        request: RemoveFromCartRequest,
    ) -> ServiceResult<CartResponse> {
        self.validate_user_id(user_id)?;
        request.validate()?;

        let food_id = request.food_id.trim();
        // Anything beyond u32 is at or above the line quantity anyway
        let quantity = request
            .quantity
            .map(|q| u32::try_from(q).unwrap_or(u32::MAX));

        // A missing cart loads as empty, so it reports the item as absent
        let mut outcome = Removal::Removed;
        let cart = self
            .update_cart(user_id, |cart| {
                outcome = cart.remove_quantity(food_id, quantity).ok_or_else(|| {
                    ServiceError::CartItemNotFound {
                        food_id: food_id.to_string(),
                        user_id: user_id.to_string(),
                    }
                })?;
                Ok(true)
            })
            .await?;

        match outcome {
            Removal::Removed => crate::info_with_trace!("Item removed from cart"),
            Removal::Decremented { remaining } => {
                crate::info_with_trace!(remaining, "Item quantity decremented")
            }
        }
        self.cart_to_response(cart).await
    }

    /// Empty the cart. Clearing a missing or empty cart succeeds.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &str) -> ServiceResult<()> {
        self.validate_user_id(user_id)?;

        let mut cleared = false;
        self.update_cart(user_id, |cart| {
            cleared = !cart.is_empty();
            if cleared {
                cart.clear();
            }
            Ok(cleared)
        })
        .await?;

        if cleared {
            crate::info_with_trace!("Cart cleared");
        } else {
            crate::info_with_trace!("Cart already empty, nothing written");
        }
        Ok(())
    }

    /// Apply `change` to the stored cart (an empty one when there is none)
    /// and save it when `change` returns true. A save rejected because
    /// another writer got there first is retried from a fresh read.
    async fn update_cart<F>(&self, user_id: &str, mut change: F) -> ServiceResult<Cart>
    where
        F: FnMut(&mut Cart) -> ServiceResult<bool> + Send,
    {
        let _guard = self.locks.lock(user_id).await;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let mut cart = self.load_cart(user_id).await?;
            if !change(&mut cart)? {
                return Ok(cart);
            }

            match self.cart_repository.save_cart(cart).await {
                Ok(saved) => return Ok(saved),
                Err(RepositoryError::VersionConflict { .. })
                    if attempts < self.retry.max_attempts =>
                {
                    let delay = self.retry.delay_after(attempts);
                    crate::warn_with_trace!(
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Cart changed by another writer, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if matches!(e, RepositoryError::VersionConflict { .. }) {
                        warn!(attempts, "Giving up on contended cart write");
                    }
                    return Err(e.into());
                }
            }
        }
    }

    async fn load_cart(&self, user_id: &str) -> ServiceResult<Cart> {
        Ok(self
            .cart_repository
            .find_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id.to_string())))
    }

    /// Convert a Cart to a CartResponse enriched with catalog details
    pub async fn cart_to_response(&self, cart: Cart) -> ServiceResult<CartResponse> {
        let mut items = Vec::with_capacity(cart.items.len());

        for cart_item in &cart.items {
            let item_response = match self.food_repository.find_by_id(&cart_item.food_id).await? {
                Some(food) => cart_item_to_response(cart_item, Some(&food)),
                None => {
                    warn!("Food not found for cart item: {}", cart_item.food_id);
                    cart_item_to_response(cart_item, None)
                }
            };
            items.push(item_response);
        }

        Ok(CartResponse {
            total_items: cart.total_items(),
            total_amount: cart.total_amount(),
            user_id: cart.user_id,
            items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    fn validate_user_id(&self, user_id: &str) -> ServiceResult<()> {
        if user_id.trim().is_empty() {
            return Err(ServiceError::ValidationError {
                message: "User ID cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn cart_item_to_response(cart_item: &CartItem, food: Option<&Food>) -> CartItemResponse {
    CartItemResponse {
        food_id: cart_item.food_id.clone(),
        name: food
            .map(|f| f.name.clone())
            .unwrap_or_else(|| "Product not found".to_string()),
        image_url: food.and_then(|f| f.image_url.clone()),
        quantity: cart_item.quantity,
        unit_price: cart_item.unit_price,
        total_price: cart_item.total_price(),
        is_available: food.map(|f| f.is_available).unwrap_or(false),
        added_at: cart_item.added_at,
    }
}
