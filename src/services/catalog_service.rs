use std::sync::Arc;
use tracing::instrument;

use crate::models::{Food, FoodFilters, FoodListResponse, ServiceError, ServiceResult};
use crate::repositories::FoodRepository;

/// Read-only access to the food catalog
pub struct CatalogService {
    repository: Arc<dyn FoodRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn FoodRepository>) -> Self {
        Self { repository }
    }

    /// List all foods with optional filters
    #[instrument(skip(self), fields(filters = ?filters))]
    pub async fn list_foods(&self, filters: FoodFilters) -> ServiceResult<FoodListResponse> {
        let foods = self.repository.find_all(filters).await?;
        let total_count = foods.len();

        crate::info_with_trace!("Found {} foods matching criteria", total_count);
        Ok(FoodListResponse { foods, total_count })
    }

    /// Get a specific food by ID
    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_food(&self, id: &str) -> ServiceResult<Food> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ServiceError::ValidationError {
                message: "Food ID cannot be empty".to_string(),
            });
        }

        match self.repository.find_by_id(id).await? {
            Some(food) => Ok(food),
            None => {
                crate::warn_with_trace!("Food not found");
                Err(ServiceError::FoodNotFound {
                    food_id: id.to_string(),
                })
            }
        }
    }
}
