use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog entry a cart line can refer to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default, alias = "imageUrl", alias = "imageURL")]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Filters for browsing the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FoodFilters {
    pub category: Option<String>,
    pub search_term: Option<String>,
    pub available_only: Option<bool>,
}

/// Response model for catalog listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodListResponse {
    pub foods: Vec<Food>,
    pub total_count: usize,
}

impl Food {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            price,
            image_url: None,
            is_available: true,
        }
    }

    /// Check if the food matches the given filters
    pub fn matches_filters(&self, filters: &FoodFilters) -> bool {
        if let Some(category) = &filters.category {
            if !self.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }

        if let Some(search_term) = &filters.search_term {
            let search_lower = search_term.trim().to_lowercase();
            if !search_lower.is_empty()
                && !self.name.to_lowercase().contains(&search_lower)
                && !self.description.to_lowercase().contains(&search_lower)
            {
                return false;
            }
        }

        if let Some(true) = filters.available_only {
            if !self.is_available {
                return false;
            }
        }

        true
    }
}
