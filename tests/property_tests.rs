use std::sync::Arc;

use foodcart_rs::models::{
    validate_cart_quantity, validate_email, AddToCartRequest, Cart, RemoveFromCartRequest,
    Removal, MAX_CART_QUANTITY,
};
use foodcart_rs::repositories::{InMemoryCartRepository, InMemoryFoodRepository};
use foodcart_rs::services::CartService;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

const MENU_IDS: &[&str] = &["1", "2", "3", "7", "12", "15"];

fn cart_service() -> CartService {
    CartService::new(
        Arc::new(InMemoryCartRepository::new()),
        Arc::new(InMemoryFoodRepository::with_default_menu()),
    )
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

prop_compose! {
    fn arb_menu_id()(index in 0..MENU_IDS.len()) -> String {
        MENU_IDS[index].to_string()
    }
}

prop_compose! {
    fn arb_add()(food_id in arb_menu_id(), quantity in 1i64..=50) -> (String, i64) {
        (food_id, quantity)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_quantity_validation(quantity in any::<i64>()) {
        let result = validate_cart_quantity(quantity);

        if (1..=MAX_CART_QUANTITY).contains(&quantity) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn test_email_validation_rejects_missing_at(local in "[a-z0-9.]{1,20}") {
        prop_assert!(validate_email(&local).is_err());
        let with_domain = format!("{}@example.com", local.trim_matches('.'));
        if !local.trim_matches('.').is_empty() {
            prop_assert!(validate_email(&with_domain).is_ok());
        }
    }

    #[test]
    fn test_cart_model_sums_in_any_order(
        quantities in prop::collection::vec(1u32..100, 1..20),
        seed in any::<u64>(),
    ) {
        let mut forward = Cart::new("u".to_string());
        for q in &quantities {
            forward.add_item("1".to_string(), *q, Decimal::from(10));
        }

        let mut shuffled = quantities.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        let mut rotated = Cart::new("u".to_string());
        for q in &shuffled {
            rotated.add_item("1".to_string(), *q, Decimal::from(10));
        }

        let expected: u32 = quantities.iter().sum();
        prop_assert_eq!(forward.items.len(), 1);
        prop_assert_eq!(forward.get_item_quantity("1"), expected);
        prop_assert_eq!(rotated.get_item_quantity("1"), expected);
    }

    #[test]
    fn test_cart_model_remove_quantity(current in 1u32..1000, requested in 1u32..2000) {
        let mut cart = Cart::new("u".to_string());
        cart.add_item("1".to_string(), current, Decimal::from(10));

        let outcome = cart.remove_quantity("1", Some(requested));

        if requested >= current {
            prop_assert_eq!(outcome, Some(Removal::Removed));
            prop_assert!(!cart.contains_item("1"));
        } else {
            prop_assert_eq!(outcome, Some(Removal::Decremented { remaining: current - requested }));
            prop_assert_eq!(cart.get_item_quantity("1"), current - requested);
        }
        prop_assert!(cart.items.iter().all(|item| item.quantity > 0));
    }

    #[test]
    fn test_service_adds_accumulate(adds in prop::collection::vec(arb_add(), 1..15)) {
        let rt = runtime();
        let service = cart_service();

        let cart = rt.block_on(async {
            for (food_id, quantity) in &adds {
                service
                    .add_to_cart("u-1", AddToCartRequest { food_id: food_id.clone(), quantity: *quantity })
                    .await
                    .unwrap();
            }
            service.get_cart("u-1").await.unwrap()
        });

        for id in MENU_IDS {
            let expected: i64 = adds.iter().filter(|(f, _)| f == id).map(|(_, q)| q).sum();
            let actual = cart
                .items
                .iter()
                .find(|item| item.food_id == *id)
                .map(|item| i64::from(item.quantity))
                .unwrap_or(0);
            prop_assert_eq!(actual, expected);
        }
        let total: i64 = adds.iter().map(|(_, q)| q).sum();
        prop_assert_eq!(i64::from(cart.total_items), total);
    }

    #[test]
    fn test_service_clear_always_empties(adds in prop::collection::vec(arb_add(), 0..10)) {
        let rt = runtime();
        let service = cart_service();

        let cart = rt.block_on(async {
            for (food_id, quantity) in &adds {
                service
                    .add_to_cart("u-1", AddToCartRequest { food_id: food_id.clone(), quantity: *quantity })
                    .await
                    .unwrap();
            }
            service.clear_cart("u-1").await.unwrap();
            service.get_cart("u-1").await.unwrap()
        });

        prop_assert!(cart.items.is_empty());
        prop_assert_eq!(cart.total_items, 0);
    }

    #[test]
    fn test_service_remove_never_leaves_zero(current in 1i64..=100, requested in 1i64..=200) {
        let rt = runtime();
        let service = cart_service();

        let cart = rt.block_on(async {
            service
                .add_to_cart("u-1", AddToCartRequest { food_id: "7".to_string(), quantity: current })
                .await
                .unwrap();
            service
                .remove_from_cart("u-1", RemoveFromCartRequest { food_id: "7".to_string(), quantity: Some(requested) })
                .await
                .unwrap()
        });

        let remaining = cart.items.iter().find(|item| item.food_id == "7").map(|item| i64::from(item.quantity));
        if requested >= current {
            prop_assert_eq!(remaining, None);
        } else {
            prop_assert_eq!(remaining, Some(current - requested));
        }
    }
}
