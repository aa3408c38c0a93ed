//! Property-based tests for routing
//!
//! Routing must be total and idempotent over every combination of state
//! fields, including ones the status machine never reaches.

use super::*;
use crate::catalog::Price;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_order_type() -> impl Strategy<Value = OrderType> {
    prop_oneof![
        Just(OrderType::Unknown),
        Just(OrderType::ToGo),
        Just(OrderType::ForHere),
    ]
}

fn arb_order_status() -> impl Strategy<Value = OrderStatus> {
    proptest::sample::select(OrderStatus::ALL.to_vec())
}

fn arb_name() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("  ".to_string())),
        "[A-Za-z]{1,12}".prop_map(Some),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        arb_order_type(),
        arb_order_status(),
        proptest::collection::vec("[A-Za-z ]{1,16}", 0..4),
        0u64..10_000,
        arb_name(),
    )
        .prop_map(|(order_type, order_status, items, cents, name)| {
            let mut state = SessionState::new()
                .with_order_type(order_type)
                .with_order_status(order_status);
            state.current_order = items;
            state.order_total = Price::from_cents(cents);
            state.name_for_order = name;
            state
        })
}

fn known_handlers() -> [HandlerName; 4] {
    [
        HandlerName::TYPE_SELECTION,
        HandlerName::ITEM_SELECTION,
        HandlerName::CONFIRMATION,
        HandlerName::IDENTITY_COLLECTION,
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Every state routes to one of the four handlers or to terminal
    #[test]
    fn prop_route_is_total(state in arb_state()) {
        match route(&state) {
            Route::Terminal => {}
            Route::Handler(name) => prop_assert!(known_handlers().contains(&name)),
        }
    }

    /// Routing an unchanged state twice gives the same answer
    #[test]
    fn prop_route_is_idempotent(state in arb_state()) {
        let first = route(&state);
        let snapshot = state.clone();
        let second = route(&state);
        prop_assert_eq!(&state, &snapshot);
        prop_assert_eq!(first, second);
    }

    /// The cart never influences routing
    #[test]
    fn prop_cart_is_irrelevant(state in arb_state()) {
        let mut emptied = state.clone();
        emptied.current_order.clear();
        emptied.order_total = Price::ZERO;
        prop_assert_eq!(route(&state), route(&emptied));
    }

    /// Terminal is reached only with a known type, CONFIRMED status and a name
    #[test]
    fn prop_terminal_requires_confirmed_name(state in arb_state()) {
        if route(&state).is_terminal() {
            prop_assert!(state.order_type().is_known());
            prop_assert_eq!(state.order_status(), OrderStatus::Confirmed);
            prop_assert!(state.name_for_order().is_some());
        }
    }

    /// The trait implementation agrees with the free function
    #[test]
    fn prop_order_router_matches_route(state in arb_state()) {
        prop_assert_eq!(OrderRouter.route(&state), route(&state));
    }
}
