//! Property-based tests for the order ledger
//!
//! These check the cart invariants across arbitrary command sequences.

use super::*;
use crate::session::{OrderStatus, OrderType};
use proptest::prelude::*;

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::fresh_burger())
}

fn base_state() -> SessionState {
    SessionState::new()
        .with_order_type(OrderType::ForHere)
        .with_order_status(OrderStatus::InProgress)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_catalog_item() -> impl Strategy<Value = String> {
    let names: Vec<String> = Catalog::fresh_burger()
        .items()
        .iter()
        .map(|item| item.name.clone())
        .collect();
    proptest::sample::select(names)
}

/// Catalog items plus a couple of names the menu does not carry
fn arb_any_item() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_catalog_item(),
        1 => Just("Milkshake".to_string()),
        1 => Just("Chicken Nuggets".to_string()),
    ]
}

fn arb_command() -> impl Strategy<Value = CartCommand> {
    (any::<bool>(), proptest::collection::vec(arb_any_item(), 0..4)).prop_map(|(add, items)| {
        if add {
            CartCommand::add(items)
        } else {
            CartCommand::remove(items)
        }
    })
}

fn arb_commands() -> impl Strategy<Value = Vec<CartCommand>> {
    proptest::collection::vec(arb_command(), 0..8)
}

fn render(commands: &[CartCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Adding then removing any catalog item restores the cart and total
    #[test]
    fn prop_add_then_remove_restores_state(
        setup in arb_commands(),
        item in arb_catalog_item(),
    ) {
        let ledger = Ledger::new(catalog());
        let mut state = base_state();
        ledger.apply_commands(&setup, &mut state);
        let before = state.clone();

        ledger.apply(&format!("add [{item}]"), &mut state).unwrap();
        ledger.apply(&format!("remove [{item}]"), &mut state).unwrap();

        prop_assert_eq!(state.order_total(), before.order_total());
        let mut after_items = state.current_order().to_vec();
        let mut before_items = before.current_order().to_vec();
        after_items.sort();
        before_items.sort();
        prop_assert_eq!(after_items, before_items);
    }

    /// Removing an item that is not in the cart changes nothing
    #[test]
    fn prop_remove_absent_is_noop(setup in arb_commands(), item in arb_any_item()) {
        let ledger = Ledger::new(catalog());
        let mut state = base_state();
        ledger.apply_commands(&setup, &mut state);
        prop_assume!(!state.current_order().contains(&item));
        let before = state.clone();

        let report = ledger.apply(&format!("remove [{item}]"), &mut state).unwrap();

        prop_assert_eq!(&state, &before);
        prop_assert_eq!(report.missing, vec![item]);
    }

    /// The running total always equals the priced sum of the cart
    #[test]
    fn prop_total_matches_cart(commands in arb_commands(), reject in any::<bool>()) {
        let policy = if reject { UnknownItemPolicy::Reject } else { UnknownItemPolicy::ZeroPrice };
        let ledger = Ledger::new(catalog()).with_unknown_item_policy(policy);
        let mut state = base_state();

        for command in &commands {
            ledger.apply_commands(std::slice::from_ref(command), &mut state);
            prop_assert_eq!(
                state.order_total(),
                priced_total(ledger.catalog(), state.current_order())
            );
        }
    }

    /// Rendered commands parse back to the same commands
    #[test]
    fn prop_rendered_update_parses(commands in arb_commands()) {
        let text = render(&commands);
        let parsed = parse(&text).unwrap();
        // Empty item lists render as `add []`, which parses to an empty list too
        prop_assert_eq!(parsed, commands);
    }

    /// Filler words and punctuation between blocks don't change the result
    #[test]
    fn prop_filler_between_blocks_is_ignored(
        commands in arb_commands(),
        filler in proptest::collection::vec("[a-zA-Z.!? ]{0,12}", 8),
    ) {
        let chatty = commands
            .iter()
            .zip(filler.iter().cycle())
            .map(|(command, words)| format!("{words} {command}"))
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(parse(&format!("{chatty}.")).unwrap(), commands);
    }

    /// Applying a rendered update equals applying the commands directly
    #[test]
    fn prop_text_and_commands_agree(commands in arb_commands()) {
        let ledger = Ledger::new(catalog());
        let mut via_text = base_state();
        let mut via_commands = base_state();

        ledger.apply(&render(&commands), &mut via_text).unwrap();
        ledger.apply_commands(&commands, &mut via_commands);

        prop_assert_eq!(via_text, via_commands);
    }

    /// Remove never lets a cart shrink below empty
    #[test]
    fn prop_removes_on_empty_cart(items in proptest::collection::vec(arb_any_item(), 0..6)) {
        let ledger = Ledger::new(catalog());
        let mut state = base_state();
        ledger.apply_commands(&[CartCommand::remove(items)], &mut state);
        prop_assert!(state.current_order().is_empty());
        prop_assert_eq!(state.order_total(), Price::ZERO);
    }
}
