use axum_storefront_api::models::{OrderStatus, Role};

#[test]
fn forward_transitions_are_allowed() {
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
    assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
    assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
}

#[test]
fn skipping_ahead_is_rejected() {
    assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Delivered));
}

#[test]
fn cancellation_only_before_shipping() {
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn terminal_states_allow_nothing() {
    for next in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        assert!(!OrderStatus::Delivered.can_transition_to(next));
        assert!(!OrderStatus::Cancelled.can_transition_to(next));
    }
}

#[test]
fn no_backward_moves() {
    assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
}

#[test]
fn status_round_trips_through_strings() {
    for status in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
    }
    assert!(OrderStatus::parse("paid").is_err());
}

#[test]
fn staff_roles() {
    assert!(!Role::Customer.is_staff());
    assert!(Role::Moderator.is_staff());
    assert!(Role::Admin.is_staff());
    assert!(Role::parse("nobody").is_err());
    assert_eq!(Role::parse("moderator").unwrap(), Role::Moderator);
}
