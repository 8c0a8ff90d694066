use rust_decimal::Decimal;
use sea_orm::EntityTrait;

use axum_storefront_api::{
    dto::{cart::AddCartItemRequest, orders::CheckoutRequest},
    entity::products::Entity as Products,
    error::AppError,
    middleware::auth::Identity,
    services::{cart_service, order_service},
};

mod common;

fn guest_checkout(name: &str, email: &str) -> CheckoutRequest {
    CheckoutRequest {
        address: "2 Elm Court".into(),
        phone: None,
        guest_name: Some(name.into()),
        guest_email: Some(email.into()),
    }
}

// Two buyers race for the last unit; the product row lock inside checkout
// must let exactly one of them have it.
#[tokio::test]
async fn concurrent_checkout_sells_last_unit_once() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let lamps = common::create_category(&state, "Lamps", "lamps", None).await?;
    let lamp = common::create_product(&state, "Brass Lamp", lamps, Decimal::new(4990, 2), 1).await?;

    let buyer_a = Identity::Anonymous("session-a".into());
    let buyer_b = Identity::Anonymous("session-b".into());

    cart_service::add_item(
        &state,
        &buyer_a,
        AddCartItemRequest {
            product_id: lamp,
            quantity: 1,
        },
    )
    .await?;
    cart_service::add_item(
        &state,
        &buyer_b,
        AddCartItemRequest {
            product_id: lamp,
            quantity: 1,
        },
    )
    .await?;

    let (res_a, res_b) = tokio::join!(
        order_service::checkout(&state, &buyer_a, guest_checkout("Ann", "ann@example.com")),
        order_service::checkout(&state, &buyer_b, guest_checkout("Ben", "ben@example.com")),
    );

    let wins = [res_a.is_ok(), res_b.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(wins, 1, "exactly one checkout should win the last unit");

    let loss = if res_a.is_err() {
        res_a.err()
    } else {
        res_b.err()
    };
    assert!(matches!(
        loss,
        Some(AppError::InsufficientStock { product_id, .. }) if product_id == lamp
    ));

    let product = Products::find_by_id(lamp).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 0, "stock never goes negative");

    Ok(())
}
