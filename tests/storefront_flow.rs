use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use uuid::Uuid;

use axum_storefront_api::{
    dto::{
        cart::{AddCartItemRequest, UpdateCartItemRequest},
        catalog::UpdateProductRequest,
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
        reviews::SubmitReviewRequest,
    },
    entity::products::Entity as Products,
    error::AppError,
    middleware::auth::{AuthUser, Identity},
    models::Role,
    routes::admin::LowStockQuery,
    routes::params::{Pagination, ProductQuery},
    services::{admin_service, cart_service, catalog_service, order_service, review_service},
};

mod common;

fn query_for_category(category: Uuid) -> ProductQuery {
    ProductQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        q: None,
        category: Some(category),
        min_price: None,
        max_price: None,
        include_inactive: None,
        sort_by: None,
        sort_order: None,
    }
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        address: "1 Birch Street".into(),
        phone: Some("555-0101".into()),
        guest_name: None,
        guest_email: None,
    }
}

// Full storefront pass: browse -> cart -> merge -> checkout -> moderation
// and admin reporting, with the stock and price-snapshot invariants
// checked along the way.
#[tokio::test]
async fn storefront_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let customer_id = common::create_user(&state, "customer", "shopper@example.com").await?;
    let admin_id = common::create_user(&state, "admin", "admin@example.com").await?;

    let furniture = common::create_category(&state, "Furniture", "furniture", None).await?;
    let chairs = common::create_category(&state, "Chairs", "chairs", Some(furniture)).await?;
    let chair =
        common::create_product(&state, "Oak Chair", chairs, Decimal::new(12990, 2), 10).await?;

    let customer_user = AuthUser {
        user_id: customer_id,
        role: Role::Customer,
    };
    let customer = Identity::Authenticated(customer_user.clone());
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };

    // Filtering by the parent category finds products in child categories.
    let listed = catalog_service::list_products(&state, None, query_for_category(furniture))
        .await?
        .data
        .unwrap();
    assert!(listed.items.iter().any(|p| p.id == chair));

    // One unit in the account cart, two in an anonymous session, merged on login.
    cart_service::add_item(
        &state,
        &customer,
        AddCartItemRequest {
            product_id: chair,
            quantity: 1,
        },
    )
    .await?;
    let anon = Identity::Anonymous("session-abc".into());
    cart_service::add_item(
        &state,
        &anon,
        AddCartItemRequest {
            product_id: chair,
            quantity: 2,
        },
    )
    .await?;
    cart_service::merge_session_cart(&state, "session-abc", customer_id).await?;

    let cart = cart_service::view_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1, "merge must not duplicate lines");
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total, Decimal::new(38970, 2));

    // Asking for more than the shelf holds is refused and names the product.
    let err = cart_service::add_item(
        &state,
        &customer,
        AddCartItemRequest {
            product_id: chair,
            quantity: 8,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { product_id, .. } if product_id == chair));

    // Removal is idempotent, even for ids that never existed.
    cart_service::remove_item(&state, &customer, Uuid::new_v4()).await?;
    cart_service::remove_item(&state, &customer, Uuid::new_v4()).await?;

    // Checkout freezes prices and is the only place stock moves.
    let placed = order_service::checkout(&state, &customer, checkout_request())
        .await?
        .data
        .unwrap();
    assert_eq!(placed.order.total_amount, Decimal::new(38970, 2));
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].unit_price, Decimal::new(12990, 2));

    let product = Products::find_by_id(chair).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 7);

    let cart = cart_service::view_cart(&state, &customer).await?.data.unwrap();
    assert!(cart.items.is_empty(), "cart is consumed by checkout");

    let err = order_service::checkout(&state, &customer, checkout_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    // A later price change must not reach into the recorded order.
    catalog_service::update_product(
        &state,
        &admin,
        chair,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(Decimal::new(19990, 2)),
            category_id: None,
            stock: None,
            material: None,
            image: None,
            is_active: None,
        },
    )
    .await?;
    let fetched = order_service::get_order(&state, &customer_user, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.order.total_amount, Decimal::new(38970, 2));
    assert_eq!(fetched.items[0].unit_price, Decimal::new(12990, 2));

    // Customers cannot drive the lifecycle; staff follow it strictly.
    let err = admin_service::update_order_status(
        &state,
        &customer_user,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "processing".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "delivered".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "processing".into(),
        },
    )
    .await?;
    let cancelled = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "cancelled".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cancelled.status, "cancelled");

    let err = admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    // Setting a line to zero removes it.
    let anon2 = Identity::Anonymous("session-xyz".into());
    let line = cart_service::add_item(
        &state,
        &anon2,
        AddCartItemRequest {
            product_id: chair,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    cart_service::update_item(
        &state,
        &anon2,
        line.id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    let cart = cart_service::view_cart(&state, &anon2).await?.data.unwrap();
    assert!(cart.items.is_empty());

    // Guest checkout needs contact fields.
    let guest = Identity::Anonymous("guest-1".into());
    cart_service::add_item(
        &state,
        &guest,
        AddCartItemRequest {
            product_id: chair,
            quantity: 1,
        },
    )
    .await?;
    let err = order_service::checkout(
        &state,
        &guest,
        CheckoutRequest {
            address: "10 Pine Road".into(),
            phone: None,
            guest_name: None,
            guest_email: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let guest_order = order_service::checkout(
        &state,
        &guest,
        CheckoutRequest {
            address: "10 Pine Road".into(),
            phone: None,
            guest_name: Some("Sam Guest".into()),
            guest_email: Some("sam@example.com".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(guest_order.order.user_id.is_none());
    assert_eq!(guest_order.order.guest_email.as_deref(), Some("sam@example.com"));

    // Reviews are moderated before shoppers see them.
    let err = review_service::submit_review(
        &state,
        &customer_user,
        chair,
        SubmitReviewRequest {
            rating: 6,
            comment: "!".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidRating(6)));

    let review = review_service::submit_review(
        &state,
        &customer_user,
        chair,
        SubmitReviewRequest {
            rating: 5,
            comment: "Sturdy and comfortable".into(),
        },
    )
    .await?
    .data
    .unwrap();

    let visible = review_service::list_visible_reviews(&state, chair).await?.data.unwrap();
    assert!(visible.items.is_empty(), "unapproved reviews stay hidden");

    review_service::approve_review(&state, &admin, review.id).await?;
    let visible = review_service::list_visible_reviews(&state, chair).await?.data.unwrap();
    assert_eq!(visible.items.len(), 1);
    assert!(visible.items[0].is_approved);

    // Inventory report picks the chair up once stock dips under the threshold.
    let low = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(20),
            },
            threshold: Some(10),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(low.items.iter().any(|p| p.id == chair));

    Ok(())
}
