use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddCartItemRequest, CartLine, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as ItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::Identity,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn identity_condition(identity: &Identity) -> Condition {
    match identity {
        Identity::Authenticated(user) => Condition::all().add(CartCol::UserId.eq(user.user_id)),
        Identity::Anonymous(token) => {
            Condition::all().add(CartCol::SessionToken.eq(token.clone()))
        }
    }
}

/// Lock the identity's cart row FOR UPDATE. All cart mutations go through
/// this so concurrent adds/removes from multiple tabs serialize per cart.
async fn lock_cart(
    txn: &DatabaseTransaction,
    identity: &Identity,
) -> AppResult<Option<CartModel>> {
    let cart = Carts::find()
        .filter(identity_condition(identity))
        .lock(LockType::Update)
        .one(txn)
        .await?;
    Ok(cart)
}

async fn lock_or_create_cart(
    txn: &DatabaseTransaction,
    identity: &Identity,
) -> AppResult<CartModel> {
    if let Some(cart) = lock_cart(txn, identity).await? {
        return Ok(cart);
    }

    let (user_id, session_token) = match identity {
        Identity::Authenticated(user) => (Some(user.user_id), None),
        Identity::Anonymous(token) => (None, Some(token.clone())),
    };

    // A concurrent first-add can race here; the partial unique indexes on
    // carts(user_id) / carts(session_token) reject the loser.
    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        session_token: Set(session_token),
        created_at: NotSet,
    }
    .insert(txn)
    .await?;

    Ok(cart)
}

pub async fn view_cart(state: &AppState, identity: &Identity) -> AppResult<ApiResponse<CartView>> {
    let cart = Carts::find()
        .filter(identity_condition(identity))
        .one(&state.orm)
        .await?;

    let Some(cart) = cart else {
        let empty = CartView {
            items: vec![],
            total: Decimal::ZERO,
        };
        return Ok(ApiResponse::success("OK", empty, Some(Meta::empty())));
    };

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    for item in items {
        let Some(product) = products.get(&item.product_id) else {
            continue;
        };
        // Line totals use the live catalog price until checkout snapshots it.
        let line_total = product.price * Decimal::from(item.quantity);
        total += line_total;
        lines.push(CartLine {
            id: item.id,
            product: product_from_entity(product.clone()),
            quantity: item.quantity,
            line_total,
        });
    }

    Ok(ApiResponse::success(
        "OK",
        CartView {
            items: lines,
            total,
        },
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    state: &AppState,
    identity: &Identity,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let cart = lock_or_create_cart(&txn, identity).await?;

    let product = Products::find_by_id(payload.product_id).one(&txn).await?;
    let product = match product {
        Some(p) if p.is_active => p,
        _ => return Err(AppError::NotFound),
    };

    let existing = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .filter(ItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    let new_quantity = existing
        .as_ref()
        .map_or(payload.quantity, |item| item.quantity + payload.quantity);

    // Stock is not reserved at cart time; this check only keeps carts honest
    // against the current catalog. Checkout re-validates under a row lock.
    if new_quantity > product.stock {
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            name: product.name,
        });
    }

    let item = match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(new_quantity);
            active.update(&txn).await?
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(new_quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        identity.user().map(|user| user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": item.product_id, "quantity": item.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let line_total = product.price * Decimal::from(item.quantity);
    let line = CartLine {
        id: item.id,
        quantity: item.quantity,
        line_total,
        product: product_from_entity(product),
    };

    Ok(ApiResponse::success("Added to cart", line, None))
}

pub async fn update_item(
    state: &AppState,
    identity: &Identity,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let cart = lock_cart(&txn, identity).await?;
    let Some(cart) = cart else {
        // No cart means nothing to remove; a positive target has no item.
        if payload.quantity <= 0 {
            return Ok(ApiResponse::success(
                "Removed from cart",
                serde_json::json!({}),
                Some(Meta::empty()),
            ));
        }
        return Err(AppError::NotFound);
    };

    let item = CartItems::find_by_id(item_id)
        .filter(ItemCol::CartId.eq(cart.id))
        .one(&txn)
        .await?;

    if payload.quantity <= 0 {
        if let Some(item) = item {
            CartItems::delete_by_id(item.id).exec(&txn).await?;
        }
        txn.commit().await?;
        return Ok(ApiResponse::success(
            "Removed from cart",
            serde_json::json!({}),
            Some(Meta::empty()),
        ));
    }

    let item = item.ok_or(AppError::NotFound)?;

    let product = Products::find_by_id(item.product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if payload.quantity > product.stock {
        return Err(AppError::InsufficientStock {
            product_id: product.id,
            name: product.name,
        });
    }

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        identity.user().map(|user| user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": item.product_id, "quantity": item.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Quantity updated",
        serde_json::json!({ "quantity": item.quantity }),
        Some(Meta::empty()),
    ))
}

/// Idempotent: removing an item that is already gone succeeds.
pub async fn remove_item(
    state: &AppState,
    identity: &Identity,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    if let Some(cart) = lock_cart(&txn, identity).await? {
        CartItems::delete_many()
            .filter(ItemCol::Id.eq(item_id))
            .filter(ItemCol::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        identity.user().map(|user| user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Fold an anonymous session's cart into the account's cart after login:
/// quantities are summed for overlapping products, remaining lines move
/// over, and the anonymous cart is deleted. The whole merge is one
/// transaction with both cart rows locked, so concurrent adds on either
/// side cannot be lost.
pub async fn merge_session_cart(
    state: &AppState,
    session_token: &str,
    user_id: Uuid,
) -> AppResult<()> {
    let txn = state.orm.begin().await?;

    // Lock in id order to keep lock acquisition deterministic.
    let carts = Carts::find()
        .filter(
            Condition::any()
                .add(CartCol::UserId.eq(user_id))
                .add(CartCol::SessionToken.eq(session_token)),
        )
        .order_by_asc(CartCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    let Some(anon) = carts
        .iter()
        .find(|cart| cart.session_token.as_deref() == Some(session_token))
        .cloned()
    else {
        return Ok(());
    };

    let user_cart = carts.into_iter().find(|cart| cart.user_id == Some(user_id));

    match user_cart {
        None => {
            // No account cart yet; hand the whole anonymous cart over.
            let mut active: CartActive = anon.into();
            active.user_id = Set(Some(user_id));
            active.session_token = Set(None);
            active.update(&txn).await?;
        }
        Some(user_cart) => {
            let anon_items = CartItems::find()
                .filter(ItemCol::CartId.eq(anon.id))
                .all(&txn)
                .await?;
            let user_items: HashMap<Uuid, _> = CartItems::find()
                .filter(ItemCol::CartId.eq(user_cart.id))
                .all(&txn)
                .await?
                .into_iter()
                .map(|item| (item.product_id, item))
                .collect();

            for item in anon_items {
                match user_items.get(&item.product_id) {
                    Some(user_item) => {
                        let merged = user_item.quantity + item.quantity;
                        let mut active: CartItemActive = user_item.clone().into();
                        active.quantity = Set(merged);
                        active.update(&txn).await?;
                        CartItems::delete_by_id(item.id).exec(&txn).await?;
                    }
                    None => {
                        let mut active: CartItemActive = item.into();
                        active.cart_id = Set(user_cart.id);
                        active.update(&txn).await?;
                    }
                }
            }

            Carts::delete_by_id(anon.id).exec(&txn).await?;
        }
    }

    txn.commit().await?;

    tracing::debug!(user_id = %user_id, "merged anonymous cart");
    Ok(())
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        category_id: model.category_id,
        stock: model.stock,
        material: model.material,
        image: model.image,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
