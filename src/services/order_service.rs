use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as ItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, Identity},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Convert the caller's cart into an order. Everything happens in one
/// transaction: stock re-validation under product row locks, price
/// snapshotting, stock decrement, order + item creation, cart deletion.
/// Any failure rolls the whole thing back.
pub async fn checkout(
    state: &AppState,
    identity: &Identity,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let (user_id, guest_name, guest_email) = match identity {
        Identity::Authenticated(user) => (Some(user.user_id), None, None),
        Identity::Anonymous(_) => {
            let name = payload
                .guest_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest("guest_name is required for guest checkout".into())
                })?;
            let email = payload
                .guest_email
                .clone()
                .filter(|email| !email.trim().is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest("guest_email is required for guest checkout".into())
                })?;
            (None, Some(name), Some(email))
        }
    };

    if payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("address is required".into()));
    }

    let txn = state.orm.begin().await?;

    let cart_condition = match identity {
        Identity::Authenticated(user) => Condition::all().add(CartCol::UserId.eq(user.user_id)),
        Identity::Anonymous(token) => {
            Condition::all().add(CartCol::SessionToken.eq(token.clone()))
        }
    };
    let cart = Carts::find()
        .filter(cart_condition)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::EmptyCart)?;

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(&txn)
        .await?;
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    // The serializing guard for concurrent checkouts: product rows are
    // locked FOR UPDATE (in id order) before the stock check, so two
    // orders competing for the same stock execute one after the other.
    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut total_amount = Decimal::ZERO;
    for item in &items {
        let product = products
            .get(&item.product_id)
            .filter(|product| product.is_active)
            .ok_or(AppError::NotFound)?;
        if item.quantity > product.stock {
            return Err(AppError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
            });
        }
        total_amount += product.price * Decimal::from(item.quantity);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        guest_name: Set(guest_name),
        guest_email: Set(guest_email),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total_amount: Set(total_amount),
        address: Set(payload.address),
        phone: Set(payload.phone),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(items.len());
    for item in &items {
        let product = &products[&item.product_id];

        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(item.quantity),
            // Price snapshot: the order keeps this value even if the
            // catalog price changes later.
            unit_price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_from_entity(inserted));

        // The only place stock is consumed.
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(&txn)
            .await?;
    }

    // The cart is consumed by the order.
    CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    Carts::delete_by_id(cart.id).exec(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        user_id,
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|status| !status.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(order) => order,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        guest_name: model.guest_name,
        guest_email: model.guest_email,
        status: model.status,
        total_amount: model.total_amount,
        address: model.address,
        phone: model.phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
