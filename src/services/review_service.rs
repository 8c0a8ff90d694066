use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::reviews::{ReviewList, SubmitReviewRequest},
    entity::{
        products::{Column as ProdCol, Entity as Products},
        reviews::{
            ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::InvalidRating(payload.rating));
    }

    let product = Products::find_by_id(product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(&state.orm)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    // Reviews start unapproved and stay invisible to shoppers until a
    // moderator signs off.
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        is_approved: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_submit",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id, "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review submitted",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

/// Approved reviews for shoppers, newest first.
pub async fn list_visible_reviews(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<ReviewList>> {
    let product = Products::find_by_id(product_id)
        .filter(ProdCol::IsActive.eq(true))
        .one(&state.orm)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let items = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::IsApproved.eq(true))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

/// Moderation queue, oldest first so the backlog drains in order.
pub async fn list_pending_reviews(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_staff(user)?;

    let items = Reviews::find()
        .filter(ReviewCol::IsApproved.eq(false))
        .order_by_asc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Pending reviews",
        ReviewList { items },
        Some(Meta::empty()),
    ))
}

pub async fn approve_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<Review>> {
    ensure_staff(user)?;

    let existing = Reviews::find_by_id(review_id).one(&state.orm).await?;
    let existing = match existing {
        Some(review) => review,
        None => return Err(AppError::NotFound),
    };

    let mut active: ReviewActive = existing.into();
    active.is_approved = Set(true);
    let review = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "review_approve",
        Some("reviews"),
        Some(serde_json::json!({ "review_id": review.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Review approved",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        rating: model.rating,
        comment: model.comment,
        is_approved: model.is_approved,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
