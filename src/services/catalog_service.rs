use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::catalog::{
        CategoryList, CreateCategoryRequest, CreateProductRequest, ProductFeed, ProductFeedItem,
        ProductList, UpdateCategoryRequest, UpdateProductRequest,
    },
    entity::categories::{
        ActiveModel as CategoryActive, Column as CatCol, Entity as Categories,
        Model as CategoryModel,
    },
    entity::products::{
        ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Ids of `root` and every category below it. Walks the in-memory tree
/// breadth-first; the visited set keeps a corrupted parent chain from
/// looping forever.
pub fn descendant_category_ids(categories: &[CategoryModel], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in categories {
        if let Some(parent_id) = category.parent_id {
            children.entry(parent_id).or_default().push(category.id);
        }
    }

    let mut visited = HashSet::new();
    let mut queue = vec![root];
    let mut result = Vec::new();
    while let Some(id) = queue.pop() {
        if !visited.insert(id) {
            continue;
        }
        result.push(id);
        if let Some(kids) = children.get(&id) {
            queue.extend(kids.iter().copied());
        }
    }
    result
}

/// True when attaching `category_id` under `new_parent` would close a loop,
/// i.e. the new parent is the category itself or one of its descendants.
pub fn would_create_cycle(
    categories: &[CategoryModel],
    category_id: Uuid,
    new_parent: Uuid,
) -> bool {
    descendant_category_ids(categories, category_id).contains(&new_parent)
}

pub async fn list_products(
    state: &AppState,
    viewer: Option<&AuthUser>,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let is_staff = viewer.is_some_and(|user| user.role.is_staff());

    let mut condition = Condition::all();

    if !(is_staff && query.include_inactive.unwrap_or(false)) {
        condition = condition.add(ProdCol::IsActive.eq(true));
    }

    if let Some(category_id) = query.category {
        let categories = Categories::find().all(&state.orm).await?;
        let ids = descendant_category_ids(&categories, category_id);
        condition = condition.add(ProdCol::CategoryId.is_in(ids));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProdCol::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProdCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProdCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Name => ProdCol::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let is_staff = viewer.is_some_and(|user| user.role.is_staff());
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) if p.is_active || is_staff => p,
        // Inactive products are indistinguishable from missing ones for
        // unprivileged viewers.
        _ => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product),
        None,
    ))
}

/// Read-only JSON projection of active products for external consumers.
pub async fn product_feed(state: &AppState) -> AppResult<ApiResponse<ProductFeed>> {
    let items = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|product| ProductFeedItem {
            id: product.id,
            name: product.name,
            price: product.price,
            image: product.image,
        })
        .collect();

    Ok(ApiResponse::success(
        "Feed",
        ProductFeed { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;

    if payload.price < Decimal::ZERO {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }

    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?;
    if category.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        category_id: Set(payload.category_id),
        stock: Set(payload.stock),
        material: Set(payload.material),
        image: Set(payload.image),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(price) = payload.price {
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".into()));
        }
    }
    if let Some(category_id) = payload.category_id {
        let category = Categories::find_by_id(category_id).one(&state.orm).await?;
        if category.is_none() {
            return Err(AppError::BadRequest("category not found".into()));
        }
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(material) = payload.material {
        active.material = Set(Some(material));
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Products are deactivated, never deleted; orders keep their history.
pub async fn deactivate_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ProductActive = existing.into();
    active.is_active = Set(false);
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_deactivate",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deactivated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = Categories::find()
        .order_by_asc(CatCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;

    let slug_taken = Categories::find()
        .filter(CatCol::Slug.eq(payload.slug.clone()))
        .one(&state.orm)
        .await?
        .is_some();
    if slug_taken {
        return Err(AppError::BadRequest("slug already in use".into()));
    }

    if let Some(parent_id) = payload.parent_id {
        let parent = Categories::find_by_id(parent_id).one(&state.orm).await?;
        if parent.is_none() {
            return Err(AppError::BadRequest("parent category not found".into()));
        }
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        parent_id: Set(payload.parent_id),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_staff(user)?;

    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    if let Some(slug) = payload.slug.as_ref() {
        let clash = Categories::find()
            .filter(CatCol::Slug.eq(slug.clone()))
            .filter(CatCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if clash.is_some() {
            return Err(AppError::BadRequest("slug already in use".into()));
        }
    }

    let clear_parent = payload.clear_parent.unwrap_or(false);
    if let Some(parent_id) = payload.parent_id.filter(|_| !clear_parent) {
        let categories = Categories::find().all(&state.orm).await?;
        if categories.iter().all(|c| c.id != parent_id) {
            return Err(AppError::BadRequest("parent category not found".into()));
        }
        if would_create_cycle(&categories, id, parent_id) {
            return Err(AppError::BadRequest(
                "parent would create a category cycle".into(),
            ));
        }
    }

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if clear_parent {
        active.parent_id = Set(None);
    } else if let Some(parent_id) = payload.parent_id {
        active.parent_id = Set(Some(parent_id));
    }

    let category = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_update",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Deleting a category re-parents its children to the root (NULL) first —
/// an explicit policy, not a storage-level cascade. Categories that still
/// have products cannot be deleted.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    let existing = Categories::find_by_id(id).one(&txn).await?;
    if existing.is_none() {
        return Err(AppError::NotFound);
    }

    let product_count = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&txn)
        .await?;
    if product_count > 0 {
        return Err(AppError::BadRequest(
            "category still has products; reassign them first".into(),
        ));
    }

    Categories::update_many()
        .col_expr(CatCol::ParentId, Expr::value(Option::<Uuid>::None))
        .filter(CatCol::ParentId.eq(id))
        .exec(&txn)
        .await?;

    Categories::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
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

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
    }
}
