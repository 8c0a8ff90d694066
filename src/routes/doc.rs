use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddCartItemRequest, CartLine, CartView, UpdateCartItemRequest},
        catalog::{
            CategoryList, CreateCategoryRequest, CreateProductRequest, ProductFeed,
            ProductFeedItem, ProductList, UpdateCategoryRequest, UpdateProductRequest,
        },
        orders::{CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        reviews::{ReviewList, SubmitReviewRequest},
    },
    models::{Category, Order, OrderItem, Product, Review, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, categories, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::product_feed,
        products::get_product,
        products::create_product,
        products::update_product,
        products::deactivate_product,
        products::list_reviews,
        products::submit_review,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        cart::view_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_pending_reviews,
        admin::approve_review
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderItem,
            Review,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductFeed,
            ProductFeedItem,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            AddCartItemRequest,
            UpdateCartItemRequest,
            CartLine,
            CartView,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            SubmitReviewRequest,
            ReviewList,
            admin::LowStockQuery,
            admin::InventoryAdjustRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReviewList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog product endpoints"),
        (name = "Categories", description = "Catalog category endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Admin", description = "Admin and reporting endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
