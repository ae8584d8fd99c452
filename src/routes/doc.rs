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
        orders::{CreateOrderItem, CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
        products::{CreateProductRequest, UpdateProductRequest},
        users::{UpdateUserRequest, UserList},
    },
    models::{
        CategoryDto, DeliveryDto, OrderDto, OrderItemDto, OrderStatus, PaymentDto, ProductDto,
        ProductWithCategoriesDto, Role, UserDto,
    },
    response::{ApiResponse, PaginatedResult},
    routes::{auth, health, orders, params, products, users},
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
        users::list_users,
        users::get_current_user,
        users::update_current_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        orders::list_orders,
        orders::my_orders,
        orders::get_order,
        orders::orders_by_customer,
        orders::orders_by_partner,
        orders::orders_by_status,
        orders::create_order,
        orders::update_order_status,
        orders::delete_order,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            UserDto,
            OrderDto,
            OrderItemDto,
            DeliveryDto,
            PaymentDto,
            ProductDto,
            CategoryDto,
            ProductWithCategoriesDto,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateUserRequest,
            UserList,
            CreateOrderRequest,
            CreateOrderItem,
            UpdateOrderStatusRequest,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            params::Pagination,
            params::ProductQuery,
            params::ProductSortBy,
            params::SortOrder,
            ApiResponse<UserDto>,
            ApiResponse<OrderDto>,
            ApiResponse<OrderList>,
            ApiResponse<UserList>,
            ApiResponse<LoginResponse>,
            ApiResponse<ProductWithCategoriesDto>,
            ApiResponse<PaginatedResult<ProductWithCategoriesDto>>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User account endpoints"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
