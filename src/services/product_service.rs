use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::{
    audit::log_audit,
    authz::Principal,
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        product_categories::{
            ActiveModel as ProductCategoryActive, Column as ProductCategoryCol,
            Entity as ProductCategories,
        },
        products::{ActiveModel as ProductActive, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{CategoryDto, ProductDto, ProductWithCategoriesDto},
    response::{ApiResponse, PaginatedResult},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Public product listing with filtering, sorting and pagination.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<PaginatedResult<ProductWithCategoriesDto>>> {
    let (page, page_size, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.search_term.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    if let Some(is_available) = query.is_available {
        condition = condition.add(Column::IsAvailable.eq(is_available));
    }
    if let Some(category_name) = query.category_name.as_ref().filter(|s| !s.is_empty()) {
        let category = Categories::find()
            .filter(CategoryCol::Name.eq(category_name.as_str()))
            .one(&state.orm)
            .await?;
        match category {
            Some(category) => {
                let sub = Query::select()
                    .column(ProductCategoryCol::ProductId)
                    .from(ProductCategories)
                    .and_where(ProductCategoryCol::CategoryId.eq(category.category_id))
                    .to_owned();
                condition = condition.add(Column::ProductId.in_subquery(sub));
            }
            None => {
                // No such category, no products.
                return Ok(ApiResponse::success(
                    "Products retrieved successfully",
                    PaginatedResult::new(Vec::new(), page, page_size, 0),
                ));
            }
        }
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::Name);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Asc);
    let sort_col = match sort_by {
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::StockQuantity => Column::StockQuantity,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total_count = finder.clone().count(&state.orm).await? as i64;

    let products = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut data = Vec::with_capacity(products.len());
    for product in products {
        data.push(with_categories(&state.orm, product).await?);
    }

    Ok(ApiResponse::success(
        "Products retrieved successfully",
        PaginatedResult::new(data, page, page_size, total_count),
    ))
}

pub async fn get_product(
    state: &AppState,
    id: i32,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let dto = with_categories(&state.orm, product).await?;
    Ok(ApiResponse::success("Product retrieved successfully", dto))
}

pub async fn create_product(
    state: &AppState,
    principal: &Principal,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }
    if payload.price < 0 || payload.stock_quantity < 0 {
        return Err(AppError::Validation(
            "Price and stock quantity must not be negative".into(),
        ));
    }

    let product = ProductActive {
        product_id: NotSet,
        partner_id: Set(payload.partner_id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        image_url: Set(payload.image_url),
        is_available: Set(payload.is_available),
        stock_quantity: Set(payload.stock_quantity),
        created_at: NotSet,
        updated_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    set_categories(&state.orm, product.product_id, &payload.category_ids).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = with_categories(&state.orm, product).await?;
    Ok(ApiResponse::success_with_status(
        "Product created successfully",
        dto,
        201,
    ))
}

pub async fn update_product(
    state: &AppState,
    principal: &Principal,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::Validation("Price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    if let Some(stock_quantity) = payload.stock_quantity {
        if stock_quantity < 0 {
            return Err(AppError::Validation(
                "Stock quantity must not be negative".into(),
            ));
        }
        active.stock_quantity = Set(stock_quantity);
    }
    active.updated_at = Set(Some(Utc::now().into()));
    let product = active.update(&state.orm).await?;

    if let Some(category_ids) = payload.category_ids {
        ProductCategories::delete_many()
            .filter(ProductCategoryCol::ProductId.eq(product.product_id))
            .exec(&state.orm)
            .await?;
        set_categories(&state.orm, product.product_id, &category_ids).await?;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = with_categories(&state.orm, product).await?;
    Ok(ApiResponse::success("Product updated successfully", dto))
}

pub async fn delete_product(
    state: &AppState,
    principal: &Principal,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product not found".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product deleted successfully",
        serde_json::json!({}),
    ))
}

async fn set_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    category_ids: &[i32],
) -> AppResult<()> {
    for category_id in category_ids {
        let category = Categories::find_by_id(*category_id).one(conn).await?;
        if category.is_none() {
            return Err(AppError::NotFound(format!(
                "Category with ID {category_id} was not found"
            )));
        }
        ProductCategoryActive {
            product_id: Set(product_id),
            category_id: Set(*category_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn with_categories<C: ConnectionTrait>(
    conn: &C,
    product: ProductModel,
) -> AppResult<ProductWithCategoriesDto> {
    let categories = product
        .find_related(Categories)
        .all(conn)
        .await?
        .into_iter()
        .map(|c| CategoryDto {
            category_id: c.category_id,
            name: c.name,
        })
        .collect();

    Ok(ProductWithCategoriesDto {
        product: product_to_dto(product),
        categories,
    })
}

fn product_to_dto(model: ProductModel) -> ProductDto {
    ProductDto {
        product_id: model.product_id,
        partner_id: model.partner_id,
        name: model.name,
        description: model.description,
        price: model.price,
        image_url: model.image_url,
        is_available: model.is_available,
        stock_quantity: model.stock_quantity,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.map(|t| t.with_timezone(&Utc)),
    }
}
