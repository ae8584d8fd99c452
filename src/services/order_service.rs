use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::{
    audit::log_audit,
    authz::Principal,
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        deliveries::{Column as DeliveryCol, Entity as Deliveries, Model as DeliveryModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        partners::{Column as PartnerCol, Entity as Partners},
        payments::{Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        products::{ActiveModel as ProductActive, Entity as Products},
    },
    error::{AppError, AppResult},
    filters::filter_order,
    models::{DeliveryDto, OrderDto, OrderItemDto, OrderStatus, PaymentDto, Role},
    response::ApiResponse,
    state::AppState,
};

/// List orders for the caller. Admin sees everything; everyone else falls
/// through to the role-scoped listing.
pub async fn list_orders(
    state: &AppState,
    principal: &Principal,
) -> AppResult<ApiResponse<OrderList>> {
    if principal.is_admin() {
        let orders = load_all_orders(state).await?;
        return Ok(ApiResponse::success(
            "All orders retrieved successfully",
            OrderList { items: orders },
        ));
    }

    my_orders(state, principal).await
}

/// Orders visible to the caller through their role relationship: customers
/// see their own, partners their restaurant's, deliverers their assignments.
pub async fn my_orders(
    state: &AppState,
    principal: &Principal,
) -> AppResult<ApiResponse<OrderList>> {
    let items = match principal.role {
        Role::Admin => load_all_orders(state).await?,
        Role::Customer => {
            let customer = Customers::find()
                .filter(CustomerCol::UserId.eq(principal.user_id))
                .one(&state.orm)
                .await?;
            match customer {
                Some(customer) => {
                    load_orders_where(state, OrderCol::CustomerId.eq(customer.customer_id)).await?
                }
                None => {
                    // Users without a customer profile simply have no orders.
                    tracing::warn!(
                        user_id = principal.user_id,
                        "no customer record for user, returning empty orders list"
                    );
                    Vec::new()
                }
            }
        }
        Role::Partner => {
            let partner = Partners::find()
                .filter(PartnerCol::UserId.eq(principal.user_id))
                .one(&state.orm)
                .await?
                .ok_or_else(|| AppError::BadRequest("Partner not found for this user".into()))?;
            load_orders_where(state, OrderCol::PartnerId.eq(partner.partner_id)).await?
        }
        Role::Deliverer => {
            let deliveries = Deliveries::find()
                .filter(DeliveryCol::DelivererId.eq(principal.user_id))
                .all(&state.orm)
                .await?;
            let mut items = Vec::with_capacity(deliveries.len());
            for delivery in deliveries {
                if let Some(order) = Orders::find_by_id(delivery.order_id).one(&state.orm).await? {
                    let dto = load_order_dto(&state.orm, order).await?;
                    // Same shape as the single-order read: payment stripped.
                    items.push(filter_order(dto, principal.role, principal.user_id, None)?);
                }
            }
            items
        }
        Role::Manager => return Err(AppError::Forbidden),
    };

    Ok(ApiResponse::success(
        "Orders retrieved successfully",
        OrderList { items },
    ))
}

/// Single-order read, shaped by the role-based filter: assigned deliverers
/// get the order without payment details, unrelated callers are denied.
pub async fn get_order(
    state: &AppState,
    principal: &Principal,
    id: i32,
) -> AppResult<ApiResponse<OrderDto>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let order = load_order_dto(&state.orm, order).await?;

    let partner_id = requester_partner_id(state, principal).await?;
    let order = filter_order(order, principal.role, principal.user_id, partner_id)?;

    Ok(ApiResponse::success("Order retrieved successfully", order))
}

pub async fn orders_by_customer(
    state: &AppState,
    principal: &Principal,
    customer_id: i32,
) -> AppResult<ApiResponse<OrderList>> {
    if !principal.is_admin_or_manager() {
        return Err(AppError::Forbidden);
    }
    let items = load_orders_where(state, OrderCol::CustomerId.eq(customer_id)).await?;
    Ok(ApiResponse::success(
        "Customer orders retrieved successfully",
        OrderList { items },
    ))
}

pub async fn orders_by_partner(
    state: &AppState,
    principal: &Principal,
    partner_id: i32,
) -> AppResult<ApiResponse<OrderList>> {
    if !principal.is_admin_or_manager() {
        return Err(AppError::Forbidden);
    }
    let items = load_orders_where(state, OrderCol::PartnerId.eq(partner_id)).await?;
    Ok(ApiResponse::success(
        "Partner orders retrieved successfully",
        OrderList { items },
    ))
}

pub async fn orders_by_status(
    state: &AppState,
    principal: &Principal,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderList>> {
    if !principal.is_admin_or_manager() {
        return Err(AppError::Forbidden);
    }
    let items = load_orders_where(state, OrderCol::Status.eq(status.as_str())).await?;
    Ok(ApiResponse::success(
        "Orders retrieved successfully",
        OrderList { items },
    ))
}

/// Create an order: validate and price each item against the current
/// product record, decrement stock, then persist the order.
///
/// Stock decrements are individual persist calls in item order with no
/// surrounding transaction; a failure partway leaves earlier decrements
/// committed. Two concurrent creations can both pass the stock check.
pub async fn create_order(
    state: &AppState,
    principal: &Principal,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDto>> {
    if payload.order_items.is_empty() {
        return Err(AppError::Validation(
            "Order must contain at least one product".into(),
        ));
    }

    let mut priced_items = Vec::with_capacity(payload.order_items.len());
    for item in &payload.order_items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Invalid quantity for product {}",
                item.product_id
            )));
        }

        let product = Products::find_by_id(item.product_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Product with ID {} was not found", item.product_id))
            })?;

        if !product.is_available || product.stock_quantity < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Product '{}' is not available or has insufficient stock",
                product.name
            )));
        }

        // Snapshot the unit price; later price changes do not affect this order.
        let unit_price = product.price;
        priced_items.push((
            item.product_id,
            item.quantity,
            unit_price,
            item.special_instructions.clone(),
        ));

        let new_stock = product.stock_quantity - item.quantity;
        let mut active: ProductActive = product.into();
        active.stock_quantity = Set(new_stock);
        active.updated_at = Set(Some(Utc::now().into()));
        active.update(&state.orm).await?;
    }

    let order_number = generate_order_number(&state.orm).await?;
    let total_amount = compute_total(
        payload.sub_total,
        payload.delivery_fee,
        payload.tax,
        payload.discount,
    );

    let order = OrderActive {
        order_id: NotSet,
        order_number: Set(order_number),
        customer_id: Set(payload.customer_id),
        partner_id: Set(payload.partner_id),
        delivery_address_id: Set(payload.delivery_address_id),
        pickup_address_id: Set(payload.pickup_address_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        sub_total: Set(payload.sub_total),
        delivery_fee: Set(payload.delivery_fee),
        tax: Set(payload.tax),
        discount: Set(payload.discount),
        total_amount: Set(total_amount),
        notes: Set(payload.notes),
        special_instructions: Set(payload.special_instructions),
        estimated_delivery_time: Set(payload.estimated_delivery_time.map(Into::into)),
        actual_delivery_time: Set(None),
        created_at: NotSet,
        updated_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    for (product_id, quantity, unit_price, special_instructions) in priced_items {
        OrderItemActive {
            order_item_id: NotSet,
            order_id: Set(order.order_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            total_price: Set(unit_price * quantity as i64),
            special_instructions: Set(special_instructions),
        }
        .insert(&state.orm)
        .await?;
    }

    tracing::info!(
        order_number = %order.order_number,
        customer_id = order.customer_id,
        "order created"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = load_order_dto(&state.orm, order).await?;
    Ok(ApiResponse::success_with_status(
        "Order created successfully",
        dto,
        201,
    ))
}

/// Overwrite the order status with the requested value. No transition
/// matrix is enforced; the route layer restricts this to Admin/Manager.
pub async fn update_order_status(
    state: &AppState,
    principal: &Principal,
    id: i32,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderDto>> {
    if !principal.is_admin_or_manager() {
        return Err(AppError::Forbidden);
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status.as_str().to_string());
    if let Some(notes) = payload.notes.filter(|n| !n.trim().is_empty()) {
        active.notes = Set(Some(notes));
    }
    if let Some(estimated) = payload.estimated_delivery_time {
        active.estimated_delivery_time = Set(Some(estimated.into()));
    }
    if let Some(actual) = payload.actual_delivery_time {
        active.actual_delivery_time = Set(Some(actual.into()));
    }
    active.updated_at = Set(Some(Utc::now().into()));
    let order = active.update(&state.orm).await?;

    tracing::info!(
        order_number = %order.order_number,
        status = %order.status,
        "order status updated"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = load_order_dto(&state.orm, order).await?;
    Ok(ApiResponse::success("Order status updated successfully", dto))
}

/// Delete an order, restoring consumed stock. Only pending or cancelled
/// orders may be deleted.
pub async fn delete_order(
    state: &AppState,
    principal: &Principal,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !principal.is_admin_or_manager() {
        return Err(AppError::Forbidden);
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    let status = parse_status(&order.status)?;
    if !status.is_deletable() {
        return Err(AppError::BadRequest(
            "Only pending or cancelled orders may be deleted".into(),
        ));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.order_id))
        .all(&state.orm)
        .await?;

    // Give consumed quantities back before the order record goes away.
    for item in &items {
        if let Some(product) = Products::find_by_id(item.product_id).one(&state.orm).await? {
            let new_stock = product.stock_quantity + item.quantity;
            let mut active: ProductActive = product.into();
            active.stock_quantity = Set(new_stock);
            active.updated_at = Set(Some(Utc::now().into()));
            active.update(&state.orm).await?;
        }
    }

    Orders::delete_by_id(order.order_id).exec(&state.orm).await?;

    tracing::info!(order_id = id, "order deleted");

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "order_delete",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order deleted successfully",
        serde_json::json!({}),
    ))
}

/// Next order number for today: `{YYYYMMDD}{seq:04}`, continuing from the
/// day's highest sequence and restarting at 0001 each calendar day.
pub async fn generate_order_number<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    let prefix = Utc::now().format("%Y%m%d").to_string();
    let last = Orders::find()
        .filter(OrderCol::OrderNumber.like(format!("{prefix}%")))
        .order_by_desc(OrderCol::OrderNumber)
        .one(conn)
        .await?
        .map(|o| o.order_number);

    Ok(build_order_number(&prefix, last.as_deref()))
}

fn build_order_number(prefix: &str, last: Option<&str>) -> String {
    let mut sequence = 1;
    if let Some(last) = last {
        if last.len() > prefix.len() {
            if let Ok(n) = last[prefix.len()..].parse::<i32>() {
                sequence = n + 1;
            }
        }
    }
    format!("{prefix}{sequence:04}")
}

fn compute_total(sub_total: i64, delivery_fee: i64, tax: i64, discount: i64) -> i64 {
    sub_total + delivery_fee + tax - discount
}

async fn requester_partner_id(state: &AppState, principal: &Principal) -> AppResult<Option<i32>> {
    if principal.role != Role::Partner {
        return Ok(None);
    }
    let partner = Partners::find()
        .filter(PartnerCol::UserId.eq(principal.user_id))
        .one(&state.orm)
        .await?;
    Ok(partner.map(|p| p.partner_id))
}

async fn load_all_orders(state: &AppState) -> AppResult<Vec<OrderDto>> {
    let orders = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        items.push(load_order_dto(&state.orm, order).await?);
    }
    Ok(items)
}

async fn load_orders_where(
    state: &AppState,
    filter: sea_orm::sea_query::SimpleExpr,
) -> AppResult<Vec<OrderDto>> {
    let orders = Orders::find()
        .filter(filter)
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let mut items = Vec::with_capacity(orders.len());
    for order in orders {
        items.push(load_order_dto(&state.orm, order).await?);
    }
    Ok(items)
}

/// Hydrate an order with its items and the optional delivery and payment.
pub async fn load_order_dto<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<OrderDto> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.order_id))
        .all(conn)
        .await?;
    let delivery = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.order_id))
        .one(conn)
        .await?;
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.order_id))
        .one(conn)
        .await?;

    order_to_dto(order, items, delivery, payment)
}

fn order_to_dto(
    order: OrderModel,
    items: Vec<OrderItemModel>,
    delivery: Option<DeliveryModel>,
    payment: Option<PaymentModel>,
) -> AppResult<OrderDto> {
    Ok(OrderDto {
        order_id: order.order_id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        partner_id: order.partner_id,
        delivery_address_id: order.delivery_address_id,
        pickup_address_id: order.pickup_address_id,
        status: parse_status(&order.status)?,
        sub_total: order.sub_total,
        delivery_fee: order.delivery_fee,
        tax: order.tax,
        discount: order.discount,
        total_amount: order.total_amount,
        notes: order.notes,
        special_instructions: order.special_instructions,
        estimated_delivery_time: order.estimated_delivery_time.map(|t| t.with_timezone(&Utc)),
        actual_delivery_time: order.actual_delivery_time.map(|t| t.with_timezone(&Utc)),
        created_at: order.created_at.with_timezone(&Utc),
        updated_at: order.updated_at.map(|t| t.with_timezone(&Utc)),
        order_items: items
            .into_iter()
            .map(|item| OrderItemDto {
                order_item_id: item.order_item_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
                special_instructions: item.special_instructions,
            })
            .collect(),
        delivery: delivery.map(|d| DeliveryDto {
            delivery_id: d.delivery_id,
            deliverer_id: d.deliverer_id,
            status: d.status,
            assigned_at: d.assigned_at.with_timezone(&Utc),
            picked_up_at: d.picked_up_at.map(|t| t.with_timezone(&Utc)),
            delivered_at: d.delivered_at.map(|t| t.with_timezone(&Utc)),
        }),
        payment: payment.map(|p| PaymentDto {
            payment_id: p.payment_id,
            amount: p.amount,
            method: p.method,
            processed_at: p.processed_at.map(|t| t.with_timezone(&Utc)),
        }),
    })
}

fn parse_status(value: &str) -> AppResult<OrderStatus> {
    OrderStatus::parse(value)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown order status in store: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_order_of_the_day_is_sequence_one() {
        assert_eq!(build_order_number("20250101", None), "202501010001");
    }

    #[test]
    fn sequence_continues_from_the_days_highest() {
        assert_eq!(
            build_order_number("20250101", Some("202501010001")),
            "202501010002"
        );
        assert_eq!(
            build_order_number("20250101", Some("202501010042")),
            "202501010043"
        );
    }

    #[test]
    fn sequence_resets_on_a_new_day() {
        // The previous day's max is never passed in because the lookup is
        // prefix-scoped; an absent match restarts at 0001.
        assert_eq!(build_order_number("20250102", None), "202501020001");
    }

    #[test]
    fn malformed_last_number_restarts_the_sequence() {
        assert_eq!(
            build_order_number("20250101", Some("20250101XXXX")),
            "202501010001"
        );
        assert_eq!(build_order_number("20250101", Some("2025")), "202501010001");
    }

    #[test]
    fn total_is_subtotal_plus_fee_plus_tax_minus_discount() {
        assert_eq!(compute_total(2000, 300, 0, 0), 2300);
        assert_eq!(compute_total(2000, 300, 150, 450), 2000);
        assert_eq!(compute_total(0, 0, 0, 0), 0);
    }
}
