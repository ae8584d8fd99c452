use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{OrderDto, OrderStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: i32,
    pub partner_id: Option<i32>,
    pub delivery_address_id: i32,
    pub pickup_address_id: Option<i32>,
    pub sub_total: i64,
    pub delivery_fee: i64,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub discount: i64,
    pub notes: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub order_items: Vec<CreateOrderItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub product_id: i32,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderDto>,
}
