use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed role set. Claims carrying anything else are rejected rather than
/// falling through to a default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Customer,
    Deliverer,
    Partner,
    Admin,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Deliverer => "Deliverer",
            Role::Partner => "Partner",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "Customer" => Some(Role::Customer),
            "Deliverer" => Some(Role::Deliverer),
            "Partner" => Some(Role::Partner),
            "Admin" => Some(Role::Admin),
            "Manager" => Some(Role::Manager),
            _ => None,
        }
    }
}

/// Order lifecycle states. The forward path runs Pending through Delivered;
/// Cancelled and Refunded are side exits set directly by status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    InTransit,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::ReadyForPickup => "ReadyForPickup",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }

    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "Pending" => Some(OrderStatus::Pending),
            "Confirmed" => Some(OrderStatus::Confirmed),
            "Preparing" => Some(OrderStatus::Preparing),
            "ReadyForPickup" => Some(OrderStatus::ReadyForPickup),
            "InTransit" => Some(OrderStatus::InTransit),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            "Refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Only pending or cancelled orders may be deleted.
    pub fn is_deletable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Cancelled)
    }
}

/// User view returned by the API. Strippable fields are optional so the
/// role-based filter can narrow the projection without a second type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub user_id: i32,
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_email_verified: Option<bool>,
    pub role: Role,
    pub profile_image_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub customer_id: Option<i32>,
    pub partner_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDto {
    pub order_id: i32,
    pub order_number: String,
    pub customer_id: i32,
    pub partner_id: Option<i32>,
    pub delivery_address_id: i32,
    pub pickup_address_id: Option<i32>,
    pub status: OrderStatus,
    pub sub_total: i64,
    pub delivery_fee: i64,
    pub tax: i64,
    pub discount: i64,
    pub total_amount: i64,
    pub notes: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItemDto>,
    pub delivery: Option<DeliveryDto>,
    pub payment: Option<PaymentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemDto {
    pub order_item_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryDto {
    pub delivery_id: i32,
    pub deliverer_id: i32,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub payment_id: i32,
    pub amount: i64,
    pub method: String,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductDto {
    pub product_id: i32,
    pub partner_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDto {
    pub category_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductWithCategoriesDto {
    #[serde(flatten)]
    pub product: ProductDto,
    pub categories: Vec<CategoryDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_round_trips_known_values() {
        for role in [
            Role::Customer,
            Role::Deliverer,
            Role::Partner,
            Role::Admin,
            Role::Manager,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn role_parse_rejects_unknown_values() {
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("SuperUser"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn order_status_parse_rejects_unknown_values() {
        assert_eq!(OrderStatus::parse("Shipped"), None);
        assert_eq!(OrderStatus::parse("pending"), None);
    }

    #[test]
    fn only_pending_and_cancelled_are_deletable() {
        assert!(OrderStatus::Pending.is_deletable());
        assert!(OrderStatus::Cancelled.is_deletable());
        assert!(!OrderStatus::Delivered.is_deletable());
        assert!(!OrderStatus::InTransit.is_deletable());
        assert!(!OrderStatus::Refunded.is_deletable());
    }
}
