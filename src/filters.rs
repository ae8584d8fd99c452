//! Role-scoped projections over fully hydrated records.
//!
//! User reads never fail for under-privileged callers; they get a narrower
//! view instead. Order reads are all-or-nothing and deny with 401 when no
//! qualifying relationship exists.

use crate::error::{AppError, AppResult};
use crate::models::{OrderDto, Role, UserDto};

/// Project a user record according to who is asking.
///
/// Admin and the user themselves see everything. Managers see contact-level
/// detail (email, no phone number). Everyone else gets the minimal public
/// fields.
pub fn filter_user(user: &UserDto, requester_role: Role, requester_id: i32) -> UserDto {
    if requester_role == Role::Admin || requester_id == user.user_id {
        return user.clone();
    }

    if requester_role == Role::Manager {
        return UserDto {
            user_id: user.user_id,
            email: user.email.clone(),
            username: None,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: None,
            is_active: user.is_active,
            is_email_verified: None,
            role: user.role,
            profile_image_url: None,
            created_at: user.created_at,
            updated_at: None,
            last_login_at: user.last_login_at,
            customer_id: None,
            partner_id: None,
        };
    }

    UserDto {
        user_id: user.user_id,
        email: None,
        username: None,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone_number: None,
        is_active: user.is_active,
        is_email_verified: None,
        role: user.role,
        profile_image_url: None,
        created_at: None,
        updated_at: None,
        last_login_at: None,
        customer_id: None,
        partner_id: None,
    }
}

/// Return the order visible to the requester, or deny.
///
/// Deliverers assigned to the order see it without payment details; all
/// other qualifying relations see the full record.
pub fn filter_order(
    order: OrderDto,
    requester_role: Role,
    requester_id: i32,
    requester_partner_id: Option<i32>,
) -> AppResult<OrderDto> {
    match requester_role {
        Role::Admin | Role::Manager => Ok(order),
        Role::Customer if order.customer_id == requester_id => Ok(order),
        Role::Partner
            if order.partner_id.is_some() && order.partner_id == requester_partner_id =>
        {
            Ok(order)
        }
        Role::Deliverer
            if order
                .delivery
                .as_ref()
                .is_some_and(|d| d.deliverer_id == requester_id) =>
        {
            let mut order = order;
            order.payment = None;
            Ok(order)
        }
        _ => Err(AppError::Unauthorized("Access denied to this order".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryDto, OrderStatus, PaymentDto};
    use chrono::Utc;

    fn full_user() -> UserDto {
        UserDto {
            user_id: 42,
            email: Some("jane@example.com".into()),
            username: Some("jane".into()),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            phone_number: Some("+40700000000".into()),
            is_active: true,
            is_email_verified: Some(true),
            role: Role::Customer,
            profile_image_url: Some("https://img.example.com/jane.png".into()),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            last_login_at: Some(Utc::now()),
            customer_id: Some(7),
            partner_id: None,
        }
    }

    fn full_order() -> OrderDto {
        OrderDto {
            order_id: 9,
            order_number: "202501020001".into(),
            customer_id: 42,
            partner_id: Some(5),
            delivery_address_id: 1,
            pickup_address_id: Some(2),
            status: OrderStatus::InTransit,
            sub_total: 2000,
            delivery_fee: 300,
            tax: 100,
            discount: 0,
            total_amount: 2400,
            notes: None,
            special_instructions: None,
            estimated_delivery_time: None,
            actual_delivery_time: None,
            created_at: Utc::now(),
            updated_at: None,
            order_items: vec![],
            delivery: Some(DeliveryDto {
                delivery_id: 3,
                deliverer_id: 77,
                status: "PickedUp".into(),
                assigned_at: Utc::now(),
                picked_up_at: Some(Utc::now()),
                delivered_at: None,
            }),
            payment: Some(PaymentDto {
                payment_id: 4,
                amount: 2400,
                method: "Card".into(),
                processed_at: None,
            }),
        }
    }

    #[test]
    fn admin_sees_full_user() {
        let user = full_user();
        let view = filter_user(&user, Role::Admin, 1);
        assert_eq!(view.email, user.email);
        assert_eq!(view.phone_number, user.phone_number);
        assert_eq!(view.username, user.username);
    }

    #[test]
    fn self_sees_full_user() {
        let user = full_user();
        let view = filter_user(&user, Role::Customer, user.user_id);
        assert_eq!(view.email, user.email);
        assert_eq!(view.phone_number, user.phone_number);
    }

    #[test]
    fn manager_sees_email_but_not_phone() {
        let user = full_user();
        let view = filter_user(&user, Role::Manager, 1);
        assert_eq!(view.email, user.email);
        assert!(view.phone_number.is_none());
        assert!(view.username.is_none());
        assert!(view.created_at.is_some());
        assert!(view.last_login_at.is_some());
        assert_eq!(view.role, user.role);
    }

    #[test]
    fn other_roles_see_minimal_view() {
        let user = full_user();
        for role in [Role::Customer, Role::Partner, Role::Deliverer] {
            let view = filter_user(&user, role, 1);
            assert_eq!(view.user_id, user.user_id);
            assert_eq!(view.first_name, user.first_name);
            assert_eq!(view.last_name, user.last_name);
            assert_eq!(view.role, user.role);
            assert_eq!(view.is_active, user.is_active);
            assert!(view.email.is_none());
            assert!(view.phone_number.is_none());
            assert!(view.created_at.is_none());
            assert!(view.customer_id.is_none());
        }
    }

    #[test]
    fn filter_user_is_idempotent() {
        let user = full_user();
        let first = filter_user(&user, Role::Manager, 1);
        let second = filter_user(&user, Role::Manager, 1);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn admin_and_manager_see_full_order() {
        let order = filter_order(full_order(), Role::Admin, 1, None).unwrap();
        assert!(order.payment.is_some());
        let order = filter_order(full_order(), Role::Manager, 1, None).unwrap();
        assert!(order.payment.is_some());
    }

    #[test]
    fn customer_sees_own_order_only() {
        assert!(filter_order(full_order(), Role::Customer, 42, None).is_ok());
        let denied = filter_order(full_order(), Role::Customer, 43, None);
        assert!(matches!(denied, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn partner_match_is_on_partner_profile_id() {
        assert!(filter_order(full_order(), Role::Partner, 1, Some(5)).is_ok());
        assert!(filter_order(full_order(), Role::Partner, 1, Some(6)).is_err());
        assert!(filter_order(full_order(), Role::Partner, 1, None).is_err());
    }

    #[test]
    fn assigned_deliverer_sees_order_without_payment() {
        let order = filter_order(full_order(), Role::Deliverer, 77, None).unwrap();
        assert!(order.payment.is_none());
        assert!(order.delivery.is_some());
        assert_eq!(order.total_amount, 2400);

        let denied = filter_order(full_order(), Role::Deliverer, 78, None);
        assert!(matches!(denied, Err(AppError::Unauthorized(_))));
    }
}
