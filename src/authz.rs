use crate::models::{OrderDto, Role};

/// Authenticated caller for the current request. Always passed explicitly;
/// nothing in the service layer reads ambient request context.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: i32,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_admin_or_manager(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    /// May this principal touch a resource owned by `owner_id`?
    /// Admin override, otherwise strict id equality.
    pub fn can_access_user(&self, owner_id: i32) -> bool {
        self.is_admin() || self.user_id == owner_id
    }

    /// Relationship check for a single order. `partner_id` is the requester's
    /// partner profile id, if any; `None` never matches.
    pub fn can_access_order(&self, order: &OrderDto, partner_id: Option<i32>) -> bool {
        match self.role {
            Role::Admin | Role::Manager => true,
            Role::Customer => order.customer_id == self.user_id,
            Role::Partner => order.partner_id.is_some() && order.partner_id == partner_id,
            Role::Deliverer => order
                .delivery
                .as_ref()
                .is_some_and(|d| d.deliverer_id == self.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryDto, OrderStatus};
    use chrono::Utc;

    fn order(customer_id: i32, partner_id: Option<i32>, deliverer_id: Option<i32>) -> OrderDto {
        OrderDto {
            order_id: 1,
            order_number: "202501010001".into(),
            customer_id,
            partner_id,
            delivery_address_id: 1,
            pickup_address_id: None,
            status: OrderStatus::Pending,
            sub_total: 1000,
            delivery_fee: 300,
            tax: 0,
            discount: 0,
            total_amount: 1300,
            notes: None,
            special_instructions: None,
            estimated_delivery_time: None,
            actual_delivery_time: None,
            created_at: Utc::now(),
            updated_at: None,
            order_items: vec![],
            delivery: deliverer_id.map(|id| DeliveryDto {
                delivery_id: 1,
                deliverer_id: id,
                status: "Assigned".into(),
                assigned_at: Utc::now(),
                picked_up_at: None,
                delivered_at: None,
            }),
            payment: None,
        }
    }

    #[test]
    fn admin_can_access_any_user() {
        let admin = Principal::new(1, Role::Admin);
        assert!(admin.can_access_user(1));
        assert!(admin.can_access_user(99));
        assert!(admin.can_access_user(0));
        assert!(admin.can_access_user(-5));
    }

    #[test]
    fn non_admin_can_only_access_self() {
        let user = Principal::new(7, Role::Customer);
        assert!(user.can_access_user(7));
        assert!(!user.can_access_user(8));
        assert!(!user.can_access_user(0));
        assert!(!user.can_access_user(-1));

        let manager = Principal::new(3, Role::Manager);
        assert!(!manager.can_access_user(4));
    }

    #[test]
    fn can_access_user_is_pure() {
        let user = Principal::new(2, Role::Deliverer);
        assert_eq!(user.can_access_user(2), user.can_access_user(2));
        assert_eq!(user.can_access_user(9), user.can_access_user(9));
    }

    #[test]
    fn admin_and_manager_can_access_any_order() {
        let o = order(10, Some(20), Some(30));
        assert!(Principal::new(1, Role::Admin).can_access_order(&o, None));
        assert!(Principal::new(2, Role::Manager).can_access_order(&o, None));
    }

    #[test]
    fn customer_access_requires_ownership() {
        let o = order(10, None, None);
        assert!(Principal::new(10, Role::Customer).can_access_order(&o, None));
        assert!(!Principal::new(11, Role::Customer).can_access_order(&o, None));
    }

    #[test]
    fn partner_access_requires_matching_partner_id() {
        let o = order(10, Some(20), None);
        let partner = Principal::new(5, Role::Partner);
        assert!(partner.can_access_order(&o, Some(20)));
        assert!(!partner.can_access_order(&o, Some(21)));
        // Unresolvable partner claim fails closed.
        assert!(!partner.can_access_order(&o, None));

        let unassigned = order(10, None, None);
        assert!(!partner.can_access_order(&unassigned, None));
    }

    #[test]
    fn deliverer_access_requires_assignment() {
        let o = order(10, Some(20), Some(30));
        assert!(Principal::new(30, Role::Deliverer).can_access_order(&o, None));
        assert!(!Principal::new(31, Role::Deliverer).can_access_order(&o, None));

        let undelivered = order(10, Some(20), None);
        assert!(!Principal::new(30, Role::Deliverer).can_access_order(&undelivered, None));
    }
}
