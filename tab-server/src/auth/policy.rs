//! Authorization oracle
//!
//! The service asks `Authorizer::authorize` before every operation and
//! aborts with PermissionDenied on a deny, before any write.

use uuid::Uuid;

use super::session_auth::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateTab,
    ReadTab,
    ListTabs,
    SubmitUpdate,
    ApproveTab,
    CloseTab,
    AddOrder,
    RemoveOrder,
    MarkBillPaid,
    SetVerificationList,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateTab => "create_tab",
            Action::ReadTab => "read_tab",
            Action::ListTabs => "list_tabs",
            Action::SubmitUpdate => "submit_update",
            Action::ApproveTab => "approve_tab",
            Action::CloseTab => "close_tab",
            Action::AddOrder => "add_order",
            Action::RemoveOrder => "remove_order",
            Action::MarkBillPaid => "mark_bill_paid",
            Action::SetVerificationList => "set_verification_list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Shop { shop_id: i64 },
    Tab { shop_id: i64, tab_id: i64, owner_id: Uuid },
}

impl Resource {
    pub fn shop_id(&self) -> i64 {
        match self {
            Resource::Shop { shop_id } | Resource::Tab { shop_id, .. } => *shop_id,
        }
    }
}

pub trait Authorizer: Send + Sync + 'static {
    fn authorize(&self, actor: &Actor, resource: &Resource, action: Action) -> bool;
}

/// Shop staff may do everything in their shop; owners may read and revise
/// their own tabs; anyone signed in may open a tab.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopRolePolicy;

impl Authorizer for ShopRolePolicy {
    fn authorize(&self, actor: &Actor, resource: &Resource, action: Action) -> bool {
        if actor.is_staff_of(resource.shop_id()) {
            return true;
        }
        match (resource, action) {
            (Resource::Shop { .. }, Action::CreateTab) => true,
            (Resource::Tab { owner_id, .. }, Action::ReadTab | Action::SubmitUpdate) => {
                *owner_id == actor.user_id
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn actor(staff_shops: &[i64]) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            email: "someone@example.edu".into(),
            staff_shops: staff_shops.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn tab_of(owner_id: Uuid, shop_id: i64) -> Resource {
        Resource::Tab {
            shop_id,
            tab_id: 10,
            owner_id,
        }
    }

    #[test]
    fn test_staff_may_do_everything_in_their_shop() {
        let staff = actor(&[1]);
        let tab = tab_of(Uuid::new_v4(), 1);
        for action in [
            Action::ApproveTab,
            Action::CloseTab,
            Action::AddOrder,
            Action::RemoveOrder,
            Action::MarkBillPaid,
            Action::ReadTab,
        ] {
            assert!(ShopRolePolicy.authorize(&staff, &tab, action), "{action:?}");
        }
        assert!(ShopRolePolicy.authorize(&staff, &Resource::Shop { shop_id: 1 }, Action::ListTabs));
    }

    #[test]
    fn test_staff_role_does_not_cross_shops() {
        let staff = actor(&[1]);
        let tab = tab_of(Uuid::new_v4(), 2);
        assert!(!ShopRolePolicy.authorize(&staff, &tab, Action::ApproveTab));
        let other_shop = Resource::Shop { shop_id: 2 };
        assert!(!ShopRolePolicy.authorize(&staff, &other_shop, Action::ListTabs));
    }

    #[test]
    fn test_owner_may_read_and_revise_only() {
        let owner = actor(&[]);
        let tab = tab_of(owner.user_id, 1);
        assert!(ShopRolePolicy.authorize(&owner, &tab, Action::ReadTab));
        assert!(ShopRolePolicy.authorize(&owner, &tab, Action::SubmitUpdate));
        assert!(!ShopRolePolicy.authorize(&owner, &tab, Action::ApproveTab));
        assert!(!ShopRolePolicy.authorize(&owner, &tab, Action::AddOrder));
        assert!(!ShopRolePolicy.authorize(&owner, &tab, Action::SetVerificationList));
    }

    #[test]
    fn test_strangers_may_only_create() {
        let stranger = actor(&[]);
        let shop = Resource::Shop { shop_id: 1 };
        assert!(ShopRolePolicy.authorize(&stranger, &shop, Action::CreateTab));
        assert!(!ShopRolePolicy.authorize(&stranger, &shop, Action::ListTabs));
        assert!(!ShopRolePolicy.authorize(&stranger, &tab_of(Uuid::new_v4(), 1), Action::ReadTab));
    }
}
