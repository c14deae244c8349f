//! Who may do what.
//!
//! Everything here is a pure function of the caller's [`RoleSet`] (and for
//! orders, the caller's id and the order itself). Handlers consult the
//! policy before touching the store, so a denied request has no effects.

use crate::error::{AppError, AppResult};
use crate::order::{Order, OrderField, OrderPatch};
use crate::role::{Role, RoleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    MenuItem,
    ManagerRoster,
    DeliveryCrewRoster,
    Cart,
    Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// Converts a denial into a 403 carrying `message`.
    pub fn ensure(self, message: &'static str) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::Forbidden(message)),
        }
    }

    fn when(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Coarse, resource-level check. Ownership rules for carts and orders are
/// applied on top of this by [`OrderScope`] and [`authorize_order_patch`].
pub fn authorize(roles: &RoleSet, resource: Resource, action: Action) -> Decision {
    match (resource, action) {
        (Resource::Category | Resource::MenuItem, Action::Read) => Decision::Allow,
        (Resource::Category | Resource::MenuItem, _) => Decision::when(roles.is_manager()),
        (Resource::ManagerRoster | Resource::DeliveryCrewRoster, _) => {
            Decision::when(roles.is_manager())
        }
        (Resource::Cart, _) => Decision::Allow,
        (Resource::Order, Action::Delete) => Decision::when(roles.is_manager()),
        (Resource::Order, _) => Decision::Allow,
    }
}

/// The slice of orders a caller can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    AssignedTo(u64),
    PlacedBy(u64),
}

impl OrderScope {
    pub fn for_caller(user_id: u64, roles: &RoleSet) -> Self {
        match roles.primary() {
            Role::Manager => OrderScope::All,
            Role::DeliveryCrew => OrderScope::AssignedTo(user_id),
            Role::Customer => OrderScope::PlacedBy(user_id),
        }
    }

    pub fn admits(&self, order: &Order) -> bool {
        match *self {
            OrderScope::All => true,
            OrderScope::AssignedTo(crew) => order.delivery_crew == Some(crew),
            OrderScope::PlacedBy(user) => order.user == user,
        }
    }
}

/// Field-level rules for changing an existing order.
///
/// Managers may change anything. Delivery crew may only flip `status` on
/// orders assigned to them; a request that also carries other fields is
/// denied as a whole. Customers may only move the `date` of their own
/// orders.
pub fn authorize_order_patch(
    user_id: u64,
    roles: &RoleSet,
    order: &Order,
    patch: &OrderPatch,
) -> Decision {
    let fields = patch.fields();
    match roles.primary() {
        Role::Manager => Decision::Allow,
        Role::DeliveryCrew => Decision::when(
            order.delivery_crew == Some(user_id)
                && fields.iter().all(|f| *f == OrderField::Status),
        ),
        Role::Customer => Decision::when(
            order.user == user_id && fields.iter().all(|f| *f == OrderField::Date),
        ),
    }
}
