//! Role gate shared by every transaction-creating and confirming operation

use crate::error::InventoryError;
use crate::models::{Principal, Role, TransactionKind};

/// Whether the actor holds exactly the required role. There is no implicit
/// hierarchy: an admin is not a stock manager.
pub fn actor_has_role(actor: &Principal, required: Role) -> bool {
    actor.role == required
}

/// Gate an action on a single role
pub fn require_role(actor: &Principal, required: Role, action: &str) -> Result<(), InventoryError> {
    if actor_has_role(actor, required) {
        Ok(())
    } else {
        Err(InventoryError::RoleViolation {
            required,
            action: action.to_string(),
        })
    }
}

/// Gate an action on any of several roles. Reports the first role listed.
pub fn require_any_role(
    actor: &Principal,
    allowed: &[Role],
    action: &str,
) -> Result<(), InventoryError> {
    if allowed.iter().any(|role| actor_has_role(actor, *role)) {
        return Ok(());
    }
    Err(InventoryError::RoleViolation {
        required: allowed.first().copied().unwrap_or(Role::Admin),
        action: action.to_string(),
    })
}

/// Role allowed to create a transaction of the given kind
pub fn originator_for(kind: TransactionKind) -> Role {
    match kind {
        TransactionKind::EggCollection | TransactionKind::ChickenDeathRecord => Role::Worker,
        TransactionKind::FoodPurchase
        | TransactionKind::FoodDistribution
        | TransactionKind::MedicinePurchase
        | TransactionKind::MedicineDistribution
        | TransactionKind::EggDistribution
        | TransactionKind::EggSale => Role::StockManager,
    }
}

/// Whether `role` may create a transaction of the given kind. Sales managers
/// also sell eggs, from their own stock.
pub fn may_originate(kind: TransactionKind, role: Role) -> bool {
    role == originator_for(kind) || (kind == TransactionKind::EggSale && role == Role::SalesManager)
}
