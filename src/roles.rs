//! Privilege tiers and the guards handlers run before touching the snapshot.

use serde::{Deserialize, Serialize};
use crate::error::{LedgerError, Result};
use crate::state::NetworkState;

/// Numeric tiers stored in `Wallet::role`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTiers {
    pub banned: i64,
    pub none: i64,
    pub participant: i64,
    pub author: i64,
    /// Always passes every guard
    pub admin: i64,
}

impl Default for RoleTiers {
    fn default() -> Self {
        Self {
            banned: -1,
            none: 0,
            participant: 1,
            author: 100,
            admin: 65000,
        }
    }
}

impl RoleTiers {
    pub fn is_banned(&self, role: i64) -> bool {
        role < self.none
    }
}

/// Role of `user`, or the "none" tier for addresses without a wallet.
pub fn role_of(state: &NetworkState, user: &str) -> i64 {
    state
        .wallets
        .get(user)
        .map(|w| w.role)
        .unwrap_or(state.roles.none)
}

/// Passes for admins and for any role at or above `min_role`.
pub fn require_tiered_role(state: &NetworkState, user: &str, min_role: i64) -> Result<()> {
    let role = role_of(state, user);
    if role == state.roles.admin || role >= min_role {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(format!(
        "{} holds role {} but {} or higher is required",
        user, role, min_role
    )))
}

/// Passes for admins and for exactly `required`.
pub fn require_specific_role(state: &NetworkState, user: &str, required: i64) -> Result<()> {
    let role = role_of(state, user);
    if role == state.roles.admin || role == required {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(format!(
        "{} holds role {} but exactly {} is required",
        user, role, required
    )))
}

/// Passes for admins and for any role in `allowed`.
pub fn require_role_from_list(state: &NetworkState, user: &str, allowed: &[i64]) -> Result<()> {
    let role = role_of(state, user);
    if role == state.roles.admin || allowed.contains(&role) {
        return Ok(());
    }
    Err(LedgerError::Unauthorized(format!(
        "{} holds role {} which is not one of {:?}",
        user, role, allowed
    )))
}

pub fn require_not_banned(state: &NetworkState, user: &str) -> Result<()> {
    if state.roles.is_banned(role_of(state, user)) {
        return Err(LedgerError::Unauthorized(format!("{} is banned", user)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::state_with_wallets;

    #[test]
    fn test_tiered_role() {
        let state = state_with_wallets(&[("admin", 0.0, 65000), ("author", 0.0, 100), ("user", 0.0, 1)]);
        assert!(require_tiered_role(&state, "admin", 100).is_ok());
        assert!(require_tiered_role(&state, "author", 100).is_ok());
        assert!(require_tiered_role(&state, "author", 1).is_ok());
        assert!(matches!(
            require_tiered_role(&state, "user", 100),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(require_tiered_role(&state, "stranger", 1).is_err());
    }

    #[test]
    fn test_specific_role() {
        let state = state_with_wallets(&[("admin", 0.0, 65000), ("author", 0.0, 100)]);
        assert!(require_specific_role(&state, "admin", 1).is_ok());
        assert!(require_specific_role(&state, "author", 100).is_ok());
        assert!(require_specific_role(&state, "author", 1).is_err());
    }

    #[test]
    fn test_role_from_list() {
        let state = state_with_wallets(&[("admin", 0.0, 65000), ("user", 0.0, 1), ("author", 0.0, 100)]);
        assert!(require_role_from_list(&state, "admin", &[]).is_ok());
        assert!(require_role_from_list(&state, "user", &[1, 100]).is_ok());
        assert!(require_role_from_list(&state, "author", &[1]).is_err());
    }

    #[test]
    fn test_banned() {
        let state = state_with_wallets(&[("villain", 10.0, -1), ("user", 10.0, 1)]);
        assert!(require_not_banned(&state, "villain").is_err());
        assert!(require_not_banned(&state, "user").is_ok());
        assert!(require_not_banned(&state, "stranger").is_ok());
    }
}
