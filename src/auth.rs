use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Caller roles. Identity is established upstream (gateway / session layer);
/// this service trusts the forwarded headers and only enforces which role may
/// invoke which operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Dealer,
    Warehouse,
    Procurement,
    Logistics,
    Supplier,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dealer => "dealer",
            Role::Warehouse => "warehouse",
            Role::Procurement => "procurement",
            Role::Logistics => "logistics",
            Role::Supplier => "supplier",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dealer" => Some(Role::Dealer),
            "warehouse" | "warehouse_operator" => Some(Role::Warehouse),
            "procurement" | "procurement_manager" => Some(Role::Procurement),
            "logistics" | "logistics_planner" => Some(Role::Logistics),
            "supplier" => Some(Role::Supplier),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller, extracted from `x-user-id` / `x-user-role` headers.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    /// Admin passes every gate; everyone else needs an exact role match.
    pub fn require(&self, role: Role) -> Result<(), ServiceError> {
        if self.role == Role::Admin || self.role == role {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role {} required, caller is {}",
                role.as_str(),
                self.role.as_str()
            )))
        }
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), ServiceError> {
        if self.role == Role::Admin || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "one of [{}] required, caller is {}",
                roles
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.role.as_str()
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing x-user-id header".into()))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| ServiceError::Unauthorized("x-user-id is not a valid UUID".into()))?;

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing x-user-role header".into()))?;
        let role = Role::from_str(role).ok_or_else(|| {
            ServiceError::Unauthorized(format!("unknown role '{}' in x-user-role", role))
        })?;

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_gate() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(actor.require(Role::Procurement).is_ok());
        assert!(actor.require_any(&[Role::Dealer, Role::Logistics]).is_ok());
    }

    #[test]
    fn role_gate_rejects_mismatch() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Dealer,
        };
        assert!(actor.require(Role::Dealer).is_ok());
        assert!(matches!(
            actor.require(Role::Procurement),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [
            Role::Dealer,
            Role::Warehouse,
            Role::Procurement,
            Role::Logistics,
            Role::Supplier,
            Role::Admin,
        ] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("auditor"), None);
    }
}
