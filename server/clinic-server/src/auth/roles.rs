use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Medico,
    Secretaria,
}

impl Role {
    pub const ALL: &'static [Role] = &[Role::Admin, Role::Medico, Role::Secretaria];
    pub const CLINICAL: &'static [Role] = &[Role::Admin, Role::Medico];
    pub const ADMIN_ONLY: &'static [Role] = &[Role::Admin];
    pub const MEDICO_ONLY: &'static [Role] = &[Role::Medico];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Medico => "MEDICO",
            Role::Secretaria => "SECRETARIA",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MEDICO" => Ok(Role::Medico),
            "SECRETARIA" => Ok(Role::Secretaria),
            other => Err(ApiError::internal(format!("Unknown role: {}", other))),
        }
    }
}

/// Reject the request unless the user holds one of `allowed`.
pub fn require_roles(user: &CurrentUser, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.id, role = %user.role, "Role not allowed");
        Err(ApiError::authorization(
            "You do not have permission to perform this action",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@clinic.dev".to_string(),
            role,
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("NURSE".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Secretaria).unwrap(), "\"SECRETARIA\"");
    }

    #[test]
    fn test_require_roles() {
        assert!(require_roles(&user(Role::Medico), Role::CLINICAL).is_ok());

        let err = require_roles(&user(Role::Secretaria), Role::CLINICAL).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        assert!(require_roles(&user(Role::Admin), Role::MEDICO_ONLY).is_err());
    }
}
