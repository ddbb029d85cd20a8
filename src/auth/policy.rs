//! Role and permission checks over an authenticated principal
//!
//! All checks are pure. A failed check is always `Forbidden`; the caller is
//! already authenticated by the time any of these run.

use crate::{
    auth::{principal::Principal, role::Role},
    error::AppError,
};

/// Passes when the principal's role is one of `allowed`
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&principal.role) {
        return Ok(());
    }

    let required = allowed
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join("|");
    Err(AppError::forbidden_role(&required, principal.role.as_str()))
}

/// Passes when the principal's role level is at least `minimum`'s
pub fn require_role_at_least(principal: &Principal, minimum: Role) -> Result<(), AppError> {
    if principal.role.level() >= minimum.level() {
        Ok(())
    } else {
        Err(AppError::forbidden_role(
            minimum.as_str(),
            principal.role.as_str(),
        ))
    }
}

pub fn require_permission(principal: &Principal, permission: &str) -> Result<(), AppError> {
    if principal.role == Role::SuperAdmin || principal.permissions.grants(permission) {
        return Ok(());
    }

    Err(AppError::Forbidden {
        message: format!("Permission '{}' required", permission),
        required: Some(permission.to_string()),
        actual: None,
    })
}

pub fn require_any_permission(principal: &Principal, permissions: &[&str]) -> Result<(), AppError> {
    if principal.role == Role::SuperAdmin || principal.permissions.grants_any(permissions) {
        return Ok(());
    }

    let required = permissions.join("|");
    Err(AppError::Forbidden {
        message: format!("One of permissions '{}' required", required),
        required: Some(required),
        actual: None,
    })
}

pub fn require_coffee_grower(principal: &Principal) -> Result<(), AppError> {
    if principal.role.is_grower() {
        Ok(())
    } else {
        Err(AppError::forbidden_role(
            Role::CoffeeGrower.as_str(),
            principal.role.as_str(),
        ))
    }
}

/// Admins bypass. Everyone else must own the referenced farm; a request
/// that names no farm is refused.
pub fn require_own_farm(principal: &Principal, farm_ref: Option<&str>) -> Result<(), AppError> {
    if matches!(principal.role, Role::Admin | Role::SuperAdmin) {
        return Ok(());
    }

    let Some(farm_ref) = farm_ref.map(str::trim).filter(|r| !r.is_empty()) else {
        return Err(AppError::forbidden("Farm reference required"));
    };

    let owns = principal
        .farm_id
        .is_some_and(|farm_id| farm_id.to_string() == farm_ref);

    if owns {
        Ok(())
    } else {
        tracing::debug!(
            account_id = principal.id,
            farm_ref,
            "Farm ownership check failed"
        );
        Err(AppError::forbidden("Access to this farm is not allowed"))
    }
}

/// Per-route authorization rule, used as middleware state
#[derive(Debug, Clone)]
pub enum Requirement {
    Authenticated,
    RoleIn(&'static [Role]),
    RoleAtLeast(Role),
    Permission(&'static str),
    AnyPermission(&'static [&'static str]),
    CoffeeGrower,
    OwnFarm,
    All(Vec<Requirement>),
}

impl Requirement {
    pub fn evaluate(&self, principal: &Principal, farm_ref: Option<&str>) -> Result<(), AppError> {
        match self {
            Requirement::Authenticated => Ok(()),
            Requirement::RoleIn(roles) => require_role(principal, roles),
            Requirement::RoleAtLeast(role) => require_role_at_least(principal, *role),
            Requirement::Permission(permission) => require_permission(principal, permission),
            Requirement::AnyPermission(permissions) => {
                require_any_permission(principal, permissions)
            }
            Requirement::CoffeeGrower => require_coffee_grower(principal),
            Requirement::OwnFarm => require_own_farm(principal, farm_ref),
            Requirement::All(requirements) => requirements
                .iter()
                .try_for_each(|r| r.evaluate(principal, farm_ref)),
        }
    }

    /// Whether evaluation needs a farm reference from the request
    pub fn needs_farm_ref(&self) -> bool {
        match self {
            Requirement::OwnFarm => true,
            Requirement::All(requirements) => requirements.iter().any(Requirement::needs_farm_ref),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{permissions::PermissionSet, role::AccountKind};

    fn principal(role: Role, permissions: &[&str], farm_id: Option<i64>) -> Principal {
        Principal {
            id: 1,
            email: "someone@example.com".to_string(),
            role,
            kind: role.account_kind(),
            permissions: permissions.iter().copied().collect(),
            farm_id,
            farm_name: None,
            name: None,
            is_demo: false,
        }
    }

    #[test]
    fn test_super_admin_passes_every_level() {
        let p = principal(Role::SuperAdmin, &[], None);
        for role in [Role::SuperAdmin, Role::Admin, Role::Moderator, Role::CoffeeGrower] {
            assert!(require_role_at_least(&p, role).is_ok());
        }
    }

    #[test]
    fn test_moderator_fails_admin_levels() {
        let p = principal(Role::Moderator, &[], None);
        assert!(require_role_at_least(&p, Role::Moderator).is_ok());

        let err = require_role_at_least(&p, Role::Admin).unwrap_err();
        match err {
            AppError::Forbidden {
                required, actual, ..
            } => {
                assert_eq!(required.as_deref(), Some("admin"));
                assert_eq!(actual.as_deref(), Some("moderator"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(require_role_at_least(&p, Role::SuperAdmin).is_err());
    }

    #[test]
    fn test_require_role_membership() {
        let admin = principal(Role::Admin, &[], None);
        let moderator = principal(Role::Moderator, &[], None);
        let allowed = &[Role::Admin, Role::SuperAdmin];

        assert!(require_role(&admin, allowed).is_ok());
        assert!(matches!(
            require_role(&moderator, allowed),
            Err(AppError::Forbidden { actual: Some(ref a), .. }) if a == "moderator"
        ));
    }

    #[test]
    fn test_wildcard_grants_unknown_permission() {
        let p = principal(Role::Moderator, &["*"], None);
        assert!(require_permission(&p, "harvest.export.never-enumerated").is_ok());
        assert!(require_any_permission(&p, &["x.y", "z"]).is_ok());
    }

    #[test]
    fn test_super_admin_bypasses_permissions() {
        let p = principal(Role::SuperAdmin, &[], None);
        assert!(require_permission(&p, "reports.read").is_ok());
    }

    #[test]
    fn test_missing_permissions_are_empty() {
        let mut p = principal(Role::Admin, &[], None);
        p.permissions = PermissionSet::from(None);
        assert!(require_permission(&p, "reports.read").is_err());

        p.permissions.insert("users.manage");
        assert!(require_any_permission(&p, &["content.moderate", "users.manage"]).is_ok());
        assert!(require_any_permission(&p, &["content.moderate"]).is_err());
    }

    #[test]
    fn test_require_coffee_grower() {
        assert!(require_coffee_grower(&principal(Role::CoffeeGrower, &[], Some(3))).is_ok());
        assert!(require_coffee_grower(&principal(Role::Admin, &[], None)).is_err());
    }

    #[test]
    fn test_own_farm() {
        let grower = principal(Role::CoffeeGrower, &[], Some(42));
        assert!(require_own_farm(&grower, Some("42")).is_ok());
        assert!(require_own_farm(&grower, Some(" 42 ")).is_ok());
        assert!(require_own_farm(&grower, Some("43")).is_err());
        assert!(require_own_farm(&grower, None).is_err());

        let farmless = principal(Role::CoffeeGrower, &[], None);
        assert!(require_own_farm(&farmless, Some("42")).is_err());
    }

    #[test]
    fn test_own_farm_admin_bypass_but_not_moderator() {
        assert!(require_own_farm(&principal(Role::Admin, &[], None), None).is_ok());
        assert!(require_own_farm(&principal(Role::SuperAdmin, &[], None), Some("9")).is_ok());
        assert!(require_own_farm(&principal(Role::Moderator, &[], None), Some("9")).is_err());
    }

    #[test]
    fn test_requirement_all() {
        let requirement = Requirement::All(vec![Requirement::CoffeeGrower, Requirement::OwnFarm]);
        assert!(requirement.needs_farm_ref());
        assert!(!Requirement::RoleAtLeast(Role::Admin).needs_farm_ref());

        let grower = principal(Role::CoffeeGrower, &[], Some(5));
        assert!(requirement.evaluate(&grower, Some("5")).is_ok());
        assert!(requirement.evaluate(&grower, Some("6")).is_err());

        // Admin bypasses ownership but is not a grower
        let admin = principal(Role::Admin, &[], None);
        assert!(requirement.evaluate(&admin, Some("5")).is_err());
        assert_eq!(admin.kind, AccountKind::Admin);
    }
}
