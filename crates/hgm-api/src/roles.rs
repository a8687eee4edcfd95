//! Where a user lands after login.

use serde::Serialize;

use crate::client::ApiClient;
use crate::models::{LoginResponse, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Guess the role from username patterns when the server sends none.
    pub legacy_username_inference: bool,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            legacy_username_inference: true,
        }
    }
}

/// The parts of a household account shown on its dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FamilyProfile {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub age: Option<String>,
    pub guardian_name: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub center_code: Option<String>,
}

impl FamilyProfile {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            age: user.age.clone(),
            guardian_name: user.guardian_name.clone(),
            father_name: user.father_name.clone(),
            mother_name: user.mother_name.clone(),
            center_code: user.center_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    AnganwadiDashboard,
    FamilyDashboard(FamilyProfile),
    /// Admin accounts exist but have no client surface.
    AdminDisabled,
    UnknownRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    MissingCredentials,
    ConnectionFailed(String),
    Routed(Destination),
    Rejected(String),
}

pub fn resolve_destination(response: &LoginResponse, policy: RoutingPolicy) -> Destination {
    let user = response.user.as_ref();
    let authoritative = user
        .and_then(|u| u.role.clone())
        .or_else(|| response.role.clone())
        .filter(|r| !matches!(r, Role::Other(_)));

    let role = match authoritative {
        Some(role) => Some(role),
        None if policy.legacy_username_inference => {
            let inferred = user
                .and_then(|u| u.username.as_deref())
                .and_then(infer_role_from_username);
            if let Some(role) = &inferred {
                log::warn!("No role from server; inferred {role} from username pattern");
            }
            inferred
        }
        None => None,
    };

    match role {
        Some(Role::Anganwadi) => Destination::AnganwadiDashboard,
        Some(Role::Family) => {
            Destination::FamilyDashboard(user.map(FamilyProfile::from_user).unwrap_or_default())
        }
        Some(Role::Admin) => Destination::AdminDisabled,
        Some(Role::Other(_)) | None => Destination::UnknownRole,
    }
}

/// Deprecated username conventions: `CGCO`/`ADMIN`, `CGAB`/`ANGANWADI`,
/// `CGPV`/`FAMILY`.
pub fn infer_role_from_username(username: &str) -> Option<Role> {
    let upper = username.to_uppercase();
    let has = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));
    if has(&["ADMIN", "CGCO"]) {
        Some(Role::Admin)
    } else if has(&["ANGANWADI", "CGAB"]) {
        Some(Role::Anganwadi)
    } else if has(&["FAMILY", "CGPV"]) {
        Some(Role::Family)
    } else {
        None
    }
}

/// Validate, probe, log in and route.
pub fn login_flow(
    client: &ApiClient,
    username: &str,
    password: &str,
    policy: RoutingPolicy,
) -> LoginOutcome {
    let username = username.trim();
    if username.is_empty() || password.trim().is_empty() {
        return LoginOutcome::MissingCredentials;
    }

    let probe = client.test_connection();
    if !probe.success {
        log::debug!("Connection probe failed: {}", probe.message);
        return LoginOutcome::ConnectionFailed(probe.message);
    }

    match client.login(username, password) {
        Ok(response) if response.success && response.user.is_some() => {
            LoginOutcome::Routed(resolve_destination(&response, policy))
        }
        Ok(response) => LoginOutcome::Rejected(non_empty_or(response.message, "login failed")),
        Err(e) => LoginOutcome::Rejected(non_empty_or(e.to_string(), "login failed")),
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> LoginResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_server_role_is_authoritative() {
        let r = response(json!({
            "success": true,
            "user": {"username": "CGPV104", "role": "anganwadi"},
            "token": "abc"
        }));
        assert_eq!(
            resolve_destination(&r, RoutingPolicy::default()),
            Destination::AnganwadiDashboard
        );
    }

    #[test]
    fn test_top_level_role_used_when_user_has_none() {
        let r = response(json!({
            "success": true,
            "user": {"username": "x"},
            "role": "admin"
        }));
        assert_eq!(
            resolve_destination(&r, RoutingPolicy::default()),
            Destination::AdminDisabled
        );
    }

    #[test]
    fn test_family_profile_is_collected() {
        let r = response(json!({
            "success": true,
            "user": {
                "id": 12,
                "role": "family",
                "name": "Aarav",
                "age": 4,
                "motherName": "Sunita",
                "aanganwadi_code": "AWC-9"
            }
        }));
        let Destination::FamilyDashboard(profile) =
            resolve_destination(&r, RoutingPolicy::default())
        else {
            panic!("expected family dashboard");
        };
        assert_eq!(profile.user_id.as_deref(), Some("12"));
        assert_eq!(profile.age.as_deref(), Some("4"));
        assert_eq!(profile.mother_name.as_deref(), Some("Sunita"));
        assert_eq!(profile.center_code.as_deref(), Some("AWC-9"));
    }

    #[test]
    fn test_legacy_inference_is_a_switchable_fallback() {
        let r = response(json!({"success": true, "user": {"username": "cgab001"}}));
        assert_eq!(
            resolve_destination(&r, RoutingPolicy::default()),
            Destination::AnganwadiDashboard
        );
        let strict = RoutingPolicy {
            legacy_username_inference: false,
        };
        assert_eq!(resolve_destination(&r, strict), Destination::UnknownRole);
    }

    #[test]
    fn test_username_patterns() {
        assert_eq!(infer_role_from_username("CGCO12"), Some(Role::Admin));
        assert_eq!(infer_role_from_username("site-admin"), Some(Role::Admin));
        assert_eq!(infer_role_from_username("CGAB001"), Some(Role::Anganwadi));
        assert_eq!(infer_role_from_username("cgpv104"), Some(Role::Family));
        assert_eq!(infer_role_from_username("ravi"), None);
    }

    #[test]
    fn test_unrecognised_role_without_inference_match() {
        let r = response(json!({"success": true, "user": {"username": "ravi", "role": "supervisor"}}));
        assert_eq!(
            resolve_destination(&r, RoutingPolicy::default()),
            Destination::UnknownRole
        );
    }
}
