//! Canonical authorization context and the builder that produces it.
//!
//! An [`AuthorizationContext`] can only come out of [`build_context`], so
//! holding one means a provider validated the credential and the identity
//! carried both a project and a user.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::UserProfile;

/// Log target for provider contract violations.
pub const CONTRACT_LOG_TARGET: &str = "idp::contract";

/// An authorization claim.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Create a role, trimming surrounding whitespace.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.len() == name.len() {
            Self(name)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Role name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::new(name)
    }
}

/// Provider-independent identity of one request.
///
/// Immutable once built. Business logic reads `project_id`, `user_id` and
/// `roles`; the remaining fields are display metadata and never drive an
/// authorization decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationContext {
    project_id: String,
    user_id: String,
    roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_title: Option<String>,
}

impl AuthorizationContext {
    /// Tenant scope.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Identity within the tenant.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Deduplicated roles in canonical order.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Whether the context carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .binary_search_by(|r| r.as_str().cmp(role))
            .is_ok()
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn project_title(&self) -> Option<&str> {
        self.project_title.as_deref()
    }
}

/// Additional roles merged into a context at build time.
///
/// The profile's own roles are always included; a source adds roles known
/// outside the provider (for example a tenant membership table).
pub trait RolesSource {
    /// Roles to merge for this profile.
    fn roles_for(&self, profile: &UserProfile) -> Vec<Role>;
}

impl RolesSource for () {
    fn roles_for(&self, _profile: &UserProfile) -> Vec<Role> {
        Vec::new()
    }
}

impl RolesSource for Vec<Role> {
    fn roles_for(&self, _profile: &UserProfile) -> Vec<Role> {
        self.clone()
    }
}

impl RolesSource for [Role] {
    fn roles_for(&self, _profile: &UserProfile) -> Vec<Role> {
        self.to_vec()
    }
}

impl<F> RolesSource for F
where
    F: Fn(&UserProfile) -> Vec<Role>,
{
    fn roles_for(&self, profile: &UserProfile) -> Vec<Role> {
        self(profile)
    }
}

/// Build the canonical context from a provider profile.
///
/// Fails with [`Error::IncompleteIdentity`] when `project_id` or `user_id` is
/// missing or blank. That is a provider bug, so it is logged under
/// [`CONTRACT_LOG_TARGET`] at error level.
pub fn build_context<R>(profile: UserProfile, roles_source: &R) -> Result<AuthorizationContext>
where
    R: RolesSource + ?Sized,
{
    let extra_roles = roles_source.roles_for(&profile);

    let UserProfile {
        project_id,
        user_id,
        roles,
        full_name,
        avatar,
        email,
        project_title,
        extra: _,
    } = profile;

    let project_id = required(project_id, "projectId")?;
    let user_id = required(user_id, "userId")?;

    let roles: BTreeSet<Role> = roles
        .into_iter()
        .chain(extra_roles)
        .map(|r| Role::new(r.0))
        .filter(|r| !r.is_empty())
        .collect();

    Ok(AuthorizationContext {
        project_id,
        user_id,
        roles: roles.into_iter().collect(),
        full_name: display(full_name),
        avatar: display(avatar),
        email: display(email),
        project_title: display(project_title),
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            log::error!(
                target: CONTRACT_LOG_TARGET,
                "Provider identity is missing {field}; refusing to build context"
            );
            Err(Error::IncompleteIdentity { field })
        }
    }
}

/// Normalise a display field: strip control characters, trim, drop empties.
fn display(value: Option<String>) -> Option<String> {
    let cleaned: String = value?.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
