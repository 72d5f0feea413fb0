//! Caller permissions as seen by search.
//!
//! Identity resolution happens elsewhere; a [`VisibilityPolicy`] turns an
//! already authenticated [`Principal`] into the [`VisibilityScope`] that the
//! query compiler and the hydrator enforce.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Entity, Role, SiteId, Visibility};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub site_id: SiteId,
    pub role: Role,
}

/// An authenticated (or anonymous) caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Option<String>,

    /// Staff and superadmins see everything.
    #[serde(default)]
    pub is_staff: bool,

    #[serde(default)]
    pub memberships: Vec<Membership>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn staff(user_id: impl Into<String>) -> Self {
        Principal {
            user_id: Some(user_id.into()),
            is_staff: true,
            memberships: Vec::new(),
        }
    }

    pub fn member_of(user_id: impl Into<String>, site_id: impl Into<SiteId>, role: Role) -> Self {
        Principal {
            user_id: Some(user_id.into()),
            is_staff: false,
            memberships: vec![Membership {
                site_id: site_id.into(),
                role,
            }],
        }
    }
}

/// The most private tier a caller may see on one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteGrant {
    pub site_id: SiteId,
    pub ceiling: Visibility,
}

/// Resolved permissions: public content everywhere, plus per-site grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityScope {
    pub grants: Vec<SiteGrant>,
    pub bypass: bool,
}

impl VisibilityScope {
    /// Public content only.
    pub fn public() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        VisibilityScope {
            grants: Vec::new(),
            bypass: true,
        }
    }

    pub fn with_grant(mut self, site_id: impl Into<SiteId>, ceiling: Visibility) -> Self {
        self.grants.push(SiteGrant {
            site_id: site_id.into(),
            ceiling,
        });
        self
    }

    /// Whether a record with these levels is visible to the caller.
    pub fn allows(&self, site_id: &str, site_visibility: Visibility, visibility: Visibility) -> bool {
        if self.bypass {
            return true;
        }
        if site_visibility == Visibility::Public && visibility == Visibility::Public {
            return true;
        }
        self.grants
            .iter()
            .any(|g| g.site_id == site_id && visibility >= g.ceiling)
    }

    /// Same rules as the index filter, applied to an authoritative record.
    pub fn allows_entity(&self, entity: &Entity) -> bool {
        match entity {
            Entity::Language(_) => true,
            Entity::Site(site) => self.allows(&site.id, site.visibility, site.visibility),
            Entity::DictionaryEntry(e) => {
                self.allows(&e.meta.site.id, e.meta.site.visibility, e.meta.visibility)
            }
            Entity::Song(s) => self.allows(&s.meta.site.id, s.meta.site.visibility, s.meta.visibility),
            Entity::Story(s) => self.allows(&s.meta.site.id, s.meta.site.visibility, s.meta.visibility),
            Entity::Media(m) => self.allows(&m.site.id, m.site.visibility, Visibility::Public),
        }
    }
}

/// Supplies the caller's scope to search.
pub trait VisibilityPolicy: Send + Sync {
    fn scope(&self, principal: &Principal) -> Result<VisibilityScope>;
}

/// Derives grants from the principal's own memberships and role ceilings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MembershipPolicy;

impl VisibilityPolicy for MembershipPolicy {
    fn scope(&self, principal: &Principal) -> Result<VisibilityScope> {
        if principal.is_staff {
            return Ok(VisibilityScope::admin());
        }
        let grants = principal
            .memberships
            .iter()
            .map(|m| SiteGrant {
                site_id: m.site_id.clone(),
                ceiling: m.role.visibility_ceiling(),
            })
            .collect();
        Ok(VisibilityScope {
            grants,
            bypass: false,
        })
    }
}
