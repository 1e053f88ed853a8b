//! Access gate
//!
//! Maps a role and a console section to allow/deny. Everything here is pure
//! and total so it can run on every render.

use serde::Serialize;

use crate::roles::Role;

pub const DASHBOARD: &str = "dashboard";
pub const USERS: &str = "users";
pub const COLLECTORS: &str = "collectors";
pub const AUDIT: &str = "audit";
pub const SETTINGS: &str = "settings";

/// Sections open to collectors
const COLLECTOR_SECTIONS: [&str; 2] = [DASHBOARD, USERS];

/// Whether `role` may open `section`
///
/// An absent role sees nothing, admins see everything, and unrecognized
/// roles fail closed.
pub fn can_access(role: Option<&Role>, section: &str) -> bool {
    match role {
        None => false,
        Some(Role::Admin) => true,
        Some(Role::Collector) => COLLECTOR_SECTIONS.contains(&section),
        Some(Role::Member) => section == DASHBOARD,
        Some(Role::Unrecognized(_)) => false,
    }
}

/// Navigation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionDescriptor {
    pub id: &'static str,
    pub label: &'static str,
}

/// Console sections in menu order
pub const NAVIGATION: [SectionDescriptor; 5] = [
    SectionDescriptor { id: DASHBOARD, label: "Dashboard" },
    SectionDescriptor { id: USERS, label: "Users" },
    SectionDescriptor { id: COLLECTORS, label: "Collectors" },
    SectionDescriptor { id: AUDIT, label: "Audit Logs" },
    SectionDescriptor { id: SETTINGS, label: "Settings" },
];

/// Menu entries `role` may see, in menu order
pub fn visible_sections(role: Option<&Role>) -> Vec<SectionDescriptor> {
    NAVIGATION
        .iter()
        .copied()
        .filter(|section| can_access(role, section.id))
        .collect()
}

/// Outcome of choosing the active section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionSelection {
    /// The requested section may be shown
    Granted(String),
    /// Denied; the dashboard is shown instead and an "Access Restricted"
    /// notice is due
    Restricted { requested: String },
}

impl SectionSelection {
    /// Section that will actually be shown
    pub fn active(&self) -> &str {
        match self {
            SectionSelection::Granted(section) => section,
            SectionSelection::Restricted { .. } => DASHBOARD,
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, SectionSelection::Restricted { .. })
    }
}

/// Choose the active section for a navigation request
pub fn select_section(role: Option<&Role>, requested: &str) -> SectionSelection {
    if can_access(role, requested) {
        SectionSelection::Granted(requested.to_string())
    } else {
        SectionSelection::Restricted {
            requested: requested.to_string(),
        }
    }
}
