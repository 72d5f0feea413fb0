use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Content visibility tier, ordered from most private to public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Team,
    Members,
    Public,
}

impl Visibility {
    /// Numeric level stored in the index; higher is more public.
    pub fn level(self) -> i64 {
        match self {
            Visibility::Team => 0,
            Visibility::Members => 10,
            Visibility::Public => 20,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(Visibility::Team),
            10 => Some(Visibility::Members),
            20 => Some(Visibility::Public),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Team => "team",
            Visibility::Members => "members",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "team" => Ok(Visibility::Team),
            "members" => Ok(Visibility::Members),
            "public" => Ok(Visibility::Public),
            other => Err(ArchiveError::invalid_argument(format!(
                "unknown visibility '{other}'"
            ))),
        }
    }
}

/// Site membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Assistant,
    Editor,
    LanguageAdmin,
}

impl Role {
    /// The most private tier this role may see on its own site.
    pub fn visibility_ceiling(self) -> Visibility {
        match self {
            Role::Member => Visibility::Members,
            Role::Assistant | Role::Editor | Role::LanguageAdmin => Visibility::Team,
        }
    }
}

impl FromStr for Role {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "member" => Ok(Role::Member),
            "assistant" => Ok(Role::Assistant),
            "editor" => Ok(Role::Editor),
            "language_admin" => Ok(Role::LanguageAdmin),
            other => Err(ArchiveError::invalid_argument(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_matches_levels() {
        assert!(Visibility::Team < Visibility::Members);
        assert!(Visibility::Members < Visibility::Public);
        assert!(Visibility::Team.level() < Visibility::Public.level());
        assert_eq!(Visibility::from_level(10), Some(Visibility::Members));
        assert_eq!(Visibility::from_level(5), None);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" Public ".parse::<Visibility>().unwrap(), Visibility::Public);
        assert!("secret".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_role_ceilings() {
        assert_eq!(Role::Member.visibility_ceiling(), Visibility::Members);
        assert_eq!(Role::Editor.visibility_ceiling(), Visibility::Team);
        assert_eq!("language-admin".parse::<Role>().unwrap(), Role::LanguageAdmin);
        assert!("owner".parse::<Role>().is_err());
    }
}
