use std::fmt;
use std::str::FromStr;

/// Operation a rule, base query or hook is evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    List,
    Read,
    Create,
    Update,
    Delete,
    Distinct,
    Count,
}

impl Access {
    pub const ALL: [Access; 7] = [
        Access::List,
        Access::Read,
        Access::Create,
        Access::Update,
        Access::Delete,
        Access::Distinct,
        Access::Count,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Access::List => "list",
            Access::Read => "read",
            Access::Create => "create",
            Access::Update => "update",
            Access::Delete => "delete",
            Access::Distinct => "distinct",
            Access::Count => "count",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown access type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access type: '{0}'")]
pub struct AccessParseError(pub String);

impl FromStr for Access {
    type Err = AccessParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Access::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AccessParseError(s.to_owned()))
    }
}

/// Key under which a route guard is registered.
///
/// Collection and document routes use the plain access type. Embedded
/// sub-collection routes use `subs.<path>.<access>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GuardKey {
    Model(Access),
    Sub { path: String, access: Access },
}

impl GuardKey {
    #[must_use]
    pub fn sub(path: impl Into<String>, access: Access) -> Self {
        Self::Sub {
            path: path.into(),
            access,
        }
    }

    #[must_use]
    pub fn access(&self) -> Access {
        match self {
            Self::Model(access) | Self::Sub { access, .. } => *access,
        }
    }
}

impl From<Access> for GuardKey {
    fn from(access: Access) -> Self {
        Self::Model(access)
    }
}

impl fmt::Display for GuardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(access) => write!(f, "{access}"),
            Self::Sub { path, access } => write!(f, "subs.{path}.{access}"),
        }
    }
}

impl FromStr for GuardKey {
    type Err = AccessParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("subs.") {
            let (path, access) = rest
                .rsplit_once('.')
                .ok_or_else(|| AccessParseError(s.to_owned()))?;
            if path.is_empty() {
                return Err(AccessParseError(s.to_owned()));
            }
            return Ok(Self::sub(path, access.parse()?));
        }
        Ok(Self::Model(s.parse()?))
    }
}
