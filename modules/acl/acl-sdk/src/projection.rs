use std::collections::BTreeMap;

/// Caller-supplied field selection.
///
/// Accepted shapes: a list of fields, a space-separated string, or an object
/// of `{field: 1 | -1}`. A leading `-` marks an exclusion.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Projection {
    Fields(Vec<String>),
    Flags(BTreeMap<String, i64>),
    Spec(String),
}

impl Projection {
    /// Flattens the projection into a list of (possibly `-`-prefixed) fields.
    #[must_use]
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::Fields(fields) => fields
                .iter()
                .map(|f| f.trim().to_owned())
                .filter(|f| !f.is_empty())
                .collect(),
            Self::Flags(flags) => flags
                .iter()
                .filter_map(|(field, flag)| match flag {
                    1 => Some(field.clone()),
                    -1 => Some(format!("-{field}")),
                    _ => None,
                })
                .collect(),
            Self::Spec(spec) => spec.split_whitespace().map(str::to_owned).collect(),
        }
    }

    #[must_use]
    pub fn selection(&self) -> Option<FieldSelection> {
        FieldSelection::classify(&self.normalize())
    }
}

impl From<Vec<&str>> for Projection {
    fn from(fields: Vec<&str>) -> Self {
        Self::Fields(fields.into_iter().map(str::to_owned).collect())
    }
}

impl From<&str> for Projection {
    fn from(spec: &str) -> Self {
        Self::Spec(spec.to_owned())
    }
}

/// Normalized selection: inclusion or exclusion list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSelection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl FieldSelection {
    /// Classifies normalized fields.
    ///
    /// Exclusion-only input yields `Exclude`; any inclusion makes the whole
    /// selection an inclusion list and the `-` entries are ignored. Empty
    /// input yields `None`.
    #[must_use]
    pub fn classify(fields: &[String]) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        if fields.iter().all(|f| f.starts_with('-')) {
            return Some(Self::Exclude(
                fields
                    .iter()
                    .map(|f| f.trim_start_matches('-').to_owned())
                    .collect(),
            ));
        }
        Some(Self::Include(
            fields
                .iter()
                .filter(|f| !f.starts_with('-'))
                .cloned()
                .collect(),
        ))
    }

    /// Applies the selection to a candidate field list.
    ///
    /// Inclusion keeps the caller's order; exclusion keeps the candidate order.
    #[must_use]
    pub fn apply(&self, candidates: &[String]) -> Vec<String> {
        match self {
            Self::Include(wanted) => wanted
                .iter()
                .filter(|w| candidates.contains(w))
                .cloned()
                .collect(),
            Self::Exclude(unwanted) => candidates
                .iter()
                .filter(|c| !unwanted.contains(c))
                .cloned()
                .collect(),
        }
    }
}
