//! Configuration for the ACL engine.

use serde::Deserialize;

/// Engine configuration.
///
/// Seeds the registry root options; per-model options may override
/// `permission_field` and `list_hard_limit`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AclConfig {
    /// Field under which computed document permissions are attached.
    pub permission_field: String,

    /// Name of the route parameter carrying the document id.
    pub id_param: String,

    /// Upper bound on page size for list operations.
    pub list_hard_limit: u64,

    /// Prefix under which model routes are mounted.
    pub api_prefix: String,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            permission_field: "_permissions".to_owned(),
            id_param: "id".to_owned(),
            list_hard_limit: 1000,
            api_prefix: "/api".to_owned(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let cfg: AclConfig = serde_saphyr::from_str("{}").unwrap();
        assert_eq!(cfg.permission_field, "_permissions");
        assert_eq!(cfg.id_param, "id");
        assert_eq!(cfg.list_hard_limit, 1000);
        assert_eq!(cfg.api_prefix, "/api");
    }

    #[test]
    fn partial_yaml_overrides_selected_fields() {
        let yaml = r"
id_param: userId
list_hard_limit: 50
";
        let cfg: AclConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(cfg.id_param, "userId");
        assert_eq!(cfg.list_hard_limit, 50);
        assert_eq!(cfg.permission_field, "_permissions");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<AclConfig, _> = serde_saphyr::from_str("hard_limit: 5");
        assert!(result.is_err());
    }
}
