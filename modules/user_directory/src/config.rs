use serde::{Deserialize, Serialize};

/// Configuration for the user_directory module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDirectoryConfig {
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for UserDirectoryConfig {
    fn default() -> Self {
        Self {
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_max_name_length() -> usize {
    255
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: UserDirectoryConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg, UserDirectoryConfig::default());
        assert_eq!(cfg.max_name_length, 255);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<UserDirectoryConfig, _> =
            serde_json::from_value(serde_json::json!({ "page_size": 10 }));
        assert!(res.is_err());
    }
}
