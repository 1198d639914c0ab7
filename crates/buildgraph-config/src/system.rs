//! Compiler configuration parsing.

use crate::variables::DEFAULT_SYSTEM_NAME;
use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};

/// Image used for the implicit clone step unless a definition overrides it.
pub const DEFAULT_CLONE_IMAGE: &str = "docker.io/woodpeckerci/plugin-git:2";

/// Platform assigned to pipelines that do not request one.
pub const DEFAULT_PLATFORM: &str = "linux/amd64";

/// Installation-wide settings for the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Image of the implicit clone step.
    pub clone_image: String,
    /// Platform for pipelines without a `platform` node.
    pub default_platform: String,
    /// Reported as `CI_SYSTEM_NAME`.
    pub system_name: String,
    /// Base URL of the CI server, reported as `CI_SYSTEM_LINK`.
    pub system_link: Option<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            clone_image: DEFAULT_CLONE_IMAGE.to_string(),
            default_platform: DEFAULT_PLATFORM.to_string(),
            system_name: DEFAULT_SYSTEM_NAME.to_string(),
            system_link: None,
        }
    }
}

/// Parse compiler configuration from KDL text.
///
/// ```kdl
/// clone-image "docker.io/woodpeckerci/plugin-git:2"
/// platform "linux/arm64"
/// system name="ci" link="https://ci.example.com"
/// ```
pub fn parse_compiler_config(kdl: &str) -> ConfigResult<CompilerConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = CompilerConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "clone-image" | "clone_image" => {
                config.clone_image = require_string(node)?;
            }
            "platform" | "default-platform" => {
                config.default_platform = require_string(node)?;
            }
            "system" => {
                if let Some(name) = get_string_prop(node, "name") {
                    config.system_name = name;
                }
                if let Some(link) = get_string_prop(node, "link") {
                    url::Url::parse(&link).map_err(|e| ConfigError::InvalidValue {
                        field: "system link".to_string(),
                        message: e.to_string(),
                    })?;
                    config.system_link = Some(link);
                }
            }
            _ => {}
        }
    }

    Ok(config)
}

fn require_string(node: &KdlNode) -> ConfigResult<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::MissingField(node.name().value().to_string()))
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_compiler_config("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.default_platform, "linux/amd64");
    }

    #[test]
    fn test_parse_full_config() {
        let kdl = r#"
            clone-image "registry.local/git:1"
            platform "linux/arm64"
            system name="ci" link="https://ci.example.com"
        "#;

        let config = parse_compiler_config(kdl).unwrap();
        assert_eq!(config.clone_image, "registry.local/git:1");
        assert_eq!(config.default_platform, "linux/arm64");
        assert_eq!(config.system_name, "ci");
        assert_eq!(config.system_link.as_deref(), Some("https://ci.example.com"));
    }

    #[test]
    fn test_invalid_link_rejected() {
        let result = parse_compiler_config(r#"system link="not a url""#);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_empty_clone_image_rejected() {
        let result = parse_compiler_config(r#"clone-image """#);
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }
}
