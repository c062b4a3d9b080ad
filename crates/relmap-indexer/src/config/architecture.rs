//! Architecture config loader (TOML or YAML)

use std::path::Path;

use relmap_core::{ArchitectureConfig, EngineError, Result};

/// Read and validate an architecture config. The format is chosen by
/// extension: `.yml`/`.yaml` are YAML, anything else is TOML.
pub fn load_architecture_config(path: &Path) -> Result<ArchitectureConfig> {
    if !path.is_file() {
        return Err(EngineError::not_found("architecture config", path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yml") | Some("yaml") => parse_yaml(&content),
        _ => parse_toml(&content),
    }
    .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;

    config.validate()?;
    tracing::debug!(
        "Loaded architecture config with {} layers from {}",
        config.layers.len(),
        path.display()
    );
    Ok(config)
}

fn parse_toml(content: &str) -> std::result::Result<ArchitectureConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

fn parse_yaml(content: &str) -> std::result::Result<ArchitectureConfig, String> {
    serde_yaml::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relmap_core::test_utils::create_repo_with_structure;

    #[test]
    fn loads_yaml() {
        let repo = create_repo_with_structure(&[(
            "arch.yaml",
            r#"
layers:
  - name: api
    patterns: ["app/api/**"]
  - name: domain
    patterns: ["app/domain/**"]
allowed:
  api: [domain]
exemptions: ["app/legacy/**"]
"#,
        )]);
        let config = load_architecture_config(&repo.path().join("arch.yaml")).unwrap();
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.layers[0].name, "api");
        assert_eq!(config.allowed["api"], vec!["domain"]);
        assert_eq!(config.max_cross_layer_edges, 10);
    }

    #[test]
    fn loads_toml() {
        let repo = create_repo_with_structure(&[(
            "arch.toml",
            r#"
max_cross_layer_edges = 3

[[layers]]
name = "ui"
patterns = ["ui/**"]

[[layers]]
name = "core"
patterns = ["core/**"]

[allowed]
ui = ["core"]
"#,
        )]);
        let config = load_architecture_config(&repo.path().join("arch.toml")).unwrap();
        assert_eq!(config.max_cross_layer_edges, 3);
        assert_eq!(config.layers[1].patterns, vec!["core/**"]);
    }

    #[test]
    fn rejects_undeclared_layer() {
        let repo = create_repo_with_structure(&[(
            "arch.yml",
            "layers:\n  - name: api\n    patterns: [\"api/**\"]\nallowed:\n  api: [infra]\n",
        )]);
        let err = load_architecture_config(&repo.path().join("arch.yml")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_architecture_config(Path::new("/nonexistent/arch.toml")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
