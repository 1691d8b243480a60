//! Controller manifests on disk
//!
//! `<root>/<ns>/<area>/controllers/<name>.toml` declares module `<ns>/<area>/<name>`:
//!
//! ```toml
//! description = "Blog posts"
//!
//! [actions.getAll]
//! handler = "blog.get_all"
//! roles = ["Guest"]
//! description = "List all posts"
//! ```

use crate::error::RegistryError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};

/// Directory name that marks a folder of controller manifests
pub const CONTROLLERS_DIR: &str = "controllers";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerManifest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actions: BTreeMap<String, ActionManifest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionManifest {
    /// Catalog key of the handler; defaults to the action's route
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ControllerManifest {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, RegistryError> {
        toml::from_str(content).map_err(|e| RegistryError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Whether `path` is a manifest: a `.toml` file directly inside a `controllers` directory
pub fn is_manifest(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
        && path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            == Some(CONTROLLERS_DIR)
}

/// Module path of a manifest relative to the scan root
///
/// The `controllers` directory is dropped and the file stem appended, so
/// `app/blog/controllers/blog.toml` becomes `app/blog/blog`.
pub fn module_path_for(root: &Path, manifest: &Path) -> Option<String> {
    let relative = manifest.strip_prefix(root).ok()?;
    let stem = relative.file_stem()?.to_str()?;
    let parent = relative.parent()?;

    let mut segments: Vec<&str> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => segment.to_str(),
            _ => None,
        })
        .collect();

    if segments.last() != Some(&CONTROLLERS_DIR) {
        return None;
    }
    segments.pop();
    segments.push(stem);

    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_module_path_for_nested_manifest() {
        let root = PathBuf::from("/srv/modules");
        let manifest = root.join("app/blog/controllers/blog.toml");

        assert!(is_manifest(&manifest));
        assert_eq!(
            module_path_for(&root, &manifest).as_deref(),
            Some("app/blog/blog")
        );
    }

    #[test]
    fn test_files_outside_controllers_are_not_manifests() {
        let root = PathBuf::from("/srv/modules");
        let other = root.join("app/blog/repositories/blog.toml");

        assert!(!is_manifest(&other));
        assert_eq!(module_path_for(&root, &other), None);
        assert!(!is_manifest(&root.join("app/blog/controllers/blog.js")));
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = ControllerManifest::parse(
            Path::new("blog.toml"),
            r#"
[actions.getAll]
handler = "blog.get_all"
roles = ["Guest", "Admin"]

[actions.create]
"#,
        )
        .unwrap();

        assert_eq!(manifest.actions.len(), 2);
        assert_eq!(
            manifest.actions["getAll"].handler.as_deref(),
            Some("blog.get_all")
        );
        assert!(manifest.actions["create"].handler.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let err = ControllerManifest::parse(Path::new("x.toml"), "[actions.a\n").unwrap_err();
        assert!(matches!(err, RegistryError::Manifest { .. }));
    }
}
