use std::path::{Path, PathBuf};

/// Overrides the directory shaders and meshes are loaded from.
pub const RESOURCE_DIR_VAR: &str = "RENGPU_RESOURCE_DIR";

pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "rengpu".to_string(),
            width: 800,
            height: 600,
        }
    }
}

pub fn resource_dir() -> PathBuf {
    resource_dir_from(std::env::var_os(RESOURCE_DIR_VAR).map(PathBuf::from))
}

pub fn resource_path(name: impl AsRef<Path>) -> PathBuf {
    resource_dir().join(name)
}

fn resource_dir_from(overridden: Option<PathBuf>) -> PathBuf {
    match overridden {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resource_dir() {
        let dir = resource_dir_from(None);
        assert!(dir.ends_with("assets"));
        assert!(dir.join("shaders").join("triangle.wgsl").exists());
    }

    #[test]
    fn test_overridden_resource_dir() {
        let dir = resource_dir_from(Some(PathBuf::from("/tmp/resources")));
        assert_eq!(dir, PathBuf::from("/tmp/resources"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let dir = resource_dir_from(Some(PathBuf::new()));
        assert!(dir.ends_with("assets"));
    }
}
