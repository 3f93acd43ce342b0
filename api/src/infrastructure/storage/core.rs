use std::path::{Component, Path, PathBuf};

/// Normalises a storage-relative path to `a/b/c` form, rejecting anything
/// that could step outside the storage root.
pub fn normalize_relative(path: &str) -> anyhow::Result<String> {
    let unified = path.replace('\\', "/");
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => continue,
            _ => anyhow::bail!("forbidden"),
        }
    }
    if parts.is_empty() {
        anyhow::bail!("forbidden");
    }
    Ok(parts.join("/"))
}

pub fn normalize_prefix(root: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for comp in root.components() {
        if let Component::Normal(os) = comp {
            let s = os.to_string_lossy();
            if !s.is_empty() && s != "." {
                parts.push(s.replace('\\', "/"));
            }
        }
    }
    parts.join("/")
}

pub fn absolute_under(root: &Path, relative: &str) -> anyhow::Result<PathBuf> {
    let rel = normalize_relative(relative)?;
    let full = root.join(rel);
    if !full.starts_with(root) {
        anyhow::bail!("forbidden");
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_relative_paths() {
        assert_eq!(normalize_relative("users/a.png").unwrap(), "users/a.png");
        assert_eq!(normalize_relative("./users//a.png").unwrap(), "users/a.png");
        assert_eq!(normalize_relative("users\\a.png").unwrap(), "users/a.png");
    }

    #[test]
    fn rejects_traversal_and_absolute_paths() {
        assert!(normalize_relative("../secret").is_err());
        assert!(normalize_relative("users/../../secret").is_err());
        assert!(normalize_relative("/etc/passwd").is_err());
        assert!(normalize_relative("").is_err());
        assert!(normalize_relative(".").is_err());
    }

    #[test]
    fn prefix_drops_dot_components() {
        assert_eq!(normalize_prefix(Path::new("./uploads")), "uploads");
        assert_eq!(normalize_prefix(Path::new("data/uploads/")), "data/uploads");
        assert_eq!(normalize_prefix(Path::new(".")), "");
    }
}
