//! Lexical path utilities.
//!
//! Nothing here touches the filesystem: symlinks are not resolved, which
//! keeps rendered paths stable for identical invocations.

use std::path::{Component, Path, PathBuf};

/// Removes `.` components and folds `..` into the preceding component.
///
/// # Example
///
/// ```
/// use nobadfuncs_core::utils::paths::normalize;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize(Path::new("/w/inner/../foo.go")), PathBuf::from("/w/foo.go"));
/// assert_eq!(normalize(Path::new("./a/./b")), PathBuf::from("a/b"));
/// ```
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

/// Expresses `path` relative to `base`, using `..` segments when `path`
/// lives outside `base`.
///
/// If exactly one of the two paths is absolute there is no lexical
/// relation between them and the normalized `path` is returned unchanged.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    if path.is_absolute() != base.is_absolute() {
        return path;
    }

    let p: Vec<Component<'_>> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let b: Vec<Component<'_>> = base
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = p.iter().zip(&b).take_while(|(x, y)| x == y).count();

    let mut out = PathBuf::new();
    for _ in common..b.len() {
        out.push("..");
    }
    for comp in &p[common..] {
        out.push(comp);
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_parent_dirs() {
        assert_eq!(normalize(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new(".")), PathBuf::from("."));
    }

    #[test]
    fn relative_inside_base() {
        assert_eq!(
            relative_to(Path::new("/w/pkg/foo.go"), Path::new("/w")),
            PathBuf::from("pkg/foo.go")
        );
    }

    #[test]
    fn relative_to_sibling_and_ancestor() {
        assert_eq!(
            relative_to(Path::new("/w/foo.go"), Path::new("/w/inner")),
            PathBuf::from("../foo.go")
        );
        assert_eq!(
            relative_to(Path::new("/w/a/x.go"), Path::new("/w/b/c")),
            PathBuf::from("../../a/x.go")
        );
    }

    #[test]
    fn relative_same_dir_is_dot() {
        assert_eq!(relative_to(Path::new("/w"), Path::new("/w/")), PathBuf::from("."));
    }

    #[test]
    fn mixed_absolute_and_relative_returns_path() {
        assert_eq!(
            relative_to(Path::new("a/../b.go"), Path::new("/w")),
            PathBuf::from("b.go")
        );
    }
}
