//! Path comparison helpers shared by correlation and project attachment.
//!
//! Comparisons are on strings, component-aware: `/proj` is a prefix of
//! `/proj/sub` but not of `/project`.

/// Strip trailing separators, keeping a lone root intact.
pub fn normalize_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..1]
    } else {
        trimmed
    }
}

/// Returns true if `prefix` equals `path` or is one of its ancestor directories.
pub fn is_path_prefix(prefix: &str, path: &str) -> bool {
    let prefix = normalize_dir(prefix);
    let path = normalize_dir(path);
    if prefix.is_empty() || path.is_empty() {
        return false;
    }
    if prefix == path {
        return true;
    }
    if prefix == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.starts_with('/') || rest.starts_with('\\'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("/proj/"), "/proj");
        assert_eq!(normalize_dir("/proj"), "/proj");
        assert_eq!(normalize_dir("/"), "/");
        assert_eq!(normalize_dir(""), "");
    }

    #[test]
    fn test_prefix_component_aware() {
        assert!(is_path_prefix("/proj", "/proj"));
        assert!(is_path_prefix("/proj", "/proj/sub"));
        assert!(is_path_prefix("/proj/", "/proj/sub"));
        assert!(!is_path_prefix("/proj", "/project"));
        assert!(!is_path_prefix("/proj/sub", "/proj"));
        assert!(is_path_prefix("/", "/anything"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!is_path_prefix("", "/proj"));
        assert!(!is_path_prefix("/proj", ""));
    }
}
