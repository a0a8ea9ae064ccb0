//! Resource path normalization
//!
//! Paths arrive from the model, the backend, and the editor in slightly
//! different spellings. Comparisons go through [`normalize_resource_path`].

/// Canonical spelling of a resource path
///
/// Backslashes become `/`, a leading `./` is removed, and runs of `/` collapse
/// to one.
#[must_use]
pub fn normalize_resource_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");

    let mut rest = unified.as_str();
    if let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped.trim_start_matches('/');
    }

    let mut normalized = String::with_capacity(rest.len());
    let mut previous_slash = false;
    for ch in rest.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    normalized
}

/// Whether two paths name the same resource
///
/// Empty paths never match anything.
#[must_use]
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = normalize_resource_path(a);
    !a.is_empty() && a == normalize_resource_path(b)
}

/// Last segment of a path, for display
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_resource_path("src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_resource_path("./src//a///b.rs"), "src/a/b.rs");
        assert_eq!(normalize_resource_path(".//x"), "x");
        assert_eq!(normalize_resource_path("/abs//p"), "/abs/p");
        assert_eq!(normalize_resource_path(""), "");
    }

    #[test]
    fn test_paths_match() {
        assert!(paths_match("./a/b.txt", "a\\b.txt"));
        assert!(!paths_match("a.txt", "b.txt"));
        assert!(!paths_match("", ""));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("src/dir/main.rs"), "main.rs");
        assert_eq!(file_name("main.rs"), "main.rs");
        assert_eq!(file_name("a\\b.txt"), "b.txt");
    }
}
