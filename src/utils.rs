/// Joins the non-empty path components into an absolute request path.
///
/// ```
/// use searchcake::make_path;
///
/// assert_eq!(make_path(["tweets", "", "_search"]), "/tweets/_search");
/// assert_eq!(make_path::<_, &str>([]), "/");
/// ```
pub fn make_path<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = String::new();
    for component in components {
        let component = component.as_ref();
        if component.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(component);
    }

    if path.is_empty() {
        path.push('/');
    }

    path
}

/// Comma joins a list of names for use as a single path component.
pub(crate) fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_path() {
        assert_eq!(make_path(["tweets", "tweet", "1"]), "/tweets/tweet/1");
        assert_eq!(make_path(["", "_cluster", "health", ""]), "/_cluster/health");
        assert_eq!(make_path(vec!["a,b".to_string(), "_refresh".to_string()]), "/a,b/_refresh");
        assert_eq!(make_path::<_, &str>([]), "/");
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(&["a", "b"]), "a,b");
        assert_eq!(join_names(&["a", ""]), "a");
        assert_eq!(join_names::<&str>(&[]), "");
    }
}
