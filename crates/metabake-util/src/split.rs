pub fn split_filter_empty<'a>(input: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    input.split(separator).filter(|v| !v.is_empty())
}

/// Split a `:`-separated search path, dropping empty entries.
pub fn split_search_path(path: &str) -> impl Iterator<Item = &str> {
    split_filter_empty(path, ":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filter_empty() {
        let parts: Vec<_> = split_filter_empty("a::b:", ":").collect();
        assert_eq!(parts, vec!["a", "b"]);
    }

    #[test]
    fn search_path() {
        let parts: Vec<_> = split_search_path(":/a/b::/c").collect();
        assert_eq!(parts, vec!["/a/b", "/c"]);
    }
}
