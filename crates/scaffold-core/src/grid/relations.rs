/// Relation paths implied by a dotted field key, parents first. The last
/// segment is the attribute itself: `author.profile.name` gives `author` and
/// `author.profile`.
pub fn relation_paths(field: &str) -> Vec<String> {
    let segments = field.split('.').collect::<Vec<_>>();
    (1..segments.len()).map(|depth| segments[..depth].join(".")).collect()
}

/// Path of an EAV relation, nested under the deepest relation of the field.
pub fn eav_path(field: &str, eav: &str) -> String {
    match field.rsplit_once('.') {
        Some((parent, _)) => format!("{parent}.{eav}"),
        None => eav.to_string(),
    }
}

/// Attribute name of a dotted key and the relation path holding it.
pub fn split_field(field: &str) -> (Option<&str>, &str) {
    match field.rsplit_once('.') {
        Some((relation, attribute)) => (Some(relation), attribute),
        None => (None, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progressive_paths() {
        assert_eq!(relation_paths("author.profile.name"), vec!["author", "author.profile"]);
        assert!(relation_paths("name").is_empty());
    }

    #[test]
    fn eav_nests_under_deepest_relation() {
        assert_eq!(eav_path("author.profile.name", "meta"), "author.profile.meta");
        assert_eq!(eav_path("name", "meta"), "meta");
    }

    #[test]
    fn split_keeps_relation_prefix() {
        assert_eq!(split_field("author.profile.name"), (Some("author.profile"), "name"));
        assert_eq!(split_field("id"), (None, "id"));
    }
}
