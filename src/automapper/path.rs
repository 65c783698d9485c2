//! Mapping path segments
//!
//! A mapping path is a list of strings. Besides field and relationship names
//! it carries two marker kinds:
//! - tree-rank markers, `$` followed by the capitalized rank (`$Kingdom`)
//! - to-many reference markers, `#` followed by a 1-based index (`#2`)

/// Ordered list of path segments from the base table to a field
pub type MappingPath = Vec<String>;

pub const TREE_RANK_PREFIX: &str = "$";
pub const REFERENCE_ITEM_PREFIX: &str = "#";

/// Typed view of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Field or relationship name
    Field(&'a str),
    /// Rank name without the prefix
    TreeRank(&'a str),
    /// 1-based reference index
    ToManyIndex(usize),
}

impl<'a> PathSegment<'a> {
    pub fn parse(segment: &'a str) -> Self {
        if let Some(rank) = segment.strip_prefix(TREE_RANK_PREFIX) {
            return PathSegment::TreeRank(rank);
        }
        match get_index_from_reference_item(segment) {
            Some(index) => PathSegment::ToManyIndex(index),
            None => PathSegment::Field(segment),
        }
    }

    pub fn is_marker(&self) -> bool {
        !matches!(self, PathSegment::Field(_))
    }
}

/// Format a rank name as a tree-rank marker, capitalizing its first letter
pub fn format_tree_rank(rank_name: &str) -> String {
    let mut chars = rank_name.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}{}",
            TREE_RANK_PREFIX,
            first.to_uppercase(),
            chars.as_str()
        ),
        None => TREE_RANK_PREFIX.to_string(),
    }
}

pub fn format_reference_item(index: usize) -> String {
    format!("{}{}", REFERENCE_ITEM_PREFIX, index)
}

pub fn value_is_tree_rank(value: &str) -> bool {
    value.starts_with(TREE_RANK_PREFIX)
}

pub fn value_is_reference_item(value: &str) -> bool {
    get_index_from_reference_item(value).is_some()
}

pub fn get_index_from_reference_item(value: &str) -> Option<usize> {
    value
        .strip_prefix(REFERENCE_ITEM_PREFIX)
        .and_then(|index| index.parse::<usize>().ok())
        .filter(|index| *index > 0)
}

/// Number of segments that are neither rank nor reference markers
pub fn relationship_depth(path: &[String]) -> usize {
    path.iter()
        .filter(|segment| !PathSegment::parse(segment).is_marker())
        .count()
}

pub fn strip_reference_items(path: &[String]) -> Vec<String> {
    path.iter()
        .filter(|segment| !value_is_reference_item(segment))
        .cloned()
        .collect()
}

pub fn has_reference_items(path: &[String]) -> bool {
    path.iter().any(|segment| value_is_reference_item(segment))
}

/// Last non-marker segment, i.e. the relationship that led to the current table
pub fn last_field_segment(path: &[String]) -> Option<&str> {
    path.iter()
        .rev()
        .map(String::as_str)
        .find(|segment| !PathSegment::parse(segment).is_marker())
}

pub fn mapping_path_to_string(path: &[String]) -> String {
    path.join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> MappingPath {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(PathSegment::parse("$Kingdom"), PathSegment::TreeRank("Kingdom"));
        assert_eq!(PathSegment::parse("#3"), PathSegment::ToManyIndex(3));
        assert_eq!(PathSegment::parse("agent"), PathSegment::Field("agent"));
        // not a valid index, so it is a plain name
        assert_eq!(PathSegment::parse("#0"), PathSegment::Field("#0"));
        assert_eq!(PathSegment::parse("#x"), PathSegment::Field("#x"));
    }

    #[test]
    fn test_format_markers() {
        assert_eq!(format_tree_rank("kingdom"), "$Kingdom");
        assert_eq!(format_tree_rank("Species"), "$Species");
        assert_eq!(format_reference_item(2), "#2");
        assert_eq!(get_index_from_reference_item("#12"), Some(12));
        assert!(value_is_tree_rank("$Genus"));
        assert!(!value_is_reference_item("determinations"));
    }

    #[test]
    fn test_relationship_depth() {
        let p = path(&["determinations", "#1", "taxon", "$Species", "name"]);
        assert_eq!(relationship_depth(&p), 3);
        assert!(has_reference_items(&p));
        assert_eq!(
            strip_reference_items(&p),
            path(&["determinations", "taxon", "$Species", "name"])
        );
        assert!(!has_reference_items(&path(&["cataloger", "lastname"])));
    }

    #[test]
    fn test_last_field_segment() {
        let p = path(&["collectingevent", "collectors", "#1"]);
        assert_eq!(last_field_segment(&p), Some("collectors"));
        assert_eq!(last_field_segment(&[]), None);
        assert_eq!(
            mapping_path_to_string(&p),
            "collectingevent > collectors > #1"
        );
    }
}
