use super::field_path::group_by_scope;
use super::predicate::{Combinator, Comparison, Predicate, PredicateGroup, PredicateSet, QueryField};

// Basic safety limits
const MAX_SEARCH_QUERY_LENGTH: usize = 10_000;

/// Escape LIKE wildcards so user text only ever matches literally.
/// Escapes: % (match any) and _ (match single char)
pub(crate) fn escape_like_wildcards(input: &str) -> String {
    // Backslash first, it is the escape character
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build the free-text search block for a list request.
///
/// Every searchable field gets a `LIKE %text%` comparison. Fields are grouped
/// per scope: direct fields form one OR group on the base table, each related
/// scope forms one OR group evaluated inside that scope. The groups are ORed
/// together, so a record matches when any searchable field anywhere contains
/// the text. The caller ANDs the whole block onto its other conditions.
///
/// Returns `None` when the text is empty or nothing is searchable, in which
/// case the query must be left untouched.
#[must_use]
pub fn compose_search(text: &str, fields: &[QueryField]) -> Option<PredicateSet> {
    if text.is_empty() || fields.is_empty() {
        return None;
    }

    let needle: String = text.chars().take(MAX_SEARCH_QUERY_LENGTH).collect();

    let mut set = PredicateSet::new(Combinator::Any);
    for (scope, members) in group_by_scope(fields.iter().map(|f| (&f.path, f.kind))) {
        set.groups.push(PredicateGroup {
            scope: scope.clone(),
            combinator: Combinator::Any,
            predicates: members
                .into_iter()
                .map(|(field, kind)| Predicate {
                    field: field.to_string(),
                    kind,
                    comparison: Comparison::Contains(needle.clone()),
                })
                .collect(),
        });
    }

    Some(set)
}
