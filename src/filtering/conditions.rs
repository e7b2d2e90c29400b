use std::collections::HashMap;

use super::field_path::group_by_scope;
use super::predicate::{
    Combinator, Comparison, FilterValue, Predicate, PredicateGroup, PredicateSet, QueryField,
};
use crate::errors::ApiError;

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// A filter parameter that is absent or empty contributes nothing.
///
/// Only the empty string counts as unset; `"0"` is a real value.
fn is_unset(raw: &str) -> bool {
    raw.is_empty()
}

/// Turn one raw parameter into a comparison: a single value is an equality,
/// a comma-separated list is set membership.
fn parse_comparison(field: &QueryField, raw: &str) -> Result<Comparison, ApiError> {
    if raw.len() > MAX_FIELD_VALUE_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Filter value for '{}' is too long",
            field.path
        )));
    }

    let mut values: Vec<FilterValue> = raw
        .split(',')
        .map(|part| {
            field.kind.parse(part).ok_or_else(|| {
                ApiError::bad_request(format!("Invalid value '{part}' for filter '{}'", field.path))
            })
        })
        .collect::<Result<_, _>>()?;

    Ok(if values.len() == 1 {
        Comparison::Equals(values.remove(0))
    } else {
        Comparison::In(values)
    })
}

/// Build the filter block for a list request.
///
/// Each declared filterable field is read from `params` under its transport
/// key (dots replaced by underscores). Fields are grouped per scope like the
/// search block, but everything is conjunctive: every condition inside a group
/// and every group must hold.
///
/// Returns `Ok(None)` when no filter parameter is set.
///
/// # Errors
///
/// `ApiError::BadRequest` when a value does not fit the column it filters.
pub fn compose_filters<S: std::hash::BuildHasher>(
    fields: &[QueryField],
    params: &HashMap<String, String, S>,
) -> Result<Option<PredicateSet>, ApiError> {
    let mut active = Vec::new();
    for field in fields {
        let raw = params
            .get(&field.path.transport_key())
            .map_or("", String::as_str);
        if is_unset(raw) {
            continue;
        }
        active.push((&field.path, (field.kind, parse_comparison(field, raw)?)));
    }

    if active.is_empty() {
        return Ok(None);
    }

    let mut set = PredicateSet::new(Combinator::All);
    for (scope, members) in group_by_scope(active) {
        set.groups.push(PredicateGroup {
            scope: scope.clone(),
            combinator: Combinator::All,
            predicates: members
                .into_iter()
                .map(|(field, (kind, comparison))| Predicate {
                    field: field.to_string(),
                    kind,
                    comparison,
                })
                .collect(),
        });
    }

    Ok(Some(set))
}
