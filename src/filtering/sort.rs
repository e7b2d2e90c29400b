use sea_orm::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Self::Asc,
            Direction::Desc => Self::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: Direction,
}

/// Ordered sort keys; earlier entries take precedence.
///
/// Repeated fields are kept and emitted in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(Vec<SortField>);

impl SortSpec {
    #[must_use]
    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a SortSpec {
    type Item = &'a SortField;
    type IntoIter = std::slice::Iter<'a, SortField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse a sort parameter such as `-created_at,name`.
///
/// Whitespace is stripped, the list is split on commas and each token is read
/// as `[-]field`. A single leading minus selects descending order; any other
/// minus is part of the field name, so `-created-at` sorts `created-at`
/// descending. Empty tokens are skipped.
///
/// No allow-list is applied here; callers resolve each field against the
/// sortable columns of the resource before touching the query.
#[must_use]
pub fn parse_sort(raw: &str) -> SortSpec {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    SortSpec(
        compact
            .split(',')
            .filter_map(|token| {
                let (field, direction) = match token.strip_prefix('-') {
                    Some(rest) => (rest, Direction::Desc),
                    None => (token, Direction::Asc),
                };
                (!field.is_empty()).then(|| SortField {
                    field: field.to_string(),
                    direction,
                })
            })
            .collect(),
    )
}
