// Data access: lowering composed predicates into sea-orm conditions
// and loading declared includes

pub mod eager;
pub mod scope;

// Re-export commonly used items
pub use eager::{Included, load_includes};
pub use scope::{ColumnKindLookup, ScopeGraph, ScopeRelation};
