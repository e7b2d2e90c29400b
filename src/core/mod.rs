// Resource definition and the generic controller serving it

pub mod controller;
pub mod descriptor;
pub mod transformer;

// Re-export commonly used items
pub use controller::ApiController;
pub use descriptor::{
    DescriptorError, QueryHook, ResourceDescriptor, ResourceDescriptorBuilder, column_kind_of,
};
pub use transformer::{ModelTransformer, Transformer};
