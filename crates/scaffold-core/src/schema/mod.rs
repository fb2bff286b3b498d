pub mod declaration;
pub mod descriptor;
pub mod fieldsets;
pub mod registry;

pub use declaration::{Declaration, FieldType, PropertyEntry, PropertyList, Purpose};
pub use descriptor::{Describe, ModelSchema};
pub use fieldsets::{Fieldset, FieldsetList, ResolvedFieldsets};
pub use registry::{ResolvedPropertySet, SchemaRegistry};
