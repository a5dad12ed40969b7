//! Composition of GraphQL operations from reusable fragments, checking of variables against the
//! operations’ declarations, and decoding of polymorphic results.
//!
//! Nothing in here talks to the network; see [crate::github_api] for executing operations.

pub mod document;
pub mod polymorphic;
pub mod registry;
pub mod variables;

pub use document::{OperationKind, VariableDefinition};
pub(crate) use polymorphic::deserialize_polymorphic;
pub use polymorphic::{resolve_polymorphic, Polymorphic, TYPENAME_FIELD};
pub use registry::{ComposedOperation, Registry};
pub use variables::{TypeRef, Variables};
