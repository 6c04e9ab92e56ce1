//! Object model
//!
//! Structure:
//! - `object.rs` - `ResourceObject`, a read-only JSON tree for one cluster object
//! - `collection.rs` - creation-time ordered `ObjectCollection`
//! - `mapping.rs` - resolved `ApiResourceMapping`
//! - `selector.rs` - label selector matching for in-process filtering

pub mod collection;
pub mod mapping;
pub mod object;
pub mod selector;

pub use collection::ObjectCollection;
pub use mapping::ApiResourceMapping;
pub use object::{ObjectIdentity, OwnerReference, ResourceObject};
pub use selector::LabelSelector;
