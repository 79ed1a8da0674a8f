//! Reserved node names and type tags.

/// Names of the structural nodes and attributes written by the controller.
///
/// With value encapsulation disabled, user fields must not use these names.
pub mod node_names {
    pub const VALUE: &str = "value";
    pub const TYPE: &str = "type";
    pub const COUNT: &str = "count";
    pub const SIZE: &str = "size";
    pub const VALUE_TYPE: &str = "value_type";
    pub const KEY_TYPE: &str = "key_type";
    pub const ID: &str = "id";
    pub const INFO: &str = "info";
    pub const VERSION: &str = "version";
    pub const FLAGS: &str = "flags";
    pub const SHARED_OBJECTS: &str = "shared_objects";
    /// Prefix of the nodes listed under [`SHARED_OBJECTS`].
    pub const SHARED_PREFIX: &str = "sh";
    /// Prefix of positionally named children (`p0`, `p1`, ...).
    pub const POSITIONAL_PREFIX: &str = "p";
    /// Name of a captured root when none is given.
    pub const SNAPSHOT: &str = "snapshot";
}

/// Type names of the non-scalar parameter variants.
pub mod type_names {
    /// Null pointer marker.
    pub const VOID: &str = "void";
    pub const REFLECTIVE: &str = "reflective";
    pub const ARRAY: &str = "array";
    pub const HASHMAP: &str = "hashmap";
    pub const MAP: &str = "map";
    pub const PAIR: &str = "pair";
    pub const BINARY: &str = "binary";
    pub const RAW_PTR: &str = "raw_ptr";
    pub const UNIQUE_PTR: &str = "unique_ptr";
    pub const SHARED_PTR: &str = "shared_ptr";
    pub const WEAK_PTR: &str = "weak_ptr";
}

/// Name of the `index`-th positional child: `p0`, `p1`, ...
pub(crate) fn positional(index: usize) -> alloc::string::String {
    alloc::format!("{}{index}", node_names::POSITIONAL_PREFIX)
}

/// Name of the `index`-th node under [`node_names::SHARED_OBJECTS`].
pub(crate) fn shared_object(index: usize) -> alloc::string::String {
    alloc::format!("{}{index}", node_names::SHARED_PREFIX)
}
