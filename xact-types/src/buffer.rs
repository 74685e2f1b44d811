//! The value representation backing an edge (component H, §4.H).
//!
//! `spec.md` deliberately scopes the full data-dictionary/atomic-type
//! metadata service out of this crate ("we consume its contract only").
//! What we implement here is the contract's *shape*: a small, fixed set of
//! atomic leaf types plus arbitrarily nested compound ("opaque map") types,
//! each with a well-defined zero value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The atomic (leaf) data types the allocator knows how to zero-construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Str,
    Bytes,
}

impl AtomicType {
    pub fn zeroed(self) -> Buffer {
        match self {
            AtomicType::Bool => Buffer::Bool(false),
            AtomicType::Int32 => Buffer::I32(0),
            AtomicType::Int64 => Buffer::I64(0),
            AtomicType::Float32 => Buffer::F32(0.0),
            AtomicType::Float64 => Buffer::F64(0.0),
            AtomicType::Str => Buffer::Str(String::new()),
            AtomicType::Bytes => Buffer::Bytes(Vec::new()),
        }
    }

    pub fn from_alias(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(AtomicType::Bool),
            "int32" => Some(AtomicType::Int32),
            "int64" => Some(AtomicType::Int64),
            "float32" => Some(AtomicType::Float32),
            "float64" => Some(AtomicType::Float64),
            "str" | "string" => Some(AtomicType::Str),
            "bytes" => Some(AtomicType::Bytes),
            _ => None,
        }
    }
}

/// A freshly allocated, zero-initialised buffer backing an edge or a
/// node's `state`. Leaves are atomic values; `Map` nests further buffers,
/// keyed the same way the config's compound data type declared its
/// fields, so `buffer.map["output"]` reads the way `outputs.output` does
/// in the spec's path syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Buffer {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Map(IndexMap<String, Buffer>),
}

impl Buffer {
    pub fn empty_map() -> Self {
        Buffer::Map(IndexMap::new())
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Buffer>> {
        match self {
            Buffer::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Buffer>> {
        match self {
            Buffer::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Buffer::I32(v) => Some(*v as i64),
            Buffer::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Buffer::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

/// A data type declaration in `cfg.data`. Declarations may reference one
/// another; the denormaliser resolves them with a greedy fixed-point pass
/// (Design Notes, "Cyclic graph references in config").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataTypeSpec {
    /// `"float32"`, `"opaque_map"`, etc. `"opaque_map"` resolves to an
    /// empty, untyped `Buffer::Map` rather than a fixed atomic type.
    Alias(String),
    /// A named set of fields, each referencing another data type id.
    Compound(IndexMap<String, String>),
}
