//! Descriptor tree for program binary layouts.
//!
//! A `TypeNode` is an owned, immutable tree built once from a static program
//! definition and compiled once by [`crate::Codec::new`]. Nodes are never
//! shared between trees and valid trees contain no cycles.

use crate::value::Value;

/// Byte width of a fixed-size unsigned integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W1,
    W2,
    W4,
    W8,
}

impl IntWidth {
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::W1 => 1,
            IntWidth::W2 => 2,
            IntWidth::W4 => 4,
            IntWidth::W8 => 8,
        }
    }

    /// Largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            IntWidth::W8 => u64::MAX,
            w => (1u64 << (w.bytes() * 8)) - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Le,
    Be,
}

/// Length strategy for strings and byte blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    /// Length written as an unsigned integer of the given width (LE).
    Prefixed(IntWidth),
    /// Exactly this many bytes on the wire; shorter text is zero-padded.
    Fixed(usize),
    /// Consume every remaining input byte.
    Remainder,
}

/// Count strategy for maps and other repeated elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Count written as an unsigned integer of the given width (LE).
    Prefixed(IntWidth),
    /// Count written in compact-length (shortvec) form.
    Compact,
    /// Compile-time constant count; nothing on the wire.
    Fixed(usize),
    /// Read pairs until the input is exhausted.
    Remainder,
}

/// Byte-offset adjustment applied before or after a wrapped node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    /// Move the cursor by a signed delta relative to its current position.
    /// Forward moves zero-fill on encode and skip on decode.
    Relative(i64),
    /// Pad to the next multiple of this boundary (zero-fill on encode,
    /// silently skip on decode).
    Padded(usize),
}

/// A named struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub node: TypeNode,
    /// When set, the field is absent from the logical value; this constant
    /// is encoded in its place and decoded values are discarded.
    pub omitted: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, node: TypeNode) -> Self {
        Field {
            name: name.into(),
            node,
            omitted: None,
        }
    }

    pub fn omitted(name: impl Into<String>, node: TypeNode, constant: Value) -> Self {
        Field {
            name: name.into(),
            node,
            omitted: Some(constant),
        }
    }
}

/// Payload shape of one enum variant.
#[derive(Debug, Clone)]
pub enum VariantShape {
    Unit,
    Tuple(Vec<TypeNode>),
    Struct(Vec<Field>),
}

/// A named enum variant; its discriminant is its position in the variant
/// list, written at the enum's declared width.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub shape: VariantShape,
}

impl Variant {
    pub fn unit(name: impl Into<String>) -> Self {
        Variant {
            name: name.into(),
            shape: VariantShape::Unit,
        }
    }

    pub fn tuple(name: impl Into<String>, items: Vec<TypeNode>) -> Self {
        Variant {
            name: name.into(),
            shape: VariantShape::Tuple(items),
        }
    }

    pub fn strukt(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Variant {
            name: name.into(),
            shape: VariantShape::Struct(fields),
        }
    }
}

/// One node of a layout descriptor tree.
#[derive(Debug, Clone)]
pub enum TypeNode {
    /// Fixed-width unsigned integer.
    Num { width: IntWidth, endian: Endian },
    /// UTF-8 text under a length strategy.
    Text(Len),
    /// Raw bytes under a length strategy.
    Bytes(Len),
    /// Ordered heterogeneous sequence, encoded positionally.
    Tuple(Vec<TypeNode>),
    /// Ordered named fields.
    Struct(Vec<Field>),
    /// Tagged union: discriminant at `disc` width, then the variant payload.
    Enum {
        disc: IntWidth,
        variants: Vec<Variant>,
    },
    /// Presence prefix followed conditionally by the payload. With `fixed`,
    /// the absent case still consumes the full payload width as zeros, so
    /// the total size is constant (requires a fixed-size payload).
    Option {
        prefix: IntWidth,
        fixed: bool,
        inner: Box<TypeNode>,
    },
    /// Ordered key/value pairs under a count strategy.
    Map {
        count: Count,
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    /// Cursor adjustment around a wrapped node.
    Offset {
        pre: Option<Adjust>,
        post: Option<Adjust>,
        inner: Box<TypeNode>,
    },
    /// Fixed byte sequence: written on encode, verified on decode, not part
    /// of the logical value (which is `Value::Unit`).
    Const(Vec<u8>),
    /// Constant spliced immediately before the wrapped node.
    HiddenPrefix {
        prefix: Vec<u8>,
        inner: Box<TypeNode>,
    },
    /// Constant spliced immediately after the wrapped node.
    HiddenSuffix {
        suffix: Vec<u8>,
        inner: Box<TypeNode>,
    },
}

impl TypeNode {
    /// Shorthand for the common little-endian integer widths.
    pub fn u8() -> Self {
        TypeNode::Num {
            width: IntWidth::W1,
            endian: Endian::Le,
        }
    }

    pub fn u16_le() -> Self {
        TypeNode::Num {
            width: IntWidth::W2,
            endian: Endian::Le,
        }
    }

    pub fn u32_le() -> Self {
        TypeNode::Num {
            width: IntWidth::W4,
            endian: Endian::Le,
        }
    }

    pub fn u64_le() -> Self {
        TypeNode::Num {
            width: IntWidth::W8,
            endian: Endian::Le,
        }
    }

    /// The node's wire size when it is the same for every value, `None` for
    /// variable-size nodes. Used to validate fixed-size options.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            TypeNode::Num { width, .. } => Some(width.bytes()),
            TypeNode::Text(Len::Fixed(n)) | TypeNode::Bytes(Len::Fixed(n)) => Some(*n),
            TypeNode::Text(_) | TypeNode::Bytes(_) => None,
            TypeNode::Tuple(items) => items.iter().map(TypeNode::fixed_size).sum(),
            TypeNode::Struct(fields) => fields.iter().map(|f| f.node.fixed_size()).sum(),
            TypeNode::Enum { .. } => None,
            TypeNode::Option {
                prefix,
                fixed,
                inner,
            } => {
                if *fixed {
                    Some(prefix.bytes() + inner.fixed_size()?)
                } else {
                    None
                }
            }
            TypeNode::Map {
                count: Count::Fixed(n),
                key,
                value,
            } => Some(n * (key.fixed_size()? + value.fixed_size()?)),
            TypeNode::Map { .. } => None,
            // Relative offsets shift the cursor without a value-independent
            // total; padding depends on the absolute position.
            TypeNode::Offset { .. } => None,
            TypeNode::Const(bytes) => Some(bytes.len()),
            TypeNode::HiddenPrefix { prefix, inner } => Some(prefix.len() + inner.fixed_size()?),
            TypeNode::HiddenSuffix { suffix, inner } => Some(suffix.len() + inner.fixed_size()?),
        }
    }
}
