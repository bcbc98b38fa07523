//! Compilation of descriptor trees into encode/decode pairs.
//!
//! A [`Codec`] is stateless: encoding and decoding walk the owned
//! [`TypeNode`] tree recursively, carrying a dotted path string so every
//! error names the node it came from. Recursion depth is bounded by the
//! static schema, with a defensive limit checked at construction.

use crate::cursor::{Reader, Writer};
use crate::error::CodecError;
use crate::node::{Adjust, Count, Endian, Field, IntWidth, Len, TypeNode, Variant, VariantShape};
use crate::value::Value;

/// Defensive nesting limit for malformed schema input. Author-defined
/// schemas are finite trees well under this.
const MAX_DEPTH: usize = 64;

/// A compiled encode/decode pair for one descriptor tree.
///
/// For every value the tree accepts, `decode(encode(v)) == v`. The converse
/// holds only when the input contains no bytes the tree ignores on read
/// (alignment padding, skipped offsets).
pub struct Codec {
    node: TypeNode,
}

impl Codec {
    /// Validate and compile a descriptor tree.
    pub fn new(node: TypeNode) -> Result<Self, CodecError> {
        validate(&node, 0)?;
        Ok(Codec { node })
    }

    pub fn node(&self) -> &TypeNode {
        &self.node
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut writer = Writer::new();
        encode_node(&self.node, value, &mut writer, "root")?;
        Ok(writer.finish())
    }

    /// Decode a value from the front of `bytes`. Trailing bytes beyond the
    /// tree's layout are not an error; remainder nodes consume them all.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut reader = Reader::new(bytes);
        decode_node(&self.node, &mut reader, "root")
    }
}

fn validate(node: &TypeNode, depth: usize) -> Result<(), CodecError> {
    if depth > MAX_DEPTH {
        return Err(CodecError::Depth(MAX_DEPTH));
    }
    match node {
        TypeNode::Num { .. } | TypeNode::Text(_) | TypeNode::Bytes(_) | TypeNode::Const(_) => {
            Ok(())
        }
        TypeNode::Tuple(items) => items.iter().try_for_each(|n| validate(n, depth + 1)),
        TypeNode::Struct(fields) => fields
            .iter()
            .try_for_each(|f| validate(&f.node, depth + 1)),
        TypeNode::Enum { disc, variants } => {
            if variants.is_empty() {
                return Err(CodecError::Schema("enum with no variants".into()));
            }
            if variants.len() as u64 - 1 > disc.max_value() {
                return Err(CodecError::Schema(format!(
                    "{} variants do not fit a {}-byte discriminant",
                    variants.len(),
                    disc.bytes()
                )));
            }
            for variant in variants {
                match &variant.shape {
                    VariantShape::Unit => {}
                    VariantShape::Tuple(items) => {
                        items.iter().try_for_each(|n| validate(n, depth + 1))?
                    }
                    VariantShape::Struct(fields) => fields
                        .iter()
                        .try_for_each(|f| validate(&f.node, depth + 1))?,
                }
            }
            Ok(())
        }
        TypeNode::Option { fixed, inner, .. } => {
            if *fixed && inner.fixed_size().is_none() {
                return Err(CodecError::Schema(
                    "fixed option over a variable-size payload".into(),
                ));
            }
            validate(inner, depth + 1)
        }
        TypeNode::Map { key, value, .. } => {
            validate(key, depth + 1)?;
            validate(value, depth + 1)
        }
        TypeNode::Offset { pre, post, inner } => {
            for adjust in [pre, post].into_iter().filter_map(Option::as_ref) {
                if let Adjust::Padded(0) = adjust {
                    return Err(CodecError::Schema("padding to a zero boundary".into()));
                }
            }
            validate(inner, depth + 1)
        }
        TypeNode::HiddenPrefix { inner, .. } | TypeNode::HiddenSuffix { inner, .. } => {
            validate(inner, depth + 1)
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn encode_node(
    node: &TypeNode,
    value: &Value,
    writer: &mut Writer,
    path: &str,
) -> Result<(), CodecError> {
    match node {
        TypeNode::Num { width, endian } => {
            encode_int(writer, value.as_num(path)?, *width, *endian, path)
        }
        TypeNode::Text(len) => {
            let text = value.as_text(path)?;
            // Fixed-width padding is indistinguishable from trailing NULs in
            // the text itself, so those values cannot round-trip.
            if matches!(len, Len::Fixed(_)) && text.ends_with('\0') {
                return Err(CodecError::Value(format!(
                    "fixed-width text at `{path}` cannot end with a nul byte"
                )));
            }
            encode_sized(writer, text.as_bytes(), *len, true, path)
        }
        TypeNode::Bytes(len) => {
            let bytes = value.as_bytes(path)?;
            encode_sized(writer, bytes, *len, false, path)
        }
        TypeNode::Tuple(items) => {
            let values = match value {
                Value::Tuple(values) => values,
                other => {
                    return Err(CodecError::Value(format!(
                        "expected tuple at `{path}`, got {}",
                        other.kind_name()
                    )))
                }
            };
            if values.len() != items.len() {
                return Err(CodecError::Value(format!(
                    "tuple at `{path}` needs {} items, got {}",
                    items.len(),
                    values.len()
                )));
            }
            for (i, (item, v)) in items.iter().zip(values).enumerate() {
                encode_node(item, v, writer, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        TypeNode::Struct(fields) => encode_fields(fields, value, writer, path),
        TypeNode::Enum { disc, variants } => {
            let (tag, payload) = match value {
                Value::Variant { tag, payload } => (tag, payload),
                other => {
                    return Err(CodecError::Value(format!(
                        "expected variant at `{path}`, got {}",
                        other.kind_name()
                    )))
                }
            };
            let index = variants
                .iter()
                .position(|v| &v.name == tag)
                .ok_or_else(|| {
                    CodecError::Value(format!("unknown variant `{tag}` at `{path}`"))
                })?;
            encode_int(writer, index as u64, *disc, Endian::Le, path)?;
            let variant = &variants[index];
            let path = format!("{path}.{tag}");
            match (&variant.shape, payload) {
                (VariantShape::Unit, None) => Ok(()),
                (VariantShape::Unit, Some(_)) => Err(CodecError::Value(format!(
                    "variant `{tag}` at `{path}` takes no payload"
                ))),
                (shape, Some(payload)) => match shape {
                    VariantShape::Tuple(items) => {
                        encode_node(&TypeNode::Tuple(items.clone()), payload, writer, &path)
                    }
                    VariantShape::Struct(fields) => encode_fields(fields, payload, writer, &path),
                    VariantShape::Unit => unreachable!(),
                },
                (_, None) => Err(CodecError::Value(format!(
                    "variant `{tag}` at `{path}` requires a payload"
                ))),
            }
        }
        TypeNode::Option {
            prefix,
            fixed,
            inner,
        } => {
            let present = match value {
                Value::Option(opt) => opt,
                other => {
                    return Err(CodecError::Value(format!(
                        "expected option at `{path}`, got {}",
                        other.kind_name()
                    )))
                }
            };
            match present {
                Some(inner_value) => {
                    encode_int(writer, 1, *prefix, Endian::Le, path)?;
                    encode_node(inner, inner_value, writer, path)
                }
                None => {
                    encode_int(writer, 0, *prefix, Endian::Le, path)?;
                    if *fixed {
                        // Validated at Codec::new.
                        let size = inner.fixed_size().unwrap_or(0);
                        writer.write(&vec![0u8; size]);
                    }
                    Ok(())
                }
            }
        }
        TypeNode::Map { count, key, value: value_node } => {
            let pairs = match value {
                Value::Map(pairs) => pairs,
                other => {
                    return Err(CodecError::Value(format!(
                        "expected map at `{path}`, got {}",
                        other.kind_name()
                    )))
                }
            };
            match count {
                Count::Prefixed(width) => {
                    encode_int(writer, pairs.len() as u64, *width, Endian::Le, path)?
                }
                Count::Compact => {
                    let n = u32::try_from(pairs.len()).map_err(|_| {
                        CodecError::Range(format!("map count overflows at `{path}`"))
                    })?;
                    writer.write_shortvec(n);
                }
                Count::Fixed(n) => {
                    if pairs.len() != *n {
                        return Err(CodecError::Value(format!(
                            "map at `{path}` needs exactly {n} entries, got {}",
                            pairs.len()
                        )));
                    }
                }
                Count::Remainder => {}
            }
            for (i, (k, v)) in pairs.iter().enumerate() {
                encode_node(key, k, writer, &format!("{path}[{i}].key"))?;
                encode_node(value_node, v, writer, &format!("{path}[{i}].value"))?;
            }
            Ok(())
        }
        TypeNode::Offset { pre, post, inner } => {
            apply_adjust_encode(writer, pre, path)?;
            encode_node(inner, value, writer, path)?;
            apply_adjust_encode(writer, post, path)
        }
        TypeNode::Const(bytes) => {
            writer.write(bytes);
            Ok(())
        }
        TypeNode::HiddenPrefix { prefix, inner } => {
            writer.write(prefix);
            encode_node(inner, value, writer, path)
        }
        TypeNode::HiddenSuffix { suffix, inner } => {
            encode_node(inner, value, writer, path)?;
            writer.write(suffix);
            Ok(())
        }
    }
}

fn encode_fields(
    fields: &[Field],
    value: &Value,
    writer: &mut Writer,
    path: &str,
) -> Result<(), CodecError> {
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        if let Some(constant) = &field.omitted {
            // The wire carries the constant; the logical value omits it.
            encode_node(&field.node, constant, writer, &field_path)?;
            continue;
        }
        let field_value = value.field(&field.name).ok_or_else(|| {
            CodecError::Value(format!("missing field `{}` at `{path}`", field.name))
        })?;
        encode_node(&field.node, field_value, writer, &field_path)?;
    }
    Ok(())
}

fn encode_sized(
    writer: &mut Writer,
    bytes: &[u8],
    len: Len,
    pad: bool,
    path: &str,
) -> Result<(), CodecError> {
    match len {
        Len::Prefixed(width) => {
            encode_int(writer, bytes.len() as u64, width, Endian::Le, path)?;
            writer.write(bytes);
        }
        Len::Fixed(n) => {
            if bytes.len() > n {
                return Err(CodecError::Range(format!(
                    "{} bytes exceed fixed width {n} at `{path}`",
                    bytes.len()
                )));
            }
            if !pad && bytes.len() != n {
                return Err(CodecError::Value(format!(
                    "expected exactly {n} bytes at `{path}`, got {}",
                    bytes.len()
                )));
            }
            writer.write(bytes);
            writer.write(&vec![0u8; n - bytes.len()]);
        }
        Len::Remainder => writer.write(bytes),
    }
    Ok(())
}

fn encode_int(
    writer: &mut Writer,
    value: u64,
    width: IntWidth,
    endian: Endian,
    path: &str,
) -> Result<(), CodecError> {
    if value > width.max_value() {
        return Err(CodecError::Range(format!(
            "{value} does not fit in {} byte(s) at `{path}`",
            width.bytes()
        )));
    }
    let n = width.bytes();
    match endian {
        Endian::Le => writer.write(&value.to_le_bytes()[..n]),
        Endian::Be => writer.write(&value.to_be_bytes()[8 - n..]),
    }
    Ok(())
}

fn apply_adjust_encode(
    writer: &mut Writer,
    adjust: &Option<Adjust>,
    path: &str,
) -> Result<(), CodecError> {
    match adjust {
        Some(Adjust::Relative(delta)) => writer.seek_relative(*delta, path),
        Some(Adjust::Padded(boundary)) => {
            writer.align_to(*boundary);
            Ok(())
        }
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_node(node: &TypeNode, reader: &mut Reader, path: &str) -> Result<Value, CodecError> {
    match node {
        TypeNode::Num { width, endian } => {
            Ok(Value::Num(decode_int(reader, *width, *endian, path)?))
        }
        TypeNode::Text(len) => {
            let bytes = decode_sized(reader, *len, path)?;
            // Fixed-width text is zero-padded on the wire.
            let end = match len {
                Len::Fixed(_) => bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1),
                _ => bytes.len(),
            };
            let text = std::str::from_utf8(&bytes[..end]).map_err(|e| {
                CodecError::Format(format!("invalid utf-8 at `{path}`: {e}"))
            })?;
            Ok(Value::Text(text.to_string()))
        }
        TypeNode::Bytes(len) => Ok(Value::Bytes(decode_sized(reader, *len, path)?.to_vec())),
        TypeNode::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                values.push(decode_node(item, reader, &format!("{path}[{i}]"))?);
            }
            Ok(Value::Tuple(values))
        }
        TypeNode::Struct(fields) => decode_fields(fields, reader, path),
        TypeNode::Enum { disc, variants } => {
            let index = decode_int(reader, *disc, Endian::Le, path)?;
            let variant: &Variant = variants.get(index as usize).ok_or_else(|| {
                CodecError::Format(format!(
                    "discriminant {index} has no variant at `{path}`"
                ))
            })?;
            let variant_path = format!("{path}.{}", variant.name);
            let payload = match &variant.shape {
                VariantShape::Unit => None,
                VariantShape::Tuple(items) => Some(Box::new(decode_node(
                    &TypeNode::Tuple(items.clone()),
                    reader,
                    &variant_path,
                )?)),
                VariantShape::Struct(fields) => {
                    Some(Box::new(decode_fields(fields, reader, &variant_path)?))
                }
            };
            Ok(Value::Variant {
                tag: variant.name.clone(),
                payload,
            })
        }
        TypeNode::Option {
            prefix,
            fixed,
            inner,
        } => {
            let flag = decode_int(reader, *prefix, Endian::Le, path)?;
            match flag {
                0 => {
                    if *fixed {
                        let size = inner.fixed_size().unwrap_or(0);
                        reader.take(size, path)?;
                    }
                    Ok(Value::none())
                }
                1 => Ok(Value::some(decode_node(inner, reader, path)?)),
                other => Err(CodecError::Format(format!(
                    "invalid presence flag {other} at `{path}`"
                ))),
            }
        }
        TypeNode::Map { count, key, value } => {
            let mut pairs = Vec::new();
            match count {
                Count::Remainder => {
                    while reader.remaining() > 0 {
                        let i = pairs.len();
                        let k = decode_node(key, reader, &format!("{path}[{i}].key"))?;
                        let v = decode_node(value, reader, &format!("{path}[{i}].value"))?;
                        pairs.push((k, v));
                    }
                }
                _ => {
                    let n = match count {
                        Count::Prefixed(width) => decode_int(reader, *width, Endian::Le, path)?,
                        Count::Compact => reader.read_shortvec()? as u64,
                        Count::Fixed(n) => *n as u64,
                        Count::Remainder => unreachable!(),
                    };
                    for i in 0..n {
                        let k = decode_node(key, reader, &format!("{path}[{i}].key"))?;
                        let v = decode_node(value, reader, &format!("{path}[{i}].value"))?;
                        pairs.push((k, v));
                    }
                }
            }
            Ok(Value::Map(pairs))
        }
        TypeNode::Offset { pre, post, inner } => {
            apply_adjust_decode(reader, pre, path)?;
            let value = decode_node(inner, reader, path)?;
            apply_adjust_decode(reader, post, path)?;
            Ok(value)
        }
        TypeNode::Const(expected) => {
            expect_const(reader, expected, path)?;
            Ok(Value::Unit)
        }
        TypeNode::HiddenPrefix { prefix, inner } => {
            expect_const(reader, prefix, path)?;
            decode_node(inner, reader, path)
        }
        TypeNode::HiddenSuffix { suffix, inner } => {
            let value = decode_node(inner, reader, path)?;
            expect_const(reader, suffix, path)?;
            Ok(value)
        }
    }
}

fn decode_fields(fields: &[Field], reader: &mut Reader, path: &str) -> Result<Value, CodecError> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        let value = decode_node(&field.node, reader, &field_path)?;
        match &field.omitted {
            Some(constant) => {
                // Verify the wire constant, then drop it from the value.
                if &value != constant {
                    return Err(CodecError::Format(format!(
                        "constant mismatch at `{field_path}`"
                    )));
                }
            }
            None => out.push((field.name.clone(), value)),
        }
    }
    Ok(Value::Struct(out))
}

fn decode_sized<'a>(
    reader: &mut Reader<'a>,
    len: Len,
    path: &str,
) -> Result<&'a [u8], CodecError> {
    match len {
        Len::Prefixed(width) => {
            let n = decode_int(reader, width, Endian::Le, path)?;
            let n = usize::try_from(n)
                .map_err(|_| CodecError::Format(format!("length overflow at `{path}`")))?;
            reader.take(n, path)
        }
        Len::Fixed(n) => reader.take(n, path),
        Len::Remainder => Ok(reader.take_remainder()),
    }
}

fn decode_int(
    reader: &mut Reader,
    width: IntWidth,
    endian: Endian,
    path: &str,
) -> Result<u64, CodecError> {
    let bytes = reader.take(width.bytes(), path)?;
    let mut buf = [0u8; 8];
    match endian {
        Endian::Le => {
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(u64::from_le_bytes(buf))
        }
        Endian::Be => {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            Ok(u64::from_be_bytes(buf))
        }
    }
}

fn apply_adjust_decode(
    reader: &mut Reader,
    adjust: &Option<Adjust>,
    path: &str,
) -> Result<(), CodecError> {
    match adjust {
        Some(Adjust::Relative(delta)) => reader.seek_relative(*delta, path),
        Some(Adjust::Padded(boundary)) => reader.align_to(*boundary, path),
        None => Ok(()),
    }
}

fn expect_const(reader: &mut Reader, expected: &[u8], path: &str) -> Result<(), CodecError> {
    let actual = reader.take(expected.len(), path)?;
    if actual != expected {
        return Err(CodecError::Format(format!(
            "constant mismatch at `{path}`: expected {expected:02x?}, got {actual:02x?}"
        )));
    }
    Ok(())
}
