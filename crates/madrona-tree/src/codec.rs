//! Byte-exact model transport: pre-order node records, big-endian
//! fields, optional Deflate compression, and a base64 text form.
//!
//! Every node is a fixed header `[i32 feature][u8 kind][f64 value]
//! [u8 is_leaf]`. A leaf continues with `[i32 output][i32 len]
//! [f64 x len]` posterior values; an internal node writes a presence
//! flag byte before each of its two children, recursively. Leaves fill
//! the header with `feature = -1`, the quantitative kind tag, and a NaN
//! value.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::error::TreeError;
use crate::node::{Node, SplitCondition};

const KIND_QUANTITATIVE: u8 = 1;
const KIND_NOMINAL: u8 = 2;

/// Encode a node tree to bytes, optionally Deflate-compressed.
///
/// # Errors
///
/// Returns [`TreeError::SerializeModel`] on a write failure.
pub fn encode_node(root: &Node, compress: bool) -> Result<Vec<u8>, TreeError> {
    let serialize_err = |source| TreeError::SerializeModel { source };
    if compress {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        write_node(root, &mut encoder).map_err(serialize_err)?;
        encoder.finish().map_err(serialize_err)
    } else {
        let mut out = Vec::new();
        write_node(root, &mut out).map_err(serialize_err)?;
        Ok(out)
    }
}

/// Decode a node tree from bytes produced by [`encode_node`].
///
/// # Errors
///
/// Returns [`TreeError::DeserializeModel`] on a read failure (including
/// truncation) and [`TreeError::ModelCorrupted`] when the payload
/// violates the record format.
pub fn decode_node(bytes: &[u8], compressed: bool) -> Result<Node, TreeError> {
    if compressed {
        let mut decoder = DeflateDecoder::new(bytes);
        let root = read_node(&mut decoder)?;
        expect_end(&mut decoder)?;
        Ok(root)
    } else {
        let mut reader = bytes;
        let root = read_node(&mut reader)?;
        expect_end(&mut reader)?;
        Ok(root)
    }
}

/// Encode a node tree as base64 text of its compressed byte form, safe
/// to carry through text-typed table columns.
///
/// # Errors
///
/// Returns [`TreeError::SerializeModel`] on a write failure.
pub fn encode_text(root: &Node) -> Result<String, TreeError> {
    Ok(STANDARD.encode(encode_node(root, true)?))
}

/// Decode a node tree from the text form produced by [`encode_text`].
///
/// # Errors
///
/// Returns [`TreeError::DecodeModelText`] for invalid base64, otherwise
/// the errors of [`decode_node`].
pub fn decode_text(text: &str) -> Result<Node, TreeError> {
    let bytes = STANDARD
        .decode(text)
        .map_err(|source| TreeError::DecodeModelText { source })?;
    decode_node(&bytes, true)
}

fn write_node(node: &Node, w: &mut impl Write) -> std::io::Result<()> {
    match node {
        Node::Leaf { output, posteriori } => {
            w.write_all(&(-1i32).to_be_bytes())?;
            w.write_all(&[KIND_QUANTITATIVE])?;
            w.write_all(&f64::NAN.to_be_bytes())?;
            w.write_all(&[1])?;
            w.write_all(&(*output as i32).to_be_bytes())?;
            w.write_all(&(posteriori.len() as i32).to_be_bytes())?;
            for &p in posteriori {
                w.write_all(&p.to_be_bytes())?;
            }
        }
        Node::Internal {
            feature,
            condition,
            true_child,
            false_child,
        } => {
            w.write_all(&(*feature as i32).to_be_bytes())?;
            let (kind, value) = match condition {
                SplitCondition::Quantitative { threshold } => (KIND_QUANTITATIVE, *threshold),
                SplitCondition::Nominal { category } => (KIND_NOMINAL, *category),
            };
            w.write_all(&[kind])?;
            w.write_all(&value.to_be_bytes())?;
            w.write_all(&[0])?;
            w.write_all(&[1])?;
            write_node(true_child, w)?;
            w.write_all(&[1])?;
            write_node(false_child, w)?;
        }
    }
    Ok(())
}

fn read_node(r: &mut impl Read) -> Result<Node, TreeError> {
    let feature = read_i32(r)?;
    let kind = read_u8(r)?;
    if kind != KIND_QUANTITATIVE && kind != KIND_NOMINAL {
        return Err(TreeError::ModelCorrupted {
            detail: format!("unknown attribute kind tag {kind}"),
        });
    }
    let value = read_f64(r)?;
    match read_u8(r)? {
        1 => {
            let output = read_i32(r)?;
            if output < 0 {
                return Err(TreeError::ModelCorrupted {
                    detail: format!("negative leaf output {output}"),
                });
            }
            let len = read_i32(r)?;
            if len < 0 {
                return Err(TreeError::ModelCorrupted {
                    detail: format!("negative posterior length {len}"),
                });
            }
            let mut posteriori = Vec::with_capacity(len as usize);
            for _ in 0..len {
                posteriori.push(read_f64(r)?);
            }
            Ok(Node::Leaf {
                output: output as usize,
                posteriori,
            })
        }
        0 => {
            if feature < 0 {
                return Err(TreeError::ModelCorrupted {
                    detail: format!("negative split feature {feature}"),
                });
            }
            let condition = if kind == KIND_QUANTITATIVE {
                SplitCondition::Quantitative { threshold: value }
            } else {
                SplitCondition::Nominal { category: value }
            };
            let true_child = read_child(r)?;
            let false_child = read_child(r)?;
            Ok(Node::Internal {
                feature: feature as usize,
                condition,
                true_child: Box::new(true_child),
                false_child: Box::new(false_child),
            })
        }
        other => Err(TreeError::ModelCorrupted {
            detail: format!("invalid leaf flag byte {other}"),
        }),
    }
}

fn read_child(r: &mut impl Read) -> Result<Node, TreeError> {
    match read_u8(r)? {
        1 => read_node(r),
        // Internal nodes always own both children.
        0 => Err(TreeError::ModelCorrupted {
            detail: "internal node with an absent child".to_string(),
        }),
        other => Err(TreeError::ModelCorrupted {
            detail: format!("invalid child presence byte {other}"),
        }),
    }
}

fn expect_end(r: &mut impl Read) -> Result<(), TreeError> {
    let mut probe = [0u8; 1];
    match r.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => Err(TreeError::ModelCorrupted {
            detail: "trailing data after the root node record".to_string(),
        }),
        Err(source) => Err(TreeError::DeserializeModel { source }),
    }
}

fn read_u8(r: &mut impl Read) -> Result<u8, TreeError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|source| TreeError::DeserializeModel { source })?;
    Ok(buf[0])
}

fn read_i32(r: &mut impl Read) -> Result<i32, TreeError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|source| TreeError::DeserializeModel { source })?;
    Ok(i32::from_be_bytes(buf))
}

fn read_f64(r: &mut impl Read) -> Result<f64, TreeError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|source| TreeError::DeserializeModel { source })?;
    Ok(f64::from_be_bytes(buf))
}
