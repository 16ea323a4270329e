// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! NPY container reader and writer.
//!
//! Only C-order, little-endian `int32`/`int64`/`float64` arrays are
//! supported. Writing always produces format version 1.0; reading accepts
//! 1.x (2-byte header length) and 2.x/3.x (4-byte header length).

use crate::{DType, HostTensor, Shape, TensorError};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGN: usize = 64;

/// Encodes a host tensor as an NPY v1.0 container.
pub(crate) fn encode(tensor: &HostTensor) -> Vec<u8> {
    let shape = match tensor.shape().dims() {
        [] => "()".to_string(),
        [d] => format!("({d},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    };
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        tensor.dtype().npy_descr(),
        shape
    );
    // magic(6) + version(2) + header length(2) + header + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(unpadded + padding + tensor.as_bytes().len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(tensor.as_bytes());
    out
}

/// Decodes an NPY container into a host tensor.
pub(crate) fn decode(bytes: &[u8]) -> Result<HostTensor, TensorError> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(TensorError::Npy("missing magic string".into()));
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(TensorError::Npy("truncated header length".into()));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        v => return Err(TensorError::Npy(format!("unsupported format version {v}"))),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(TensorError::Npy("truncated header".into()));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| TensorError::Npy("header is not valid text".into()))?;

    let descr = quoted_field(header, "descr")?;
    let dtype = DType::from_npy_descr(descr)?;
    let fortran = field(header, "fortran_order")?;
    if fortran.starts_with("True") {
        return Err(TensorError::Npy("fortran-ordered arrays are not supported".into()));
    }
    let shape = parse_shape(field(header, "shape")?)?;
    shape
        .dims()
        .iter()
        .try_fold(dtype.size_bytes(), |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| TensorError::Npy(format!("shape {shape} overflows the address space")))?;

    HostTensor::from_bytes(shape, dtype, bytes[data_start..].to_vec())
}

fn field<'a>(header: &'a str, key: &str) -> Result<&'a str, TensorError> {
    let single = format!("'{key}':");
    let double = format!("\"{key}\":");
    let at = header
        .find(&single)
        .map(|i| i + single.len())
        .or_else(|| header.find(&double).map(|i| i + double.len()))
        .ok_or_else(|| TensorError::Npy(format!("header has no '{key}' entry")))?;
    Ok(header[at..].trim_start())
}

fn quoted_field<'a>(header: &'a str, key: &str) -> Result<&'a str, TensorError> {
    let rest = field(header, key)?;
    let quote = rest
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| TensorError::Npy(format!("'{key}' is not a string")))?;
    let body = &rest[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| TensorError::Npy(format!("unterminated '{key}' string")))?;
    Ok(&body[..end])
}

fn parse_shape(rest: &str) -> Result<Shape, TensorError> {
    let body = rest
        .strip_prefix('(')
        .and_then(|r| r.find(')').map(|end| &r[..end]))
        .ok_or_else(|| TensorError::Npy("'shape' is not a tuple".into()))?;
    let dims = body
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            // numpy on some platforms writes `3L`
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| TensorError::Npy(format!("bad dimension '{s}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Shape::new(dims))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        let t = HostTensor::from_i64(Shape::new(vec![2, 3]), &[1, 2, 3, 4, 5, 6]).unwrap();
        let bytes = encode(&t);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(bytes.len(), 10 + header_len + 48);
    }

    #[test]
    fn test_decode_encoded() {
        let t = HostTensor::from_i32(Shape::vector(4), &[1, -2, 3, -4]).unwrap();
        let back = decode(&encode(&t)).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_scalar_shape() {
        let t = HostTensor::from_f64(Shape::scalar(), &[2.5]).unwrap();
        let bytes = encode(&t);
        let text = String::from_utf8_lossy(&bytes[10..]);
        assert!(text.contains("'shape': ()"));
        assert_eq!(decode(&bytes).unwrap(), t);
    }

    #[test]
    fn test_decode_numpy_written_header() {
        // Header text in the layout numpy itself writes.
        let mut header = "{'descr': '<i8', 'fortran_order': False, 'shape': (2,), }".to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&7i64.to_le_bytes());
        bytes.extend_from_slice(&(-8i64).to_le_bytes());
        let t = decode(&bytes).unwrap();
        assert_eq!(t.shape().dims(), &[2]);
        assert_eq!(t.to_i64_vec(), vec![7, -8]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(decode(b"PK\x03\x04 not npy"), Err(TensorError::Npy(_))));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let mut header =
            "{'descr': '<i8', 'fortran_order': False, 'shape': (4294967296, 4294967296, 16), }"
                .to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, TensorError::Npy(ref m) if m.contains("overflows")));
    }

    #[test]
    fn test_rejects_fortran_order() {
        let t = HostTensor::from_i64(Shape::vector(1), &[1]).unwrap();
        let bytes = encode(&t);
        let text = String::from_utf8(bytes[10..].to_vec()).unwrap_or_default();
        let swapped = text.replace("False", "True ");
        let mut patched = bytes[..10].to_vec();
        patched.extend_from_slice(swapped.as_bytes());
        assert!(decode(&patched).is_err());
    }
}
