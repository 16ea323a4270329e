// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed transcript codec.
//!
//! Maps [`Transcript`]s to and from the tagged JSON document:
//!
//! ```text
//! {"__type__": "ExecutionTranscript",
//!  "transcript": [[{"__type__": "ExecutionTranscriptOpType", "value": "DEVICE_OP"},
//!                  {"__type__": "DeviceOp", "name": ..., "args": [...], "out": ...}],
//!                 ...]}
//! ```
//!
//! Instruction and argument records are strict: a missing or wrong
//! discriminator is a [`CodecError::Schema`], and an argument tag outside the
//! known set is [`CodecError::UnknownArgumentTag`]. Leaf values inside
//! arguments go through the generic [`wire`](crate::wire) layer; a value
//! whose discriminator the format does not define, and a tuple entry that is
//! neither an integer nor an argument record, decode as
//! [`Argument::Opaque`] and re-encode unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use tensor_core::{DType, HostTensor};

use crate::wire::{self, field, optional_int, required_str, tagged, tags, WireValue};
use crate::{
    Argument, ArgumentTag, CodecError, DeviceOp, DeviceTensorRef, HostTensorArg, Instruction,
    InstructionTag, OpaqueValue, TensorFlavor, Transcript,
};

// ── Encoding ────────────────────────────────────────────────────────

/// Encodes a transcript as a JSON document.
pub fn encode_transcript(transcript: &Transcript) -> Value {
    let items = transcript
        .instructions()
        .iter()
        .map(encode_instruction)
        .collect();
    tagged(tags::TRANSCRIPT, [("transcript", Value::Array(items))])
}

/// Encodes one instruction as a `[tag, payload]` pair.
pub fn encode_instruction(instruction: &Instruction) -> Value {
    let tag = tagged(
        tags::INSTRUCTION_TAG,
        [("value", Value::String(instruction.tag().as_str().to_string()))],
    );
    let payload = match instruction {
        Instruction::SegmentStart { label } => Value::String(label.clone()),
        Instruction::SegmentEnd => Value::Null,
        Instruction::DeviceOp(op) => encode_device_op(op),
        Instruction::FreeDeviceTensor { name } => {
            tagged(tags::FREE, [("tensor_name", Value::String(name.clone()))])
        }
    };
    Value::Array(vec![tag, payload])
}

fn encode_device_op(op: &DeviceOp) -> Value {
    tagged(
        tags::DEVICE_OP,
        [
            ("name", Value::String(op.name.clone())),
            ("args", Value::Array(op.args.iter().map(encode_argument).collect())),
            ("out", encode_argument(&op.out)),
        ],
    )
}

/// Encodes one argument record. A bare opaque tuple entry is written
/// without the record wrapper.
pub fn encode_argument(argument: &Argument) -> Value {
    let value = match argument {
        Argument::DeviceTensor(r) => tagged(
            tags::TENSOR_REF,
            [
                ("dtype", Value::String(r.dtype.qualified_name())),
                ("inf_name", Value::String(r.name.clone())),
            ],
        ),
        Argument::HostTensor(h) => encode_host_tensor(h),
        Argument::Shape(items) => Value::Array(items.iter().map(encode_argument).collect()),
        Argument::Int(i) => Value::from(*i),
        Argument::None => Value::Null,
        Argument::TensorType(name) => wire::encode_value(&WireValue::Dtype(name.clone())),
        Argument::Slice { start, stop, step } => wire::encode_slice(*start, *stop, *step),
        Argument::Ellipsis => wire::encode_value(&WireValue::Ellipsis),
        Argument::Opaque(o) => wire::encode_value(&o.value),
    };
    let Some(tag) = argument.tag() else {
        return value;
    };
    let tag = tagged(
        tags::ARGUMENT_TAG,
        [("value", Value::String(tag.as_str().to_string()))],
    );
    tagged(tags::ARGUMENT, [("arg_type", tag), ("value", value)])
}

fn encode_host_tensor(host: &HostTensorArg) -> Value {
    let mut payload = Map::new();
    payload.insert("type".into(), Value::String(host.flavor.as_str().into()));
    payload.insert(
        "data".into(),
        Value::String(STANDARD.encode(host.tensor.to_npy())),
    );
    tagged(tags::HOST_TENSOR, [("tensor_base64", Value::Object(payload))])
}

// ── Decoding ────────────────────────────────────────────────────────

/// Decodes a transcript document.
pub fn decode_transcript(document: &Value) -> Result<Transcript, CodecError> {
    let map = expect_record(document, tags::TRANSCRIPT, "$")?;
    let items = field(map, "transcript", "$")?
        .as_array()
        .ok_or_else(|| CodecError::schema("$.transcript", "not a list"))?;
    let instructions = items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_instruction(item, &format!("$.transcript[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Transcript::new(instructions))
}

/// Decodes one `[tag, payload]` instruction pair.
pub fn decode_instruction(value: &Value, path: &str) -> Result<Instruction, CodecError> {
    let pair = value
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| CodecError::schema(path, "instruction is not a [tag, payload] pair"))?;
    let tag_path = format!("{path}[0]");
    let tag_map = expect_record(&pair[0], tags::INSTRUCTION_TAG, &tag_path)?;
    let tag_name = required_str(tag_map, "value", &tag_path)?;
    let tag = InstructionTag::from_wire(tag_name).ok_or_else(|| {
        CodecError::schema(&tag_path, format!("unknown instruction tag '{tag_name}'"))
    })?;

    let payload = &pair[1];
    let payload_path = format!("{path}[1]");
    Ok(match tag {
        InstructionTag::SegmentStart => {
            let label = payload
                .as_str()
                .ok_or_else(|| CodecError::schema(&payload_path, "segment label is not a string"))?;
            Instruction::segment_start(label)
        }
        InstructionTag::SegmentEnd => Instruction::SegmentEnd,
        InstructionTag::DeviceOp => Instruction::DeviceOp(decode_device_op(payload, &payload_path)?),
        InstructionTag::FreeDeviceTensor => {
            let map = expect_record(payload, tags::FREE, &payload_path)?;
            Instruction::free(required_str(map, "tensor_name", &payload_path)?)
        }
    })
}

fn decode_device_op(value: &Value, path: &str) -> Result<DeviceOp, CodecError> {
    let map = expect_record(value, tags::DEVICE_OP, path)?;
    let name = required_str(map, "name", path)?;
    let args = field(map, "args", path)?
        .as_array()
        .ok_or_else(|| CodecError::schema(path, "field 'args' is not a list"))?
        .iter()
        .enumerate()
        .map(|(i, a)| decode_argument(a, &format!("{path}.args[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    let out = decode_argument(field(map, "out", path)?, &format!("{path}.out"))?;
    Ok(DeviceOp::new(name, args, out))
}

/// Decodes one argument record.
pub fn decode_argument(value: &Value, path: &str) -> Result<Argument, CodecError> {
    let map = expect_record(value, tags::ARGUMENT, path)?;
    let tag_path = format!("{path}.arg_type");
    let tag_map = expect_record(field(map, "arg_type", path)?, tags::ARGUMENT_TAG, &tag_path)?;
    let tag_name = required_str(tag_map, "value", &tag_path)?;
    let tag = ArgumentTag::from_wire(tag_name).ok_or_else(|| CodecError::UnknownArgumentTag {
        path: tag_path.clone(),
        tag: tag_name.to_string(),
    })?;

    let value_path = format!("{path}.value");
    let value = map.get("value").unwrap_or(&Value::Null);
    decode_argument_value(tag, value, &value_path)
}

fn decode_argument_value(tag: ArgumentTag, value: &Value, path: &str) -> Result<Argument, CodecError> {
    if let Some(found) = wire::type_name(value).filter(|name| !tags::is_known(name)) {
        tracing::debug!("{path}: keeping {tag} value of unknown type '{found}' opaque");
        return Ok(Argument::Opaque(OpaqueValue {
            tag: Some(tag),
            value: wire::decode_value(value, path)?,
        }));
    }
    Ok(match tag {
        ArgumentTag::DeviceTensor => {
            let map = expect_record(value, tags::TENSOR_REF, path)?;
            let dtype: DType = required_str(map, "dtype", path)?
                .parse()
                .map_err(|source| CodecError::Tensor {
                    path: path.to_string(),
                    source,
                })?;
            Argument::DeviceTensor(DeviceTensorRef::new(required_str(map, "inf_name", path)?, dtype))
        }
        ArgumentTag::HostTensor => Argument::HostTensor(decode_host_tensor(value, path)?),
        ArgumentTag::Shape => {
            let items = value
                .as_array()
                .ok_or_else(|| CodecError::schema(path, "shape value is not a list"))?;
            let mut parsed = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                if wire::type_name(item) == Some(tags::ARGUMENT) {
                    parsed.push(decode_argument(item, &item_path)?);
                    continue;
                }
                parsed.push(match wire::decode_value(item, &item_path)? {
                    WireValue::Int(v) => Argument::Int(v),
                    WireValue::Bool(b) => Argument::Int(b as i64),
                    raw => Argument::Opaque(OpaqueValue {
                        tag: None,
                        value: raw,
                    }),
                });
            }
            Argument::Shape(parsed)
        }
        ArgumentTag::Int => match wire::decode_value(value, path)? {
            WireValue::Int(v) => Argument::Int(v),
            WireValue::Bool(b) => Argument::Int(b as i64),
            _ => return Err(CodecError::schema(path, "int value is not an integer")),
        },
        ArgumentTag::None => Argument::None,
        ArgumentTag::TensorType => match wire::decode_value(value, path)? {
            WireValue::Dtype(name) | WireValue::Str(name) => Argument::TensorType(name),
            _ => return Err(CodecError::schema(path, "tensor type is not a dtype")),
        },
        ArgumentTag::Slice => match wire::decode_value(value, path)? {
            WireValue::Slice { start, stop, step } => Argument::Slice { start, stop, step },
            _ => return Err(CodecError::schema(path, "slice value is not a slice record")),
        },
        ArgumentTag::Ellipsis => match wire::decode_value(value, path)? {
            WireValue::Ellipsis | WireValue::Null => Argument::Ellipsis,
            _ => return Err(CodecError::schema(path, "ellipsis value is not an ellipsis record")),
        },
    })
}

fn decode_host_tensor(value: &Value, path: &str) -> Result<HostTensorArg, CodecError> {
    let map = expect_record(value, tags::HOST_TENSOR, path)?;
    let payload_path = format!("{path}.tensor_base64");
    let payload = field(map, "tensor_base64", path)?
        .as_object()
        .ok_or_else(|| CodecError::schema(&payload_path, "not an object"))?;
    let flavor_name = required_str(payload, "type", &payload_path)?;
    let flavor = TensorFlavor::from_wire(flavor_name).ok_or_else(|| {
        CodecError::schema(&payload_path, format!("unknown tensor type tag '{flavor_name}'"))
    })?;
    let bytes = STANDARD
        .decode(required_str(payload, "data", &payload_path)?)
        .map_err(|source| CodecError::Base64 {
            path: payload_path.clone(),
            source,
        })?;
    let tensor = HostTensor::from_npy(&bytes).map_err(|source| CodecError::Tensor {
        path: payload_path,
        source,
    })?;
    Ok(HostTensorArg { flavor, tensor })
}

fn expect_record<'a>(value: &'a Value, expected: &str, path: &str) -> Result<&'a Map<String, Value>, CodecError> {
    let map = value
        .as_object()
        .ok_or_else(|| CodecError::schema(path, format!("expected a {expected} record")))?;
    match wire::type_name(value) {
        Some(found) if found == expected => Ok(map),
        Some(found) => Err(CodecError::schema(
            path,
            format!("expected a {expected} record, found {found}"),
        )),
        None => Err(CodecError::schema(
            path,
            format!("missing discriminator, expected {expected}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tensor_core::Shape;

    fn arg(tag: &str, value: Value) -> Value {
        json!({
            "__type__": "DeviceOpArg",
            "arg_type": {"__type__": "DeviceOpArgType", "value": tag},
            "value": value
        })
    }

    #[test]
    fn test_decode_device_ref() {
        let v = arg(
            "DEVICE_TENSOR",
            json!({"__type__": "DeviceTensorPointer", "dtype": "torch.int64", "inf_name": "x"}),
        );
        assert_eq!(
            decode_argument(&v, "$").unwrap(),
            Argument::device("x", DType::Int64)
        );
    }

    #[test]
    fn test_encode_device_ref_uses_qualified_dtype() {
        let v = encode_argument(&Argument::device("x", DType::Int32));
        assert_eq!(v["value"]["dtype"], "torch.int32");
        assert_eq!(v["arg_type"]["value"], "DEVICE_TENSOR");
    }

    #[test]
    fn test_decode_shape_mixed_entries() {
        let v = arg("SHAPE", json!([arg("INT", json!(4)), 5, arg("NONE", Value::Null)]));
        assert_eq!(
            decode_argument(&v, "$").unwrap(),
            Argument::Shape(vec![Argument::Int(4), Argument::Int(5), Argument::None])
        );
    }

    #[test]
    fn test_decode_bool_as_int() {
        let v = arg("INT", json!(true));
        assert_eq!(decode_argument(&v, "$").unwrap(), Argument::Int(1));
    }

    #[test]
    fn test_decode_tensor_type_forms() {
        let record = arg("TENSOR_TYPE", json!({"__type__": "dtype", "value": "int64"}));
        let bare = arg("TENSOR_TYPE", json!("torch.int32"));
        assert_eq!(decode_argument(&record, "$").unwrap(), Argument::TensorType("int64".into()));
        assert_eq!(decode_argument(&bare, "$").unwrap(), Argument::TensorType("torch.int32".into()));
    }

    #[test]
    fn test_unknown_nested_discriminator_is_opaque() {
        let raw = json!({"__type__": "SomeFutureType", "x": 1});
        let v = arg("INT", raw.clone());
        let decoded = decode_argument(&v, "$").unwrap();
        match &decoded {
            Argument::Opaque(o) => {
                assert_eq!(o.tag, Some(ArgumentTag::Int));
                assert_eq!(o.type_name(), "SomeFutureType");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode_argument(&decoded), v);
    }

    #[test]
    fn test_known_discriminator_in_wrong_place_is_schema_error() {
        let v = arg("INT", json!({"__type__": "slice", "start": 1}));
        assert!(matches!(
            decode_argument(&v, "$").unwrap_err(),
            CodecError::Schema { .. }
        ));
    }

    #[test]
    fn test_bare_shape_entries_are_opaque() {
        let v = arg(
            "SHAPE",
            json!([3, "axis", {"__type__": "SomeFutureType"}, null]),
        );
        let decoded = decode_argument(&v, "$").unwrap();
        match &decoded {
            Argument::Shape(items) => {
                assert_eq!(items[0], Argument::Int(3));
                assert!(items[1..]
                    .iter()
                    .all(|i| matches!(i, Argument::Opaque(o) if o.tag.is_none())));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(encode_argument(&decoded), v);
    }

    #[test]
    fn test_unknown_argument_tag() {
        let v = arg("COMPLEX", json!(1));
        let err = decode_argument(&v, "$.args[2]").unwrap_err();
        assert!(matches!(err, CodecError::UnknownArgumentTag { ref tag, .. } if tag == "COMPLEX"));
    }

    #[test]
    fn test_missing_argument_discriminator() {
        let v = json!({"arg_type": {"__type__": "DeviceOpArgType", "value": "INT"}, "value": 1});
        assert!(matches!(
            decode_argument(&v, "$").unwrap_err(),
            CodecError::Schema { .. }
        ));
    }

    #[test]
    fn test_unknown_instruction_tag_is_schema_error() {
        let v = json!([{"__type__": "ExecutionTranscriptOpType", "value": "BARRIER"}, null]);
        let err = decode_instruction(&v, "$.transcript[0]").unwrap_err();
        assert!(err.to_string().contains("BARRIER"));
    }

    #[test]
    fn test_instruction_missing_discriminator() {
        let v = json!([{"value": "SEGMENT_END"}, null]);
        assert!(matches!(
            decode_instruction(&v, "$").unwrap_err(),
            CodecError::Schema { .. }
        ));
    }

    #[test]
    fn test_host_tensor_payload() {
        let tensor = HostTensor::from_i64(Shape::vector(3), &[1, 2, 3]).unwrap();
        let encoded = encode_argument(&Argument::HostTensor(HostTensorArg::numpy(tensor.clone())));
        assert_eq!(encoded["value"]["tensor_base64"]["type"], "numpy");
        match decode_argument(&encoded, "$").unwrap() {
            Argument::HostTensor(h) => {
                assert_eq!(h.flavor, TensorFlavor::Numpy);
                assert_eq!(h.tensor, tensor);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_host_tensor_bad_base64() {
        let v = arg(
            "HOST_TENSOR",
            json!({"__type__": "HostTensor", "tensor_base64": {"type": "numpy", "data": "!!"}}),
        );
        assert!(matches!(
            decode_argument(&v, "$").unwrap_err(),
            CodecError::Base64 { .. }
        ));
    }

    #[test]
    fn test_torch_pickle_payload_rejected() {
        let data = STANDARD.encode(b"PK\x03\x04archive");
        let v = arg(
            "HOST_TENSOR",
            json!({"__type__": "HostTensor", "tensor_base64": {"type": "torch", "data": data}}),
        );
        assert!(matches!(
            decode_argument(&v, "$").unwrap_err(),
            CodecError::Tensor { .. }
        ));
    }

    #[test]
    fn test_top_level_requires_transcript_record() {
        assert!(decode_transcript(&json!({"transcript": []})).is_err());
        assert!(decode_transcript(&json!([])).is_err());
        let empty = decode_transcript(&json!({"__type__": "ExecutionTranscript", "transcript": []})).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_segment_payloads() {
        let t = Transcript::new(vec![Instruction::segment_start("keygen"), Instruction::SegmentEnd]);
        let v = encode_transcript(&t);
        assert_eq!(v["transcript"][0][1], "keygen");
        assert_eq!(v["transcript"][1][1], Value::Null);
        assert_eq!(decode_transcript(&v).unwrap(), t);
    }
}
