// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property tests for the transcript codec.

use proptest::prelude::*;
use tensor_core::{DType, HostTensor, Shape};
use std::collections::BTreeMap;

use transcript_ir::wire::{decode_value, encode_value};
use transcript_ir::{
    codec, Argument, ArgumentTag, HostTensorArg, Instruction, OpaqueValue, TensorFlavor, Transcript,
    WireValue,
};

// ── Strategies ──────────────────────────────────────────────────────

fn dtype() -> impl Strategy<Value = DType> {
    prop_oneof![Just(DType::Int32), Just(DType::Int64), Just(DType::Float64)]
}

fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn host_tensor() -> impl Strategy<Value = HostTensorArg> {
    (prop::collection::vec(1usize..4, 0..3), dtype(), any::<bool>()).prop_flat_map(
        |(dims, dtype, torch)| {
            let len = dims.iter().product::<usize>();
            prop::collection::vec(-1000i64..1000, len).prop_map(move |values| {
                let tensor = HostTensor::from_widened(Shape::new(dims.clone()), dtype, &values)
                    .expect("sizes agree");
                HostTensorArg {
                    flavor: if torch { TensorFlavor::Torch } else { TensorFlavor::Numpy },
                    tensor,
                }
            })
        },
    )
}

fn leaf_argument() -> impl Strategy<Value = Argument> {
    prop_oneof![
        (name(), dtype()).prop_map(|(n, d)| Argument::device(n, d)),
        host_tensor().prop_map(Argument::HostTensor),
        any::<i64>().prop_map(Argument::Int),
        Just(Argument::None),
        prop_oneof![Just("int64"), Just("torch.int32"), Just("float64")]
            .prop_map(|s| Argument::TensorType(s.to_string())),
        (
            prop::option::of(-8i64..8),
            prop::option::of(-8i64..8),
            prop::option::of(1i64..4)
        )
            .prop_map(|(start, stop, step)| Argument::Slice { start, stop, step }),
        Just(Argument::Ellipsis),
    ]
}

/// A record whose discriminator the transcript format does not define.
fn foreign_record() -> impl Strategy<Value = WireValue> {
    (
        "Future[A-Z][a-z]{0,6}",
        prop::collection::btree_map(name(), any::<i64>().prop_map(WireValue::Int), 0..3),
    )
        .prop_map(|(type_name, fields)| WireValue::Record { type_name, fields })
}

fn opaque_argument() -> impl Strategy<Value = Argument> {
    (prop::sample::select(ArgumentTag::ALL.to_vec()), foreign_record())
        .prop_map(|(tag, value)| Argument::Opaque(OpaqueValue { tag: Some(tag), value }))
}

/// A tuple entry that is not an argument record.
fn bare_entry() -> impl Strategy<Value = Argument> {
    prop_oneof![
        "[a-z]{0,6}".prop_map(WireValue::Str),
        Just(WireValue::Null),
        Just(WireValue::Map(BTreeMap::new())),
    ]
    .prop_map(|value| Argument::Opaque(OpaqueValue { tag: None, value }))
}

fn argument() -> impl Strategy<Value = Argument> {
    prop_oneof![4 => leaf_argument(), 1 => opaque_argument()].prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec(prop_oneof![3 => inner, 1 => bare_entry()], 0..4)
            .prop_map(Argument::Shape)
    })
}

fn instruction() -> impl Strategy<Value = Instruction> {
    prop_oneof![
        name().prop_map(Instruction::segment_start),
        Just(Instruction::SegmentEnd),
        name().prop_map(Instruction::free),
        (name(), prop::collection::vec(argument(), 0..5), name(), dtype())
            .prop_map(|(op, args, out, d)| Instruction::op(op, args, Argument::device(out, d))),
    ]
}

fn transcript() -> impl Strategy<Value = Transcript> {
    prop::collection::vec(instruction(), 0..12).prop_map(Transcript::new)
}

// ── Properties ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn decode_inverts_encode(t in transcript()) {
        let json = t.to_json().unwrap();
        let back = Transcript::from_json(&json).unwrap();
        prop_assert_eq!(back, t);
    }

    #[test]
    fn encoding_is_idempotent(t in transcript()) {
        let first = t.to_json().unwrap();
        let second = Transcript::from_json(&first).unwrap().to_json().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn generic_layer_preserves_documents(t in transcript()) {
        let document = codec::encode_transcript(&t);
        let generic = decode_value(&document, "$").unwrap();
        prop_assert_eq!(encode_value(&generic), document);
    }
}

// ── Fixed documents ─────────────────────────────────────────────────

#[test]
fn decodes_hand_written_document() {
    let json = r#"{
      "__type__": "ExecutionTranscript",
      "transcript": [
        [{"__type__": "ExecutionTranscriptOpType", "value": "SEGMENT_START"}, "encrypt"],
        [{"__type__": "ExecutionTranscriptOpType", "value": "DEVICE_OP"},
         {"__type__": "DeviceOp", "name": "_modmul_ttc",
          "args": [
            {"__type__": "DeviceOpArg",
             "arg_type": {"__type__": "DeviceOpArgType", "value": "DEVICE_TENSOR"},
             "value": {"__type__": "DeviceTensorPointer", "dtype": "torch.int64", "inf_name": "a"}},
            {"__type__": "DeviceOpArg",
             "arg_type": {"__type__": "DeviceOpArgType", "value": "INT"},
             "value": 97}
          ],
          "out": {"__type__": "DeviceOpArg",
                  "arg_type": {"__type__": "DeviceOpArgType", "value": "DEVICE_TENSOR"},
                  "value": {"__type__": "DeviceTensorPointer", "dtype": "torch.int64", "inf_name": "b"}}}],
        [{"__type__": "ExecutionTranscriptOpType", "value": "FREE_DEVICE_TENSOR"},
         {"__type__": "FreeDeviceTensor", "tensor_name": "a"}],
        [{"__type__": "ExecutionTranscriptOpType", "value": "SEGMENT_END"}, null]
      ]
    }"#;
    let t = Transcript::from_json(json).unwrap();
    assert_eq!(t.len(), 4);
    assert_eq!(t.device_op_count(), 1);
    match &t.instructions()[1] {
        Instruction::DeviceOp(op) => {
            assert_eq!(op.name, "_modmul_ttc");
            assert_eq!(op.args[1], Argument::Int(97));
            assert_eq!(op.out, Argument::device("b", DType::Int64));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn keeps_unknown_nested_type_opaque() {
    let t = Transcript::new(vec![Instruction::op(
        "zeros",
        vec![Argument::shape(&[4]), Argument::TensorType("torch.int64".into())],
        Argument::device("z", DType::Int64),
    )]);
    let mut document = codec::encode_transcript(&t);
    document["transcript"][0][1]["args"][0]["value"] =
        serde_json::json!({"__type__": "SomeFutureType", "x": 1});
    let json = document.to_string();

    let decoded = Transcript::from_json(&json).unwrap();
    match &decoded.instructions()[0] {
        Instruction::DeviceOp(op) => match &op.args[0] {
            Argument::Opaque(o) => {
                assert_eq!(o.tag, Some(ArgumentTag::Shape));
                assert_eq!(o.type_name(), "SomeFutureType");
            }
            other => panic!("unexpected {other:?}"),
        },
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(codec::encode_transcript(&decoded), document);
}
