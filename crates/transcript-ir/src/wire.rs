// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic `__type__`-tagged JSON values.
//!
//! Every domain value on the wire is a JSON object whose `"__type__"` key
//! names its kind. [`decode_value`] maps an arbitrary JSON node to a
//! [`WireValue`] tree, interpreting the small leaf kinds (`slice`,
//! `ellipsis`, `dtype`, `complex`) and keeping every other tagged object as
//! an uninterpreted [`WireValue::Record`]. Objects without a discriminator
//! stay plain maps. [`encode_value`] is the exact inverse, so nested values
//! with unknown discriminators survive a decode/encode cycle unchanged.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::CodecError;

/// Key holding the discriminator of every tagged object.
pub const TYPE_KEY: &str = "__type__";

/// Discriminator names used by the transcript format.
pub mod tags {
    pub const TRANSCRIPT: &str = "ExecutionTranscript";
    pub const INSTRUCTION_TAG: &str = "ExecutionTranscriptOpType";
    pub const ARGUMENT_TAG: &str = "DeviceOpArgType";
    pub const ARGUMENT: &str = "DeviceOpArg";
    pub const DEVICE_OP: &str = "DeviceOp";
    pub const FREE: &str = "FreeDeviceTensor";
    pub const TENSOR_REF: &str = "DeviceTensorPointer";
    pub const HOST_TENSOR: &str = "HostTensor";
    pub const SLICE: &str = "slice";
    pub const ELLIPSIS: &str = "ellipsis";
    pub const DTYPE: &str = "dtype";
    pub const COMPLEX: &str = "complex";

    /// Whether `name` is a discriminator of the transcript format.
    pub fn is_known(name: &str) -> bool {
        [
            TRANSCRIPT,
            INSTRUCTION_TAG,
            ARGUMENT_TAG,
            ARGUMENT,
            DEVICE_OP,
            FREE,
            TENSOR_REF,
            HOST_TENSOR,
            SLICE,
            ELLIPSIS,
            DTYPE,
            COMPLEX,
        ]
        .contains(&name)
    }
}

/// A decoded JSON node.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<WireValue>),
    /// Object without a discriminator.
    Map(BTreeMap<String, WireValue>),
    /// Tagged object this layer does not interpret, fields minus the tag.
    Record {
        type_name: String,
        fields: BTreeMap<String, WireValue>,
    },
    Complex {
        real: f64,
        imag: f64,
    },
    Dtype(String),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    Ellipsis,
}

/// Reads the discriminator of a JSON object, if it has one.
pub fn type_name(value: &Value) -> Option<&str> {
    value.as_object()?.get(TYPE_KEY)?.as_str()
}

/// Builds a tagged JSON object.
pub(crate) fn tagged<const N: usize>(type_name: &str, fields: [(&str, Value); N]) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::String(type_name.to_string()));
    for (key, value) in fields {
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

/// Decodes any JSON node. `path` is used in error messages.
pub fn decode_value(value: &Value, path: &str) -> Result<WireValue, CodecError> {
    Ok(match value {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => WireValue::Int(i),
            None => WireValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => WireValue::Str(s.clone()),
        Value::Array(items) => WireValue::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_value(item, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => decode_object(map, path)?,
    })
}

fn decode_object(map: &Map<String, Value>, path: &str) -> Result<WireValue, CodecError> {
    let Some(tag) = map.get(TYPE_KEY) else {
        return Ok(WireValue::Map(decode_fields(map, path)?));
    };
    let Some(tag) = tag.as_str() else {
        return Err(CodecError::schema(path, "discriminator is not a string"));
    };
    Ok(match tag {
        tags::SLICE => WireValue::Slice {
            start: optional_int(map, "start", path)?,
            stop: optional_int(map, "stop", path)?,
            step: optional_int(map, "step", path)?,
        },
        tags::ELLIPSIS => WireValue::Ellipsis,
        tags::DTYPE => WireValue::Dtype(required_str(map, "value", path)?.to_string()),
        tags::COMPLEX => WireValue::Complex {
            real: required_f64(map, "real", path)?,
            imag: required_f64(map, "imag", path)?,
        },
        other => {
            let mut fields = decode_fields(map, path)?;
            fields.remove(TYPE_KEY);
            WireValue::Record {
                type_name: other.to_string(),
                fields,
            }
        }
    })
}

fn decode_fields(map: &Map<String, Value>, path: &str) -> Result<BTreeMap<String, WireValue>, CodecError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v, &format!("{path}.{k}"))?)))
        .collect()
}

/// Encodes a [`WireValue`] back to JSON.
pub fn encode_value(value: &WireValue) -> Value {
    match value {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Int(i) => Value::from(*i),
        WireValue::Float(f) => float(*f),
        WireValue::Str(s) => Value::String(s.clone()),
        WireValue::List(items) => Value::Array(items.iter().map(encode_value).collect()),
        WireValue::Map(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        ),
        WireValue::Record { type_name, fields } => {
            let mut map: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            map.insert(TYPE_KEY.to_string(), Value::String(type_name.clone()));
            Value::Object(map)
        }
        WireValue::Complex { real, imag } => {
            tagged(tags::COMPLEX, [("real", float(*real)), ("imag", float(*imag))])
        }
        WireValue::Dtype(name) => tagged(tags::DTYPE, [("value", Value::String(name.clone()))]),
        WireValue::Slice { start, stop, step } => encode_slice(*start, *stop, *step),
        WireValue::Ellipsis => tagged(tags::ELLIPSIS, []),
    }
}

pub(crate) fn encode_slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Value {
    tagged(
        tags::SLICE,
        [
            ("start", start.map_or(Value::Null, Value::from)),
            ("stop", stop.map_or(Value::Null, Value::from)),
            ("step", step.map_or(Value::Null, Value::from)),
        ],
    )
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

// ── Field helpers ───────────────────────────────────────────────────

pub(crate) fn field<'a>(map: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value, CodecError> {
    map.get(key)
        .ok_or_else(|| CodecError::schema(path, format!("missing field '{key}'")))
}

pub(crate) fn required_str<'a>(map: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str, CodecError> {
    field(map, key, path)?
        .as_str()
        .ok_or_else(|| CodecError::schema(path, format!("field '{key}' is not a string")))
}

fn required_f64(map: &Map<String, Value>, key: &str, path: &str) -> Result<f64, CodecError> {
    match field(map, key, path)? {
        // non-finite floats are written as null
        Value::Null => Ok(f64::NAN),
        v => v
            .as_f64()
            .ok_or_else(|| CodecError::schema(path, format!("field '{key}' is not a number"))),
    }
}

pub(crate) fn optional_int(map: &Map<String, Value>, key: &str, path: &str) -> Result<Option<i64>, CodecError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| CodecError::schema(path, format!("field '{key}' is not an integer"))),
    }
}
