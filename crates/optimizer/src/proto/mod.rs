//! ONNX protobuf definitions
//!
//! Message types for the ONNX interchange format, decoded and encoded with `prost`.
//! Nested enums and oneofs live in the snake_case modules (`tensor_proto::DataType`,
//! `type_proto::Value`, ...) the same way prost-build lays them out.

#![allow(clippy::large_enum_variant)]
#![allow(clippy::derive_partial_eq_without_eq)]

mod onnx;

pub use onnx::*;
