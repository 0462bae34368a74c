//! Shared helpers for optimizer integration tests
//!
//! Models are built programmatically with [`OnnxGraphBuilder`] and inspected
//! through the decoded initializers of the optimized graph.

#![allow(dead_code)]

use onnx_optimizer_core::proto::tensor_proto::DataType;
use onnx_optimizer_core::proto::tensor_shape_proto::{dimension::Value as DimValue, Dimension};
use onnx_optimizer_core::proto::type_proto::{Tensor as TypeTensor, Value as TypeValue};
use onnx_optimizer_core::proto::{
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto, TensorShapeProto, TypeProto,
    ValueInfoProto,
};
use onnx_optimizer_core::Tensor;

// ============================================================================
// ONNX Graph Builder
// ============================================================================

/// Builder for creating ONNX models programmatically
///
/// # Example
///
/// ```ignore
/// let model = OnnxGraphBuilder::new()
///     .add_initializer("a", Tensor::scalar(2.0f32))
///     .add_input("x", &[3], DataType::Float)
///     .add_node("Add", &["a", "x"], &["y"])
///     .add_output("y", &[3], DataType::Float)
///     .build_model();
/// ```
pub struct OnnxGraphBuilder {
    nodes: Vec<NodeProto>,
    inputs: Vec<ValueInfoProto>,
    outputs: Vec<ValueInfoProto>,
    initializers: Vec<TensorProto>,
    current_attributes: Vec<AttributeProto>,
}

impl OnnxGraphBuilder {
    /// Create new graph builder
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            initializers: Vec::new(),
            current_attributes: Vec::new(),
        }
    }

    /// Add input tensor specification
    pub fn add_input(mut self, name: &str, shape: &[i64], dtype: DataType) -> Self {
        self.inputs.push(Self::create_value_info(name, shape, dtype));
        self
    }

    /// Add output tensor specification
    pub fn add_output(mut self, name: &str, shape: &[i64], dtype: DataType) -> Self {
        self.outputs.push(Self::create_value_info(name, shape, dtype));
        self
    }

    /// Add a constant initializer
    pub fn add_initializer(mut self, name: &str, value: Tensor) -> Self {
        self.initializers.push(value.to_proto(name));
        self
    }

    /// Add an attribute to the next node
    pub fn with_attribute(mut self, attribute: AttributeProto) -> Self {
        self.current_attributes.push(attribute);
        self
    }

    /// Add a node; pending attributes are attached to it
    pub fn add_node(self, op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        let name = format!("{}_{}", op_type.to_lowercase(), self.nodes.len());
        self.add_named_node(&name, op_type, inputs, outputs)
    }

    pub fn add_named_node(mut self, name: &str, op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        self.nodes.push(NodeProto {
            name: name.to_string(),
            op_type: op_type.to_string(),
            input: inputs.iter().map(|s| s.to_string()).collect(),
            output: outputs.iter().map(|s| s.to_string()).collect(),
            attribute: std::mem::take(&mut self.current_attributes),
            ..Default::default()
        });
        self
    }

    /// Build the GraphProto
    pub fn build(self) -> GraphProto {
        GraphProto {
            name: "test_graph".to_string(),
            node: self.nodes,
            initializer: self.initializers,
            input: self.inputs,
            output: self.outputs,
            ..Default::default()
        }
    }

    /// Build a ModelProto wrapping the graph
    pub fn build_model(self) -> ModelProto {
        ModelProto {
            ir_version: 8,
            producer_name: "onnx-optimizer-tests".to_string(),
            producer_version: "1.0".to_string(),
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 17,
            }],
            graph: Some(self.build()),
            ..Default::default()
        }
    }

    fn create_value_info(name: &str, shape: &[i64], dtype: DataType) -> ValueInfoProto {
        let dims = shape
            .iter()
            .map(|&d| Dimension {
                value: Some(DimValue::DimValue(d)),
                ..Default::default()
            })
            .collect();

        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                value: Some(TypeValue::TensorType(TypeTensor {
                    elem_type: dtype as i32,
                    shape: Some(TensorShapeProto { dim: dims }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

// ============================================================================
// Output Validation
// ============================================================================

/// Decoded value of the initializer `name` in `graph`
pub fn initializer_value(graph: &GraphProto, name: &str) -> Tensor {
    let proto = graph
        .initializer
        .iter()
        .find(|init| init.name == name)
        .unwrap_or_else(|| panic!("no initializer named '{}'", name));
    Tensor::from_proto(proto).unwrap()
}

/// Names of the graph inputs, in order
pub fn input_names(graph: &GraphProto) -> Vec<&str> {
    graph.input.iter().map(|input| input.name.as_str()).collect()
}

/// Op types of the remaining nodes, in order
pub fn op_types(graph: &GraphProto) -> Vec<&str> {
    graph.node.iter().map(|node| node.op_type.as_str()).collect()
}

/// Assert two float tensors are equal within tolerance
pub fn assert_tensors_equal(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Tensor sizes don't match: actual={}, expected={}",
        actual.len(),
        expected.len()
    );

    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "Values don't match at index {}: actual={}, expected={}, diff={}",
            i,
            a,
            e,
            diff
        );
    }
}
