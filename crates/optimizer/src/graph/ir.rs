// Graph model for constant folding
//
// `OnnxGraph` keeps the node list in file order, the initializer table (the known
// constants) and every other `GraphProto` field untouched so the graph can be written
// back losslessly. Edges are implicit through tensor names; a petgraph view is built
// on demand when a dependency order is needed.

use crate::error::{OptimizerError, Result};
use crate::proto::{
    AttributeProto, GraphProto, NodeDeviceConfigurationProto, NodeProto, StringStringEntryProto, TensorProto,
    ValueInfoProto,
};
use crate::tensor::Tensor;
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A node in the computation graph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphNode {
    /// Original ONNX node name (may be empty)
    pub name: String,
    /// Operation type (e.g., "Add", "MatMul", "Reshape")
    pub op_type: String,
    /// Operation attributes from ONNX
    pub attributes: Vec<AttributeProto>,
    /// Input tensor names; an empty name is an omitted optional input
    pub input_names: Vec<String>,
    /// Output tensor names
    pub output_names: Vec<String>,
    /// Domain (e.g., "" for default ONNX)
    pub domain: String,
    pub overload: String,
    pub doc_string: String,
    pub metadata_props: Vec<StringStringEntryProto>,
    pub device_configurations: Vec<NodeDeviceConfigurationProto>,
}

impl GraphNode {
    /// Create a node with the given operation type and tensor names
    pub fn new<I, O>(op_type: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            op_type: op_type.into(),
            input_names: inputs.into_iter().map(Into::into).collect(),
            output_names: outputs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeProto) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Create from ONNX NodeProto
    pub fn from_onnx_node(node: NodeProto) -> Self {
        Self {
            name: node.name,
            op_type: node.op_type,
            attributes: node.attribute,
            input_names: node.input,
            output_names: node.output,
            domain: node.domain,
            overload: node.overload,
            doc_string: node.doc_string,
            metadata_props: node.metadata_props,
            device_configurations: node.device_configurations,
        }
    }

    /// Convert back to ONNX NodeProto
    pub fn to_onnx_node(&self) -> NodeProto {
        NodeProto {
            name: self.name.clone(),
            op_type: self.op_type.clone(),
            attribute: self.attributes.clone(),
            input: self.input_names.clone(),
            output: self.output_names.clone(),
            domain: self.domain.clone(),
            overload: self.overload.clone(),
            doc_string: self.doc_string.clone(),
            metadata_props: self.metadata_props.clone(),
            device_configurations: self.device_configurations.clone(),
        }
    }

    /// Get attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Name for log and error messages, falling back to the first output
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }
        self.output_names.first().map(String::as_str).unwrap_or("<unnamed>")
    }

    /// Non-empty input names, in order
    pub fn present_inputs(&self) -> impl Iterator<Item = &str> {
        self.input_names.iter().map(String::as_str).filter(|name| !name.is_empty())
    }
}

/// ONNX computation graph with its table of known constants
#[derive(Debug, Clone)]
pub struct OnnxGraph {
    /// Nodes in file order
    nodes: Vec<GraphNode>,

    /// Initializers (constants), in file order
    initializers: IndexMap<String, TensorProto>,

    /// Decoded values of constants added by folding
    folded: FxHashMap<String, Tensor>,

    /// Graph inputs (from ONNX)
    inputs: Vec<ValueInfoProto>,

    /// Remaining GraphProto fields (outputs, value_info, annotations...), carried unchanged
    rest: GraphProto,

    /// Directory external tensor data is resolved against
    model_dir: Option<PathBuf>,
}

impl OnnxGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            initializers: IndexMap::new(),
            folded: FxHashMap::default(),
            inputs: Vec::new(),
            rest: GraphProto::default(),
            model_dir: None,
        }
    }

    /// Convert from ONNX GraphProto
    ///
    /// If `model_dir` is provided, initializers stored as external data are read
    /// from files relative to it when their value is needed.
    pub fn from_onnx_with_path(mut onnx_graph: GraphProto, model_dir: Option<&Path>) -> Self {
        let nodes = std::mem::take(&mut onnx_graph.node)
            .into_iter()
            .map(GraphNode::from_onnx_node)
            .collect();

        let initializers = std::mem::take(&mut onnx_graph.initializer)
            .into_iter()
            .map(|init| (init.name.clone(), init))
            .collect();

        let inputs = std::mem::take(&mut onnx_graph.input);

        Self {
            nodes,
            initializers,
            folded: FxHashMap::default(),
            inputs,
            rest: onnx_graph,
            model_dir: model_dir.map(Path::to_path_buf),
        }
    }

    pub fn from_onnx(onnx_graph: GraphProto) -> Self {
        Self::from_onnx_with_path(onnx_graph, None)
    }

    /// Convert back to ONNX GraphProto
    pub fn to_onnx(&self) -> GraphProto {
        GraphProto {
            node: self.nodes.iter().map(GraphNode::to_onnx_node).collect(),
            initializer: self.initializers.values().cloned().collect(),
            input: self.inputs.clone(),
            ..self.rest.clone()
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append a node at the end of the node list
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.push(node);
    }

    /// Remove nodes by position, keeping the others in their relative order
    pub fn remove_nodes(&mut self, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        let doomed: FxHashSet<usize> = positions.iter().copied().collect();
        let mut index = 0;
        self.nodes.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
    }

    /// Get graph inputs
    pub fn graph_inputs(&self) -> &[ValueInfoProto] {
        &self.inputs
    }

    /// Get graph outputs
    pub fn graph_outputs(&self) -> &[ValueInfoProto] {
        &self.rest.output
    }

    /// Register a graph input unless one with the same name exists
    ///
    /// Returns `true` if the input was added.
    pub fn add_input(&mut self, info: ValueInfoProto) -> bool {
        if self.inputs.iter().any(|input| input.name == info.name) {
            return false;
        }
        self.inputs.push(info);
        true
    }

    /// Get initializers, in file order
    pub fn initializers(&self) -> impl Iterator<Item = &TensorProto> {
        self.initializers.values()
    }

    pub fn initializer(&self, name: &str) -> Option<&TensorProto> {
        self.initializers.get(name)
    }

    pub fn constant_count(&self) -> usize {
        self.initializers.len()
    }

    /// Check whether a tensor name has a known constant value
    pub fn is_constant(&self, name: &str) -> bool {
        self.initializers.contains_key(name)
    }

    /// Decoded value of a constant
    pub fn constant(&self, name: &str) -> Result<Tensor> {
        if let Some(tensor) = self.folded.get(name) {
            return Ok(tensor.clone());
        }
        let proto = self
            .initializers
            .get(name)
            .ok_or_else(|| OptimizerError::InvalidModel(format!("'{}' is not a constant", name)))?;
        Tensor::from_proto_in(proto, self.model_dir.as_deref())
    }

    /// Record a constant value, replacing any previous value of the same name
    pub fn add_constant(&mut self, name: &str, tensor: Tensor) {
        self.initializers.insert(name.to_string(), tensor.to_proto(name));
        self.folded.insert(name.to_string(), tensor);
    }

    pub fn model_dir(&self) -> Option<&Path> {
        self.model_dir.as_deref()
    }

    /// Node positions in a dependency-respecting order
    ///
    /// Edges run from the producer of a tensor to each of its consumers. Fails with
    /// `InvalidModel` if the nodes form a cycle.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut dag: DiGraph<usize, ()> = DiGraph::with_capacity(self.nodes.len(), self.nodes.len());
        let ids: Vec<_> = (0..self.nodes.len()).map(|pos| dag.add_node(pos)).collect();

        let mut producers: FxHashMap<&str, usize> = FxHashMap::default();
        for (pos, node) in self.nodes.iter().enumerate() {
            for output in node.output_names.iter().filter(|name| !name.is_empty()) {
                producers.insert(output.as_str(), pos);
            }
        }

        for (pos, node) in self.nodes.iter().enumerate() {
            for input in node.present_inputs() {
                if let Some(&producer) = producers.get(input) {
                    dag.add_edge(ids[producer], ids[pos], ());
                }
            }
        }

        let order = toposort(&dag, None).map_err(|cycle| {
            let node = &self.nodes[dag[cycle.node_id()]];
            OptimizerError::InvalidModel(format!(
                "Graph contains a cycle through node '{}' ({})",
                node.display_name(),
                node.op_type
            ))
        })?;

        Ok(order.into_iter().map(|id| dag[id]).collect())
    }

    /// Get graph statistics
    pub fn statistics(&self) -> GraphStatistics {
        let mut op_type_counts = BTreeMap::new();
        for node in &self.nodes {
            *op_type_counts.entry(node.op_type.clone()).or_insert(0) += 1;
        }

        GraphStatistics {
            total_nodes: self.nodes.len(),
            num_inputs: self.inputs.len(),
            num_outputs: self.rest.output.len(),
            num_initializers: self.initializers.len(),
            op_type_counts,
        }
    }
}

impl Default for OnnxGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph statistics
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub num_initializers: usize,
    pub op_type_counts: BTreeMap<String, usize>,
}

impl fmt::Display for GraphStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} inputs, {} outputs, {} initializers",
            self.total_nodes, self.num_inputs, self.num_outputs, self.num_initializers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::StringStringEntryProto;

    fn chain_graph() -> OnnxGraph {
        let mut graph = OnnxGraph::new();
        graph.add_constant("a", Tensor::scalar(1.0f32));
        graph.add_node(GraphNode::new("Neg", ["a"], ["b"]).with_name("n0"));
        graph.add_node(GraphNode::new("Neg", ["b"], ["c"]).with_name("n1"));
        graph.add_node(GraphNode::new("Neg", ["c"], ["d"]).with_name("n2"));
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph = OnnxGraph::new();
        let stats = graph.statistics();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.num_initializers, 0);
    }

    #[test]
    fn test_onnx_roundtrip_preserves_untouched_fields() {
        let proto = GraphProto {
            name: "g".to_string(),
            doc_string: "doc".to_string(),
            node: vec![NodeProto {
                name: "relu".to_string(),
                op_type: "Relu".to_string(),
                input: vec!["x".to_string()],
                output: vec!["y".to_string()],
                doc_string: "node doc".to_string(),
                ..Default::default()
            }],
            input: vec![ValueInfoProto {
                name: "x".to_string(),
                ..Default::default()
            }],
            output: vec![ValueInfoProto {
                name: "y".to_string(),
                ..Default::default()
            }],
            metadata_props: vec![StringStringEntryProto {
                key: "k".to_string(),
                value: "v".to_string(),
            }],
            ..Default::default()
        };

        let graph = OnnxGraph::from_onnx(proto.clone());
        assert_eq!(graph.to_onnx(), proto);
    }

    #[test]
    fn test_add_constant_is_visible() {
        let mut graph = OnnxGraph::new();
        assert!(!graph.is_constant("w"));

        graph.add_constant("w", Tensor::from_vec(vec![2], vec![3i64, 4]).unwrap());
        assert!(graph.is_constant("w"));
        assert_eq!(graph.constant("w").unwrap().to_i64_vec().unwrap(), vec![3, 4]);
        assert_eq!(graph.initializer("w").unwrap().dims, vec![2]);
        assert!(graph.constant("missing").is_err());
    }

    #[test]
    fn test_add_input_skips_duplicates() {
        let mut graph = OnnxGraph::new();
        let info = Tensor::scalar(1i32).value_info("s");
        assert!(graph.add_input(info.clone()));
        assert!(!graph.add_input(info));
        assert_eq!(graph.graph_inputs().len(), 1);
    }

    #[test]
    fn test_remove_nodes_by_position() {
        let mut graph = OnnxGraph::new();
        // same name on every node; removal must not depend on it
        for output in ["a", "b", "c", "d"] {
            graph.add_node(GraphNode::new("Identity", ["x"], [output]).with_name("dup"));
        }

        graph.remove_nodes(&[2, 0]);
        let outputs: Vec<_> = graph.nodes().iter().map(|n| n.output_names[0].as_str()).collect();
        assert_eq!(outputs, vec!["b", "d"]);
    }

    #[test]
    fn test_topological_order() {
        let mut graph = chain_graph();
        // reverse the list so file order is not a valid schedule
        graph.nodes.reverse();

        let order = graph.topological_order().unwrap();
        let names: Vec<_> = order.iter().map(|&i| graph.nodes()[i].name.as_str()).collect();
        assert_eq!(names, vec!["n0", "n1", "n2"]);
    }

    #[test]
    fn test_cycle_is_invalid_model() {
        let mut graph = OnnxGraph::new();
        graph.add_node(GraphNode::new("Neg", ["y"], ["x"]));
        graph.add_node(GraphNode::new("Neg", ["x"], ["y"]));

        assert!(matches!(graph.topological_order(), Err(OptimizerError::InvalidModel(_))));
    }

    #[test]
    fn test_statistics_counts_op_types() {
        let stats = chain_graph().statistics();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.op_type_counts.get("Neg"), Some(&3));
        assert_eq!(stats.num_initializers, 1);
    }
}
