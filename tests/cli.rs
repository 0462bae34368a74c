//! Tests for the onnx-optimize binary

use onnx_optimizer::proto::{GraphProto, ModelProto};
use onnx_optimizer::{load_model, save_model, GraphNode, Tensor};
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_onnx-optimize"));
    // keep the user's config files out of the way
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

fn write_add_mul_model(path: &Path) {
    let add = GraphNode::new("Add", ["two", "three"], ["s"]).with_name("add");
    let mul = GraphNode::new("Mul", ["s", "four"], ["r"]).with_name("mul");
    let model = ModelProto {
        ir_version: 8,
        graph: Some(GraphProto {
            name: "cli".to_string(),
            node: vec![add.to_onnx_node(), mul.to_onnx_node()],
            initializer: vec![
                Tensor::scalar(2i64).to_proto("two"),
                Tensor::scalar(3i64).to_proto("three"),
                Tensor::scalar(4i64).to_proto("four"),
            ],
            ..Default::default()
        }),
        ..Default::default()
    };
    save_model(&model, path).unwrap();
}

#[test]
fn test_cli_folds_model() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.onnx");
    let output = dir.path().join("out.onnx");
    write_add_mul_model(&input);

    let status = binary()
        .current_dir(dir.path())
        .arg("--infile")
        .arg(&input)
        .arg("--outfile")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let graph = load_model(&output).unwrap().graph.unwrap();
    assert!(graph.node.is_empty());
    let r = graph.initializer.iter().find(|init| init.name == "r").unwrap();
    assert_eq!(Tensor::from_proto(r).unwrap(), Tensor::scalar(20i64));
}

#[test]
fn test_cli_unknown_pass_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.onnx");
    let output = dir.path().join("out.onnx");
    write_add_mul_model(&input);

    let result = binary()
        .current_dir(dir.path())
        .args(["--pass", "NOPE", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("NOPE"));
    assert!(!output.exists());
}

#[test]
fn test_cli_missing_input_file_fails() {
    let dir = tempdir().unwrap();
    let status = binary()
        .current_dir(dir.path())
        .args(["-i", "absent.onnx", "-o", "out.onnx"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_cli_list_passes() {
    let result = binary().arg("--list-passes").output().unwrap();
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("CONSTANT_FOLDING"));
}
