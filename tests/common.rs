//! Common test utilities for building workflows and inputs.
use nagare::prelude::*;

/// Builds a payload from `(key, value)` pairs.
#[allow(dead_code)]
pub fn payload(entries: &[(&str, Value)]) -> Payload {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// trigger -> ifelse, with `true` going to one output and `false` to another.
///
/// Returns the graph and the ids `(trigger, check, on_true, on_false)`.
#[allow(dead_code)]
pub fn if_else_workflow(condition: &str) -> (WorkflowGraph, [String; 4]) {
    let mut graph = WorkflowGraph::new();
    let trigger = graph.add_node(NodeKind::Trigger, None);
    let check = graph.add_node(NodeKind::IfElse, None);
    let on_true = graph.add_node(NodeKind::Output, None);
    let on_false = graph.add_node(NodeKind::Output, None);

    graph
        .connect(&trigger, DEFAULT_SOURCE_HANDLE, &check, DEFAULT_TARGET_HANDLE)
        .expect("trigger -> check");
    graph
        .connect(&check, TRUE_HANDLE, &on_true, DEFAULT_TARGET_HANDLE)
        .expect("check -> on_true");
    graph
        .connect(&check, FALSE_HANDLE, &on_false, DEFAULT_TARGET_HANDLE)
        .expect("check -> on_false");
    graph
        .set_condition(&check, condition)
        .expect("condition should parse");

    (graph, [trigger, check, on_true, on_false])
}

/// A saved editor document: trigger -> llm -> ifelse -> {true: output, false: feedback}.
#[allow(dead_code)]
pub const EDITOR_WORKFLOW_JSON: &str = r#"{
  "nodes": [
    { "id": "trigger-1", "type": "trigger", "position": { "x": 0, "y": 0 },
      "data": { "label": "Start", "outputs": { "value": 42 }, "_version": 0.4821 } },
    { "id": "llm-1", "type": "llm", "position": { "x": 250, "y": 0 },
      "data": { "model": "gpt-4o", "temperature": 0.2 } },
    { "id": "ifelse-1", "type": "ifelse", "position": { "x": 500, "y": 0 },
      "data": { "condition": "input.value > 10", "inputs": { "value": 42 } } },
    { "id": "output-1", "type": "output", "position": { "x": 750, "y": -100 }, "data": {} },
    { "id": "feedback-1", "type": "feedback", "position": { "x": 750, "y": 100 }, "data": {} }
  ],
  "edges": [
    { "id": "e1", "source": "trigger-1", "target": "llm-1",
      "sourceHandle": "output", "targetHandle": "input", "type": "custom" },
    { "source": "llm-1", "target": "ifelse-1" },
    { "id": "e3", "source": "ifelse-1", "target": "output-1", "sourceHandle": "true" },
    { "id": "e4", "source": "ifelse-1", "target": "feedback-1", "sourceHandle": "false" }
  ]
}"#;
