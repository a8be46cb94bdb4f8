//! Graph editing, propagation and retraction.
mod common;
use common::*;
use nagare::prelude::*;

#[cfg(test)]
mod node_tests {
    use super::*;

    #[test]
    fn test_add_node_assigns_unique_ids_and_grid_positions() {
        let mut graph = WorkflowGraph::new();
        let first = graph.add_node(NodeKind::Trigger, None);
        let second = graph.add_node(NodeKind::IfElse, None);
        let third = graph.add_node(NodeKind::IfElse, None);

        assert_eq!(first, "trigger-1");
        assert_eq!(second, "ifelse-2");
        assert_eq!(third, "ifelse-3");
        assert_ne!(second, third);

        assert_eq!(graph.node(&first).unwrap().position, Position::new(100.0, 100.0));
        assert_eq!(graph.node(&second).unwrap().position, Position::new(380.0, 100.0));
    }

    #[test]
    fn test_grid_wraps_after_configured_columns() {
        let mut graph = WorkflowGraph::new();
        let ids: Vec<String> = (0..5).map(|_| graph.add_node(NodeKind::Tool, None)).collect();
        assert_eq!(graph.node(&ids[4]).unwrap().position, Position::new(100.0, 280.0));
    }

    #[test]
    fn test_explicit_position_is_kept() {
        let mut graph = WorkflowGraph::new();
        let id = graph.add_node(NodeKind::Http, Some(Position::new(-5.0, 12.5)));
        assert_eq!(graph.node(&id).unwrap().position, Position::new(-5.0, 12.5));
    }

    #[test]
    fn test_generated_id_skips_taken_ids() {
        let mut graph = WorkflowGraph::new();
        graph
            .insert_node(Node::new("prompt-1", NodeKind::Prompt, Position::default()))
            .unwrap();
        let id = graph.add_node(NodeKind::Prompt, None);
        assert_eq!(id, "prompt-2");
    }

    #[test]
    fn test_insert_duplicate_node_fails() {
        let mut graph = WorkflowGraph::new();
        let id = graph.add_node(NodeKind::Memory, None);
        let err = graph
            .insert_node(Node::new(id.clone(), NodeKind::Memory, Position::default()))
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode(id));
    }

    #[test]
    fn test_update_config_merges_and_bumps_revision() {
        let mut graph = WorkflowGraph::new();
        let id = graph.add_node(NodeKind::Llm, None);

        let first = graph
            .update_node_config(&id, [("model".to_string(), Value::from("gpt-4o"))])
            .unwrap();
        let second = graph
            .update_node_config(&id, [("temperature".to_string(), Value::from(0.2))])
            .unwrap();

        assert_eq!((first, second), (1, 2));
        let node = graph.node(&id).unwrap();
        assert_eq!(node.data.config_str("model"), Some("gpt-4o"));
        assert_eq!(node.data.config.get("temperature"), Some(&Value::from(0.2)));
    }

    #[test]
    fn test_move_and_label() {
        let mut graph = WorkflowGraph::new();
        let id = graph.add_node(NodeKind::Youtube, None);
        graph.move_node(&id, Position::new(1.0, 2.0)).unwrap();
        graph.set_label(&id, Some("Search videos".to_string())).unwrap();

        let node = graph.node(&id).unwrap();
        assert_eq!(node.position, Position::new(1.0, 2.0));
        assert_eq!(node.data.label.as_deref(), Some("Search videos"));
        assert_eq!(
            graph.move_node("nope", Position::default()).unwrap_err(),
            GraphError::NodeNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_remove_node_cascades_to_incident_edges() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Trigger, None);
        let b = graph.add_node(NodeKind::Prompt, None);
        let c = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();
        graph.connect(&b, "output", &c, "input").unwrap();
        graph.connect(&a, "output", &c, "input").unwrap();

        graph.drain_events();
        let removed = graph.remove_node(&b).unwrap();

        assert_eq!(removed.id, b);
        assert!(!graph.contains_node(&b));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edges().all(|e| !e.touches(&b)));
        assert_eq!(graph.outgoing(&a).count(), 1);
        assert_eq!(graph.incoming(&c).count(), 1);

        let last = graph.events().last().unwrap();
        match last {
            GraphEvent::NodeRemoved {
                node_id,
                edges_removed,
            } => {
                assert_eq!(node_id, &b);
                assert_eq!(edges_removed.len(), 2);
            }
            other => panic!("expected NodeRemoved, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_node_retracts_from_downstream() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Trigger, None);
        let b = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();
        graph
            .send_data(&a, payload(&[("output", Value::from("hello"))]))
            .unwrap();
        assert!(graph.node(&b).unwrap().data.inputs.contains_key("output"));

        graph.remove_node(&a).unwrap();
        assert!(graph.node(&b).unwrap().data.inputs.is_empty());
    }

    #[test]
    fn test_remove_unknown_node_fails() {
        let mut graph = WorkflowGraph::new();
        assert_eq!(
            graph.remove_node("ghost").unwrap_err(),
            GraphError::NodeNotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_nodes_and_edges_listed_in_insertion_order() {
        let mut graph = WorkflowGraph::new();
        let ids: Vec<String> = [NodeKind::Feedback, NodeKind::Evaluation, NodeKind::Memory]
            .into_iter()
            .map(|kind| graph.add_node(kind, None))
            .collect();
        let listed: Vec<String> = graph.nodes().map(|n| n.id.clone()).collect();
        assert_eq!(listed, ids);
    }
}

#[cfg(test)]
mod edge_tests {
    use super::*;

    #[test]
    fn test_edge_touches_both_ends_only() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Trigger, None);
        let b = graph.add_node(NodeKind::Output, None);
        let c = graph.add_node(NodeKind::Tool, None);
        let edge_id = graph.connect(&a, "output", &b, "input").unwrap();

        let edge = graph.edge(&edge_id).unwrap();
        assert!(edge.touches(&a));
        assert!(edge.touches(&b));
        assert!(!edge.touches(&c));
    }

    #[test]
    fn test_connect_rejects_unknown_nodes() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Tool, None);
        assert_eq!(
            graph.connect(&a, "output", "ghost", "input").unwrap_err(),
            GraphError::NodeNotFound("ghost".to_string())
        );
        assert_eq!(
            graph.connect("ghost", "output", &a, "input").unwrap_err(),
            GraphError::NodeNotFound("ghost".to_string())
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_connect_twice_is_a_duplicate() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Tool, None);
        let b = graph.add_node(NodeKind::Output, None);
        let id = graph.connect(&a, "output", &b, "input").unwrap();
        assert_eq!(id, format!("e{}-output-{}-input", a, b));
        assert_eq!(
            graph.connect(&a, "output", &b, "input").unwrap_err(),
            GraphError::DuplicateEdge(id)
        );
    }

    #[test]
    fn test_branch_nodes_only_offer_their_handles() {
        let mut graph = WorkflowGraph::new();
        let check = graph.add_node(NodeKind::IfElse, None);
        let route = graph.add_node(NodeKind::Switch, None);
        let out = graph.add_node(NodeKind::Output, None);

        assert!(matches!(
            graph.connect(&check, "output", &out, "input").unwrap_err(),
            GraphError::InvalidHandle { .. }
        ));
        assert!(graph.connect(&check, "true", &out, "input").is_ok());
        assert!(graph.connect(&check, "false", &out, "input").is_ok());

        assert!(matches!(
            graph.connect(&route, "case-", &out, "input").unwrap_err(),
            GraphError::InvalidHandle { .. }
        ));
        assert!(graph.connect(&route, "case-admin", &out, "input").is_ok());
        assert!(graph.connect(&route, "default", &out, "input").is_ok());
    }

    #[test]
    fn test_self_loop_is_allowed() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::ImprovementLoop, None);
        graph.connect(&a, "output", &a, "input").unwrap();
        graph
            .send_data(&a, payload(&[("score", Value::from(0.7))]))
            .unwrap();
        assert_eq!(
            graph.node(&a).unwrap().data.inputs.get("score"),
            Some(&Value::from(0.7))
        );
        graph.remove_node(&a).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_unknown_edge_fails() {
        let mut graph = WorkflowGraph::new();
        assert_eq!(
            graph.remove_edge("e-missing").unwrap_err(),
            GraphError::EdgeNotFound("e-missing".to_string())
        );
    }
}

#[cfg(test)]
mod propagation_tests {
    use super::*;

    #[test]
    fn test_send_data_reaches_direct_successors() {
        let mut graph = WorkflowGraph::new();
        let source = graph.add_node(NodeKind::Http, None);
        let left = graph.add_node(NodeKind::Llm, None);
        let right = graph.add_node(NodeKind::Memory, None);
        graph.connect(&source, "output", &left, "input").unwrap();
        graph.connect(&source, "output", &right, "input").unwrap();

        let deliveries = graph
            .send_data(
                &source,
                payload(&[("status", Value::from(200.0)), ("body", Value::from("ok"))]),
            )
            .unwrap();

        assert_eq!(deliveries.len(), 2);
        for delivery in &deliveries {
            assert_eq!(delivery.keys, vec!["body".to_string(), "status".to_string()]);
        }
        for target in [&left, &right] {
            let inputs = &graph.node(target).unwrap().data.inputs;
            assert_eq!(inputs.get("status"), Some(&Value::from(200.0)));
            assert_eq!(inputs.get("body"), Some(&Value::from("ok")));
        }
    }

    #[test]
    fn test_propagation_is_one_hop() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Trigger, None);
        let b = graph.add_node(NodeKind::Prompt, None);
        let c = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();
        graph.connect(&b, "output", &c, "input").unwrap();

        graph.send_data(&a, payload(&[("q", Value::from("hi"))])).unwrap();

        assert!(graph.node(&b).unwrap().data.inputs.contains_key("q"));
        assert!(graph.node(&c).unwrap().data.inputs.is_empty());
    }

    #[test]
    fn test_merge_is_shallow_and_last_write_wins() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Tool, None);
        let b = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();

        graph
            .send_data(&a, payload(&[("x", Value::from(1.0)), ("y", Value::from(1.0))]))
            .unwrap();
        graph.send_data(&a, payload(&[("x", Value::from(2.0))])).unwrap();

        let inputs = &graph.node(&b).unwrap().data.inputs;
        assert_eq!(inputs.get("x"), Some(&Value::from(2.0)));
        assert_eq!(inputs.get("y"), Some(&Value::from(1.0)));
    }

    #[test]
    fn test_connect_replays_accumulated_outputs() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::FileReader, None);
        let b = graph.add_node(NodeKind::Llm, None);
        graph
            .send_data(&a, payload(&[("text", Value::from("contents"))]))
            .unwrap();
        assert!(graph.node(&b).unwrap().data.inputs.is_empty());

        graph.connect(&a, "output", &b, "input").unwrap();
        assert_eq!(
            graph.node(&b).unwrap().data.inputs.get("text"),
            Some(&Value::from("contents"))
        );
    }

    #[test]
    fn test_empty_payload_is_a_no_op() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Tool, None);
        let b = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();
        graph.drain_events();

        let deliveries = graph.send_data(&a, Payload::new()).unwrap();
        assert!(deliveries.is_empty());
        assert!(graph.events().is_empty());
        assert_eq!(graph.node(&a).unwrap().data.revision, 0);

        assert_eq!(
            graph.send_data("ghost", Payload::new()).unwrap_err(),
            GraphError::NodeNotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_send_from_handle_only_uses_that_handle() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Evaluation, None);
        let pass = graph.add_node(NodeKind::Output, None);
        let fail = graph.add_node(NodeKind::Feedback, None);
        graph.connect(&a, "pass", &pass, "input").unwrap();
        graph.connect(&a, "fail", &fail, "input").unwrap();

        let deliveries = graph
            .send_data_from_handle(&a, "pass", payload(&[("score", Value::from(9.0))]))
            .unwrap();

        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].target, pass);
        assert!(graph.node(&fail).unwrap().data.inputs.is_empty());
    }

    #[test]
    fn test_send_records_output_and_input_events() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Trigger, None);
        let b = graph.add_node(NodeKind::Output, None);
        graph.connect(&a, "output", &b, "input").unwrap();
        graph.drain_events();

        graph.send_data(&a, payload(&[("v", Value::from(true))])).unwrap();

        assert_eq!(
            graph.drain_events(),
            vec![
                GraphEvent::OutputsChanged {
                    node_id: a.clone(),
                    revision: 1
                },
                GraphEvent::InputsChanged {
                    node_id: b.clone(),
                    revision: 1
                },
            ]
        );
        assert!(graph.events().is_empty());
    }
}

#[cfg(test)]
mod retraction_tests {
    use super::*;

    #[test]
    fn test_removing_edge_retracts_source_handle_key() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Prompt, None);
        let b = graph.add_node(NodeKind::Llm, None);
        let edge = graph.connect(&a, "output", &b, "input").unwrap();
        graph
            .send_data(
                &a,
                payload(&[("output", Value::from("draft")), ("meta", Value::from(1.0))]),
            )
            .unwrap();

        let before = graph.node(&b).unwrap().data.revision;
        let removed = graph.remove_edge(&edge).unwrap();

        assert_eq!(removed.source_handle, "output");
        let node = graph.node(&b).unwrap();
        assert!(!node.data.inputs.contains_key("output"));
        // Only the key named by the handle is retracted.
        assert!(node.data.inputs.contains_key("meta"));
        assert!(node.data.revision > before);
    }

    #[test]
    fn test_retraction_ignores_other_suppliers() {
        let mut graph = WorkflowGraph::new();
        let first = graph.add_node(NodeKind::WebResearch, None);
        let second = graph.add_node(NodeKind::Youtube, None);
        let sink = graph.add_node(NodeKind::Llm, None);
        let first_edge = graph.connect(&first, "output", &sink, "input").unwrap();
        graph.connect(&second, "output", &sink, "input").unwrap();

        graph
            .send_data(&first, payload(&[("output", Value::from("web"))]))
            .unwrap();
        graph
            .send_data(&second, payload(&[("output", Value::from("video"))]))
            .unwrap();

        graph.remove_edge(&first_edge).unwrap();

        // No reference counting: the key goes although `second` still feeds it.
        assert!(!graph.node(&sink).unwrap().data.inputs.contains_key("output"));
        assert_eq!(graph.incoming(&sink).count(), 1);
    }

    #[test]
    fn test_retracting_absent_key_leaves_revision_alone() {
        let mut graph = WorkflowGraph::new();
        let a = graph.add_node(NodeKind::Tool, None);
        let b = graph.add_node(NodeKind::Output, None);
        let edge = graph.connect(&a, "output", &b, "input").unwrap();
        graph.remove_edge(&edge).unwrap();
        assert_eq!(graph.node(&b).unwrap().data.revision, 0);
    }
}

#[test]
fn test_graph_can_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WorkflowGraph>();
}
