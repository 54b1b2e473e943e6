//! Graph query, mutation, and cycle tests.

use crate::{Module, ModuleGraph, ModuleId};

fn add(graph: &ModuleGraph, path: &str) -> ModuleId {
    let id = ModuleId::new(path).unwrap();
    graph
        .add_module(Module::builder(id.clone(), "export {};").build())
        .unwrap();
    id
}

fn edge(graph: &ModuleGraph, from: &ModuleId, to: &ModuleId) {
    graph.add_dependency(from.clone(), to.clone()).unwrap();
}

#[test]
fn queries_fail_for_unknown_ids() {
    let graph = ModuleGraph::new();
    let id = ModuleId::new("nope.js").unwrap();
    assert!(graph.module(&id).is_err());
    assert!(graph.dependencies(&id).is_err());
    assert!(graph.dependents(&id).is_err());
}

#[test]
fn dependency_listing_is_sorted() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a.js");
    let c = add(&graph, "c.js");
    let b = add(&graph, "b.js");
    edge(&graph, &a, &c);
    edge(&graph, &a, &b);
    assert_eq!(graph.dependencies(&a).unwrap(), vec![b, c]);
}

#[test]
fn entry_points_keep_insertion_order() {
    let graph = ModuleGraph::new();
    let b = add(&graph, "b.js");
    let a = add(&graph, "a.js");
    graph.add_entry_point(b.clone()).unwrap();
    graph.add_entry_point(a.clone()).unwrap();
    graph.add_entry_point(b.clone()).unwrap();
    assert_eq!(graph.entry_points(), vec![b.clone(), a]);
    assert!(graph.module(&b).unwrap().is_entry);
}

#[test]
fn update_module_replaces_entity() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a.js");
    let before = graph.module(&a).unwrap();
    graph.update_module(&a, |m| m.is_entry = true).unwrap();
    let after = graph.module(&a).unwrap();
    assert!(!before.is_entry);
    assert!(after.is_entry);
}

#[test]
fn two_node_cycle_is_detected_once() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a.js");
    let b = add(&graph, "b.js");
    edge(&graph, &a, &b);
    edge(&graph, &b, &a);

    let cycles = graph.cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 2);
    assert!(graph.has_cycles());
}

#[test]
fn self_import_is_a_cycle() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a.js");
    edge(&graph, &a, &a);
    let cycles = graph.cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0], vec![a]);
}

#[test]
fn acyclic_graph_reports_no_cycles() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a.js");
    let b = add(&graph, "b.js");
    let c = add(&graph, "c.js");
    edge(&graph, &a, &b);
    edge(&graph, &a, &c);
    edge(&graph, &b, &c);
    assert!(!graph.has_cycles());

    let stats = graph.statistics();
    assert_eq!(stats.module_count, 3);
    assert_eq!(stats.edge_count, 3);
    assert_eq!(stats.cycle_count, 0);
}
