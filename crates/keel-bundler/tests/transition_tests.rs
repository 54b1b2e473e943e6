//! Transition semantics: distinct identities per context, idempotent
//! re-entry, directive-driven subgraph duplication, and unknown-name
//! failures.

mod helpers;

use std::path::Path;
use std::sync::Arc;

use helpers::{build_with, client_transition, runtime};
use keel_bundler::{
    ContextName, Error, ExternalsPolicy, GraphResolver, ModuleGraph, ModuleId, ModuleRegistry,
    SpecifierResolver, TransitionEngine, TransitionTable,
};
use rustc_hash::FxHashMap;

const PAGE_FIXTURE: &[(&str, &str)] = &[
    (
        "src/entry.js",
        "import handler from 'framework/page-server-handler';\nimport './page';\n(\"KEEL { transition: client }\");\nimport chunkGroup from './page';\n",
    ),
    ("src/page.js", "import './shared-ui';\nexport default 1;\n"),
    ("src/shared-ui.js", "export const ui = true;\n"),
];

fn harness(
    files: &[(&str, &str)],
) -> (ModuleGraph, GraphResolver, TransitionEngine) {
    let runtime = runtime(files);
    let registry = Arc::new(ModuleRegistry::new());
    let table = Arc::new(TransitionTable::new().with(client_transition()));
    let specifiers = SpecifierResolver::new(
        runtime.clone(),
        "",
        FxHashMap::default(),
        ExternalsPolicy::externalize_all_bare(),
    );
    let resolver = GraphResolver::new(runtime, Arc::clone(&registry), specifiers, Arc::clone(&table));
    let engine = TransitionEngine::new(table, registry);
    (ModuleGraph::new(), resolver, engine)
}

#[tokio::test]
async fn transitioned_modules_are_distinct_entities() {
    let result = build_with(PAGE_FIXTURE, "src/entry.js")
        .transition(client_transition())
        .build()
        .await
        .expect("build");

    let server_page = ModuleId::new("src/page.js").unwrap();
    let client_page = server_page.in_context(ContextName::new("client"));
    assert!(result.graph.contains(&server_page));
    assert!(result.graph.contains(&client_page));

    // the transitioned subgraph is duplicated all the way down
    let server_ui = ModuleId::new("src/shared-ui.js").unwrap();
    let client_ui = server_ui.in_context(ContextName::new("client"));
    assert!(result.graph.contains(&server_ui));
    assert!(result.graph.contains(&client_ui));

    // the originals are untouched: same content, server context
    let original = result.graph.module(&server_page).unwrap();
    let transitioned = result.graph.module(&client_page).unwrap();
    assert_eq!(original.content_hash, transitioned.content_hash);
    assert_ne!(original.id, transitioned.id);
}

#[tokio::test]
async fn entering_twice_returns_the_same_root() {
    let (graph, resolver, engine) = harness(PAGE_FIXTURE);
    let outcome = resolver
        .resolve_entry(&graph, Path::new("src/page.js"), &ContextName::server())
        .await
        .expect("resolve");

    let client = ContextName::new("client");
    let first = engine
        .enter(&graph, &resolver, &outcome.entry, &client)
        .await
        .expect("first entry");
    let second = engine
        .enter(&graph, &resolver, &outcome.entry, &client)
        .await
        .expect("second entry");
    assert_eq!(first, second);
    assert_eq!(engine.transitioned_roots(), vec![first]);
}

#[tokio::test]
async fn entering_own_context_is_a_no_op() {
    let (graph, resolver, engine) = harness(PAGE_FIXTURE);
    let outcome = resolver
        .resolve_entry(&graph, Path::new("src/page.js"), &ContextName::server())
        .await
        .expect("resolve");

    let client = ContextName::new("client");
    let transitioned = engine
        .enter(&graph, &resolver, &outcome.entry, &client)
        .await
        .expect("enter");

    // re-entering the transitioned root in its own context returns itself
    let again = engine
        .enter(&graph, &resolver, &transitioned, &client)
        .await
        .expect("re-enter");
    assert_eq!(again, transitioned);
    // and mints no further variants
    assert_eq!(engine.transitioned_roots().len(), 1);
}

#[tokio::test]
async fn unknown_transition_name_fails() {
    let err = build_with(
        &[
            (
                "src/entry.js",
                "(\"KEEL { transition: edge }\");\nimport './page';\n",
            ),
            ("src/page.js", ""),
        ],
        "src/entry.js",
    )
    .build()
    .await
    .expect_err("unknown transition must fail the build");

    match err {
        Error::Transition { name, .. } => assert_eq!(name, "edge"),
        other => panic!("expected transition error, got {other}"),
    }
}

#[tokio::test]
async fn sibling_subgraphs_are_shared_not_copied() {
    // only ./page is covered by the directive; ./plain stays single
    let result = build_with(
        &[
            (
                "src/entry.js",
                "import './plain';\n(\"KEEL { transition: client }\");\nimport './page';\n",
            ),
            ("src/plain.js", "export const plain = 1;\n"),
            ("src/page.js", "export default 1;\n"),
        ],
        "src/entry.js",
    )
    .transition(client_transition())
    .build()
    .await
    .expect("build");

    let plain = ModuleId::new("src/plain.js").unwrap();
    assert!(result.graph.contains(&plain));
    assert!(!result
        .graph
        .contains(&plain.in_context(ContextName::new("client"))));
}

#[tokio::test]
async fn transition_alias_swaps_eligible_modules() {
    let result = build_with(
        &[
            (
                "src/entry.js",
                "(\"KEEL { transition: client }\");\nimport './page';\n",
            ),
            ("src/page.js", "import doc from 'framework/document';\n"),
            ("src/document.client.js", "export const doc = 'client';\n"),
        ],
        "src/entry.js",
    )
    .transition(client_transition().alias("framework/document", "/src/document.client.js"))
    .build()
    .await
    .expect("build");

    // inside the client context the alias resolves to a real module
    let swapped = ModuleId::with_context("src/document.client.js", ContextName::new("client"))
        .unwrap();
    assert!(result.graph.contains(&swapped));
    // the external fallback was never recorded for the client subgraph
    assert!(result.graph.external_handle("framework/document").is_none());
}
