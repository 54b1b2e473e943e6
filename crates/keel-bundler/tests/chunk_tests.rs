//! Chunk assignment: boundaries, sharing, ordering, and determinism.

mod helpers;

use helpers::{build_with, client_transition};
use keel_bundler::{ChunkGroupKind, ChunkPolicy, ContextName, ModuleId};

#[tokio::test]
async fn dynamic_import_starts_a_lazy_chunk() {
    // entry A imports B statically and C dynamically; C imports B.
    let result = build_with(
        &[
            (
                "src/a.js",
                "import './b';\nconst c = import('./c');\n",
            ),
            ("src/b.js", "export const b = 1;\n"),
            ("src/c.js", "import './b';\nexport const c = 2;\n"),
        ],
        "src/a.js",
    )
    .build()
    .await
    .expect("build");

    let b = ModuleId::new("src/b.js").unwrap();
    let c = ModuleId::new("src/c.js").unwrap();

    // B is reached by both the entry root and the lazy root: hoisted into
    // the shared chunk, never duplicated.
    let assigned = result.plan.assigned_modules();
    assert_eq!(assigned.iter().filter(|id| ***id == b).count(), 1);

    let shared = result.plan.chunk(&keel_bundler::ChunkId::new("shared")).expect("shared chunk");
    assert!(shared.eager);
    assert_eq!(shared.modules, vec![b]);

    // C sits alone in a lazy chunk
    let lazy = result
        .plan
        .chunks
        .iter()
        .find(|chunk| chunk.modules.contains(&c))
        .expect("lazy chunk");
    assert!(!lazy.eager);
    assert_eq!(lazy.modules, vec![c]);

    // the entry group lists shared + its own chunk eagerly, the lazy chunk
    // on demand
    let group = result.plan.group("a").expect("entry group");
    assert_eq!(group.kind, ChunkGroupKind::Entry);
    assert_eq!(group.chunks.len(), 3);
}

#[tokio::test]
async fn module_shared_by_two_entries_is_hoisted_once() {
    let files: &[(&str, &str)] = &[
        ("src/one.js", "import './common';\nexport const one = 1;\n"),
        ("src/two.js", "import './common';\nexport const two = 2;\n"),
        ("src/common.js", "export const common = 0;\n"),
    ];
    let result = keel_bundler::BuildOptions::new_multiple(["src/one.js", "src/two.js"])
        .runtime(helpers::runtime(files))
        .build()
        .await
        .expect("build");

    let common = ModuleId::new("src/common.js").unwrap();
    let assigned = result.plan.assigned_modules();
    assert_eq!(assigned.iter().filter(|id| ***id == common).count(), 1);

    let holder = result
        .plan
        .chunks
        .iter()
        .find(|chunk| chunk.modules.contains(&common))
        .expect("chunk holding common");

    for name in ["one", "two"] {
        let group = result.plan.group(name).expect("entry group");
        assert!(
            group.chunks.contains(&holder.id),
            "group {name} must reference the shared chunk"
        );
    }
}

#[tokio::test]
async fn transitioned_subgraph_forms_its_own_group() {
    let result = build_with(
        &[
            (
                "src/entry.js",
                "import './server-only';\n(\"KEEL { transition: client }\");\nimport './page';\n",
            ),
            ("src/server-only.js", "export const s = 1;\n"),
            ("src/page.js", "import './hydrate';\nexport default 1;\n"),
            ("src/hydrate.js", "export const h = 1;\n"),
        ],
        "src/entry.js",
    )
    .transition(client_transition())
    .build()
    .await
    .expect("build");

    let transition_group = result
        .plan
        .groups
        .iter()
        .find(|group| group.kind == ChunkGroupKind::Transition)
        .expect("transition group");

    let client_page =
        ModuleId::with_context("src/page.js", ContextName::new("client")).unwrap();
    assert_eq!(transition_group.entry, client_page);

    // no chunk mixes contexts
    for chunk in &result.plan.chunks {
        let contexts: Vec<_> = chunk.modules.iter().map(|id| id.context().clone()).collect();
        assert!(
            contexts.windows(2).all(|pair| pair[0] == pair[1]),
            "chunk {} mixes contexts",
            chunk.id
        );
    }
}

#[tokio::test]
async fn instantiation_order_puts_first_import_first() {
    // the ipc module must instantiate before everything else in the chunk
    let result = build_with(
        &[
            (
                "src/entry.js",
                "import './ipc';\nimport './app';\nexport const e = 1;\n",
            ),
            ("src/ipc.js", "export const ipc = 1;\n"),
            ("src/app.js", "export const app = 1;\n"),
        ],
        "src/entry.js",
    )
    .build()
    .await
    .expect("build");

    let entry_chunk = result
        .plan
        .chunk(&keel_bundler::ChunkId::new("src/entry.js"))
        .expect("entry chunk");
    let order: Vec<&str> = entry_chunk
        .modules
        .iter()
        .map(|id| id.path())
        .collect();
    assert_eq!(order, vec!["src/ipc.js", "src/app.js", "src/entry.js"]);
}

#[tokio::test]
async fn max_chunk_size_splits_along_stable_order() {
    let big = "x".repeat(200);
    let a_src = format!("import './b';\nimport './c';\n// {big}\n");
    let files: Vec<(&str, &str)> = vec![
        ("src/a.js", a_src.as_str()),
        ("src/b.js", "export const b = 1;\n"),
        ("src/c.js", "export const c = 2;\n"),
    ];
    let result = build_with(&files, "src/a.js")
        .chunk_policy(ChunkPolicy {
            max_chunk_size: Some(64),
        })
        .build()
        .await
        .expect("build");

    // the entry subgraph no longer fits one chunk
    let parts: Vec<_> = result
        .plan
        .chunks
        .iter()
        .filter(|chunk| chunk.id.as_str().starts_with("src/a.js~"))
        .collect();
    assert!(parts.len() >= 2, "expected a size split, got {:?}", result.plan.chunks);

    // still no duplication
    let assigned = result.plan.assigned_modules();
    let mut paths: Vec<&str> = assigned.iter().map(|id| id.path()).collect();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(paths.len(), 3);
}

#[tokio::test]
async fn chunk_assignment_is_deterministic() {
    let files: &[(&str, &str)] = &[
        (
            "src/entry.js",
            "import './a';\nimport './b';\nconst l = import('./lazy');\n",
        ),
        ("src/a.js", "import './b';\n"),
        ("src/b.js", "export const b = 1;\n"),
        ("src/lazy.js", "import './a';\n"),
    ];

    let first = build_with(files, "src/entry.js").build().await.expect("build one");
    let second = build_with(files, "src/entry.js").build().await.expect("build two");

    assert_eq!(first.output.manifest_json, second.output.manifest_json);
    assert_eq!(first.fingerprint, second.fingerprint);

    let first_chunks: Vec<_> = first
        .plan
        .chunks
        .iter()
        .map(|c| (c.id.clone(), c.modules.clone(), c.fingerprint.clone()))
        .collect();
    let second_chunks: Vec<_> = second
        .plan
        .chunks
        .iter()
        .map(|c| (c.id.clone(), c.modules.clone(), c.fingerprint.clone()))
        .collect();
    assert_eq!(first_chunks, second_chunks);
}
