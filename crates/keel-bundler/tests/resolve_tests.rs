//! Resolution behavior: eager statics, deferred dynamics, externals,
//! cycles, and error attribution.

mod helpers;

use helpers::build_with;
use keel_bundler::{EdgeKind, Error, ModuleId};

#[tokio::test]
async fn static_imports_resolve_eagerly() {
    let result = build_with(
        &[
            ("src/index.js", "import './a';\nimport './b';\n"),
            ("src/a.js", "export const a = 1;"),
            ("src/b.js", "import './a';\nexport const b = 2;"),
        ],
        "src/index.js",
    )
    .build()
    .await
    .expect("build");

    assert_eq!(result.statistics.module_count, 3);
    assert_eq!(result.statistics.entry_count, 1);

    let entry = ModuleId::new("src/index.js").unwrap();
    let a = ModuleId::new("src/a.js").unwrap();
    let b = ModuleId::new("src/b.js").unwrap();
    assert_eq!(result.graph.dependencies(&entry).unwrap(), vec![a.clone(), b.clone()]);
    assert_eq!(result.graph.dependents(&a).unwrap(), vec![b, entry]);
}

#[tokio::test]
async fn bare_imports_become_shared_externals() {
    let result = build_with(
        &[
            (
                "src/index.js",
                "import * as notFound from 'framework/pages/404';\nimport * as error from 'framework/error';\nimport './other';\n",
            ),
            ("src/other.js", "import * as error from 'framework/error';\n"),
        ],
        "src/index.js",
    )
    .build()
    .await
    .expect("build");

    let externals = result.graph.externals();
    assert_eq!(externals.len(), 2);
    // both importers share one handle per specifier
    let error_dep = externals
        .iter()
        .find(|dep| dep.specifier() == "framework/error")
        .expect("error external");
    assert_eq!(error_dep.importer_count(), 2);

    // externals never receive a manifest id
    assert_eq!(result.manifest.len(), 2);
}

#[tokio::test]
async fn unresolvable_specifier_reports_importer() {
    let err = build_with(
        &[("src/index.js", "import './missing';\n")],
        "src/index.js",
    )
    .build()
    .await
    .expect_err("build must fail");

    match err {
        Error::Resolution {
            specifier,
            importer,
        } => {
            assert_eq!(specifier, "./missing");
            assert_eq!(importer, Some(ModuleId::new("src/index.js").unwrap()));
        }
        other => panic!("expected resolution error, got {other}"),
    }
}

#[tokio::test]
async fn missing_entry_fails_without_importer() {
    let err = build_with(&[], "src/absent.js")
        .build()
        .await
        .expect_err("build must fail");
    match err {
        Error::Resolution { importer, .. } => assert!(importer.is_none()),
        other => panic!("expected resolution error, got {other}"),
    }
}

#[tokio::test]
async fn import_cycles_terminate() {
    let result = build_with(
        &[
            ("src/index.js", "import './a';\n"),
            ("src/a.js", "import './b';\nexport const a = 1;"),
            ("src/b.js", "import './a';\nexport const b = 2;"),
        ],
        "src/index.js",
    )
    .build()
    .await
    .expect("cyclic graph must still build");

    assert_eq!(result.statistics.module_count, 3);
    assert_eq!(result.statistics.cycle_count, 1);
}

#[tokio::test]
async fn self_import_terminates() {
    let result = build_with(
        &[("src/index.js", "import './index.js';\nexport const x = 1;")],
        "src/index.js",
    )
    .build()
    .await
    .expect("self-cycle must still build");
    assert_eq!(result.statistics.module_count, 1);
    assert_eq!(result.statistics.cycle_count, 1);
}

#[tokio::test]
async fn dynamic_edges_finalize_as_dynamic() {
    let result = build_with(
        &[
            ("src/index.js", "const lazy = import('./lazy');\n"),
            ("src/lazy.js", "export const lazy = true;"),
        ],
        "src/index.js",
    )
    .build()
    .await
    .expect("build");

    let entry = result
        .graph
        .module(&ModuleId::new("src/index.js").unwrap())
        .unwrap();
    let kinds: Vec<EdgeKind> = entry.imports_iter().map(|imp| imp.kind).collect();
    assert_eq!(kinds, vec![EdgeKind::Dynamic]);
    assert!(!entry.has_deferred_edges());

    // the lazy target still resolved into the graph
    assert!(result
        .graph
        .contains(&ModuleId::new("src/lazy.js").unwrap()));
}

#[tokio::test]
async fn no_deferred_edges_survive_a_ready_build() {
    let result = build_with(
        &[
            (
                "src/index.js",
                "import './a';\nconst c = import('./c');\n",
            ),
            ("src/a.js", ""),
            ("src/c.js", "import './a';\n"),
        ],
        "src/index.js",
    )
    .build()
    .await
    .expect("build");

    for module in result.graph.modules() {
        assert!(
            !module.has_deferred_edges(),
            "module {} kept a deferred edge past finalization",
            module.id
        );
    }
}
