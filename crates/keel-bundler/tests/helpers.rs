//! Shared test utilities for keel-bundler tests.

#![allow(dead_code)]

use std::sync::Arc;

use keel_bundler::{
    BuildOptions, MemoryRuntime, TargetEnv, TransitionContext,
};

/// Build an in-memory runtime from (path, source) pairs.
pub fn runtime(files: &[(&str, &str)]) -> Arc<MemoryRuntime> {
    let runtime = MemoryRuntime::new();
    for (path, content) in files {
        runtime.insert(*path, *content);
    }
    Arc::new(runtime)
}

/// BuildOptions over an in-memory fixture with sensible test defaults.
pub fn build_with(files: &[(&str, &str)], entry: &str) -> BuildOptions {
    BuildOptions::new(entry).runtime(runtime(files))
}

/// The client transition used across fixtures.
pub fn client_transition() -> TransitionContext {
    TransitionContext::new("client", TargetEnv::browser())
}

/// Assert an asset's code contains a substring, with a readable preview on
/// failure.
pub fn assert_code_contains(code: &str, substring: &str) {
    assert!(
        code.contains(substring),
        "expected code to contain '{}'.\npreview (first 500 chars): {}",
        substring,
        &code[..code.len().min(500)]
    );
}
