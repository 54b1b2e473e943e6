//! Static import scan.
//!
//! One pass over a module's source, in line order, extracting import and
//! require edges plus transition directives. The scan is structural: module
//! payloads are opaque to the pipeline, so only the import surface and the
//! directive statements are interpreted.
//!
//! A transition directive is a string expression statement of the shape
//!
//! ```text
//! ("KEEL { transition: client }");
//! ```
//!
//! and is positional: it applies to every import that follows it in the
//! same file.

use memchr::memmem;
use once_cell::sync::Lazy;
use regex::Regex;

use keel_graph::{ContextName, EdgeKind};

static STATIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*import\s+(?:[\w$*{},\s]+?\s+from\s+)?["']([^"']+)["']"#).expect("static import pattern")
});

static EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*export\s+(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s+from\s+["']([^"']+)["']"#)
        .expect("export-from pattern")
});

static DYNAMIC_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).expect("dynamic import pattern"));

static REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\brequire\s*\(\s*["']([^"']+)["']\s*\)"#).expect("require pattern"));

static TRANSITION_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\(?\s*["']KEEL\s*\{\s*transition\s*:\s*([A-Za-z0-9_-]+)\s*\}\s*["']\s*\)?\s*;?\s*$"#)
        .expect("transition directive pattern")
});

/// One import site found by the scan, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImport {
    pub specifier: String,
    pub kind: EdgeKind,
    /// Transition directive in effect at this import site.
    pub transition: Option<ContextName>,
}

/// Scan a module source for import edges and transition directives.
pub fn scan_source(source: &str) -> Vec<ScannedImport> {
    let stripped = strip_block_comments(source);
    let mut imports = Vec::new();
    let mut active_transition: Option<ContextName> = None;

    for line in stripped.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        // cheap reject before the regex pass
        if memmem::find(line.as_bytes(), b"import").is_none()
            && memmem::find(line.as_bytes(), b"export").is_none()
            && memmem::find(line.as_bytes(), b"require").is_none()
            && memmem::find(line.as_bytes(), b"KEEL").is_none()
        {
            continue;
        }

        if let Some(captures) = TRANSITION_DIRECTIVE.captures(line) {
            active_transition = Some(ContextName::new(&captures[1]));
            continue;
        }

        if let Some(captures) = STATIC_IMPORT.captures(line) {
            imports.push(ScannedImport {
                specifier: captures[1].to_string(),
                kind: EdgeKind::Static,
                transition: active_transition.clone(),
            });
            continue;
        }

        if let Some(captures) = EXPORT_FROM.captures(line) {
            imports.push(ScannedImport {
                specifier: captures[1].to_string(),
                kind: EdgeKind::Static,
                transition: active_transition.clone(),
            });
            continue;
        }

        for captures in DYNAMIC_IMPORT.captures_iter(line) {
            imports.push(ScannedImport {
                specifier: captures[1].to_string(),
                kind: EdgeKind::Dynamic,
                transition: active_transition.clone(),
            });
        }

        for captures in REQUIRE.captures_iter(line) {
            imports.push(ScannedImport {
                specifier: captures[1].to_string(),
                kind: EdgeKind::Static,
                transition: active_transition.clone(),
            });
        }
    }

    imports
}

/// Replace `/* ... */` spans with spaces, preserving newlines so line
/// positions (and directive ordering) survive.
fn strip_block_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;

    while let Some(start) = memmem::find(&bytes[pos..], b"/*") {
        let start = pos + start;
        out.push_str(&source[pos..start]);
        let end = memmem::find(&bytes[start + 2..], b"*/")
            .map(|offset| start + 2 + offset + 2)
            .unwrap_or(bytes.len());
        for ch in source[start..end].chars() {
            out.push(if ch == '\n' { '\n' } else { ' ' });
        }
        pos = end;
    }
    out.push_str(&source[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_static_import_forms() {
        let source = r#"
import startHandler from "framework/internal/page-server-handler";
import App from "framework/app";
import * as notFoundModule from "framework/pages/404";
import "./side-effect";
import { a, b } from "./named";
export { c } from "./re-export";
export * from "./star";
"#;
        let imports = scan_source(source);
        let specifiers: Vec<&str> = imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(
            specifiers,
            vec![
                "framework/internal/page-server-handler",
                "framework/app",
                "framework/pages/404",
                "./side-effect",
                "./named",
                "./re-export",
                "./star",
            ]
        );
        assert!(imports.iter().all(|i| i.kind == EdgeKind::Static));
        assert!(imports.iter().all(|i| i.transition.is_none()));
    }

    #[test]
    fn first_import_order_is_preserved() {
        // the handler import must stay first so its side effects run first
        let source = "import ipc from \"./ipc\";\nimport App from \"./app\";\n";
        let imports = scan_source(source);
        assert_eq!(imports[0].specifier, "./ipc");
    }

    #[test]
    fn dynamic_import_and_require() {
        let source = r#"
const page = import("./lazy-page");
const legacy = require("./legacy");
"#;
        let imports = scan_source(source);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].kind, EdgeKind::Dynamic);
        assert_eq!(imports[0].specifier, "./lazy-page");
        assert_eq!(imports[1].kind, EdgeKind::Static);
        assert_eq!(imports[1].specifier, "./legacy");
    }

    #[test]
    fn transition_directive_applies_to_subsequent_imports() {
        let source = r#"
import Document from "framework/document";
("KEEL { transition: client }");
import chunkGroup from ".";
import hydrate from "./hydrate";
"#;
        let imports = scan_source(source);
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].transition, None);
        assert_eq!(imports[1].transition, Some(ContextName::new("client")));
        assert_eq!(imports[2].transition, Some(ContextName::new("client")));
    }

    #[test]
    fn commented_out_imports_are_ignored() {
        let source = r#"
// import dead from "./dead";
/* import alsoDead from "./also-dead"; */
import live from "./live";
"#;
        let imports = scan_source(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./live");
    }

    #[test]
    fn directive_tolerates_parenthesized_and_bare_forms() {
        for line in [
            "(\"KEEL { transition: client }\");",
            "'KEEL { transition: client }';",
            "  (\"KEEL {transition: client}\") ",
        ] {
            let source = format!("{line}\nimport x from \"./x\";\n");
            let imports = scan_source(&source);
            assert_eq!(
                imports[0].transition,
                Some(ContextName::new("client")),
                "failed for {line:?}"
            );
        }
    }
}
