//! Source hygiene checks for the pixelboard crate.
//!
//! Every production file under `src/` is scanned for patterns that crash the
//! page or swallow errors. Each pattern carries a budget. Budgets only go down.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden substring and how many lines may contain it.
struct Budget {
    pattern: &'static str,
    max: usize,
    hint: &'static str,
}

const PANICS: &[Budget] = &[
    Budget { pattern: ".unwrap()", max: 0, hint: "propagate with `?` or handle the None/Err case" },
    Budget { pattern: ".expect(", max: 0, hint: "propagate with `?` or handle the None/Err case" },
    Budget { pattern: "panic!(", max: 0, hint: "return an error instead" },
    Budget { pattern: "unreachable!(", max: 0, hint: "make the match exhaustive" },
    Budget { pattern: "todo!(", max: 0, hint: "finish the stub" },
    Budget { pattern: "unimplemented!(", max: 0, hint: "finish the stub" },
];

const DISCARDS: &[Budget] = &[
    Budget { pattern: "let _ =", max: 0, hint: "inspect or log the value" },
    Budget { pattern: ".ok()", max: 0, hint: "match on the Result and log the error" },
];

const STYLE: &[Budget] = &[
    Budget { pattern: "#[allow(dead_code)]", max: 0, hint: "delete the unused code" },
    Budget { pattern: "println!(", max: 0, hint: "use tracing" },
    Budget { pattern: "dbg!(", max: 0, hint: "remove debugging output" },
];

struct SourceFile {
    path: PathBuf,
    content: String,
}

/// Production `.rs` files under `src/`; sibling `*_test.rs` files are skipped.
fn production_sources() -> Vec<SourceFile> {
    let mut out = Vec::new();
    walk(&Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), &mut out);
    out
}

fn walk(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.is_dir() {
            walk(&path, out);
            continue;
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if !name.ends_with(".rs") || name.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path, content });
        }
    }
}

fn check(budgets: &[Budget]) {
    let files = production_sources();
    assert!(!files.is_empty(), "no sources found");

    let mut failures = Vec::new();
    for budget in budgets {
        let hits: Vec<String> = files
            .iter()
            .flat_map(|file| {
                file.content
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.contains(budget.pattern))
                    .map(|(n, _)| format!("  {}:{}", file.path.display(), n + 1))
            })
            .collect();
        if hits.len() > budget.max {
            failures.push(format!(
                "`{}` budget exceeded: found {}, max {} ({}).\n{}",
                budget.pattern,
                hits.len(),
                budget.max,
                budget.hint,
                hits.join("\n")
            ));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn panic_budgets() {
    check(PANICS);
}

#[test]
fn discard_budgets() {
    check(DISCARDS);
}

#[test]
fn style_budgets() {
    check(STYLE);
}

#[test]
fn every_test_file_is_wired_in() {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
    let Ok(entries) = fs::read_dir(&src) else {
        panic!("cannot read {}", src.display());
    };
    for path in entries.flatten().map(|e| e.path()) {
        let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let Some(module) = name.strip_suffix("_test.rs") else {
            continue;
        };
        let parent = src.join(format!("{module}.rs"));
        let content = fs::read_to_string(&parent).unwrap_or_default();
        assert!(
            content.contains(&format!("#[path = \"{name}\"]")),
            "{name} is not declared by {}",
            parent.display()
        );
    }
}
