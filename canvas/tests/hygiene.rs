//! Hygiene: source-level rules checked at test time.
//!
//! Production code under `src/` is scanned for patterns that crash the editor
//! or swallow errors. Each pattern has a budget (zero for all of them). Test
//! files and the test-only recording surface are not scanned.

use std::fs;
use std::path::{Path, PathBuf};

struct SourceFile {
    path: String,
    content: String,
}

/// Pattern, budget, and why it is rationed.
const RULES: &[(&str, usize, &str)] = &[
    (".unwrap()", 0, "panics on None/Err"),
    (".expect(", 0, "panics on None/Err"),
    ("panic!(", 0, "aborts the page"),
    ("unreachable!(", 0, "aborts the page"),
    ("todo!(", 0, "unfinished code"),
    ("unimplemented!(", 0, "unfinished code"),
    ("let _ =", 0, "discards a result without looking at it"),
    (".ok()", 0, "turns an error into a silent None"),
    ("#[allow(dead_code)]", 0, "hides unused code"),
];

fn is_test_only(path: &Path) -> bool {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    name.ends_with("_test.rs") || name == "test_support.rs"
}

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

fn all_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_rs_files(Path::new("src"), &mut files);
    files.sort();
    files
}

/// Production `.rs` files under `src/`.
fn production_sources() -> Vec<SourceFile> {
    all_files()
        .into_iter()
        .filter(|p| !is_test_only(p))
        .filter_map(|p| {
            let content = fs::read_to_string(&p).ok()?;
            Some(SourceFile { path: p.to_string_lossy().into_owned(), content })
        })
        .collect()
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .map(|f| (f.path.clone(), f.content.lines().filter(|l| l.contains(pattern)).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
}

#[test]
fn scanner_sees_the_crate() {
    let files = production_sources();
    assert!(files.iter().any(|f| f.path.ends_with("engine.rs")), "run from the crate root");
    assert!(files.iter().all(|f| !f.path.ends_with("_test.rs")));
}

#[test]
fn pattern_budgets() {
    let files = production_sources();
    let mut report = Vec::new();
    for (pattern, budget, why) in RULES {
        let found = hits(&files, pattern);
        let count: usize = found.iter().map(|(_, n)| n).sum();
        if count > *budget {
            report.push(format!("`{pattern}` ({why}): {count} > {budget}"));
            report.extend(found.iter().map(|(path, n)| format!("    {path}: {n}")));
        }
    }
    assert!(report.is_empty(), "hygiene budgets exceeded:\n{}", report.join("\n"));
}

#[test]
fn declared_test_modules_exist() {
    let missing: Vec<String> = all_files()
        .iter()
        .filter(|p| !is_test_only(p))
        .flat_map(|p| {
            let dir = p.parent().map(Path::to_path_buf).unwrap_or_default();
            let content = fs::read_to_string(p).unwrap_or_default();
            content
                .lines()
                .filter_map(|l| l.trim().strip_prefix("#[path = \"")?.strip_suffix("\"]").map(str::to_owned))
                .filter(|name| !dir.join(name).exists())
                .map(|name| format!("{}: {name}", p.display()))
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(missing.is_empty(), "test modules declared but missing:\n{}", missing.join("\n"));
}
