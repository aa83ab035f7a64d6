use std::collections::BTreeSet;

use ramfuzz_ast::parse_tu;
use ramfuzz_codegen::{generate, GenConfig, GeneratedCode, RUNTIME_HEADER};

fn shapes(config: &GenConfig) -> GeneratedCode {
    let tu = parse_tu(include_str!("fixtures/shapes.json")).unwrap();
    generate(&[tu], config).unwrap()
}

/// Identifiers following `runtime::` in `text`.
fn runtime_names(text: &str) -> BTreeSet<String> {
    text.split("runtime::")
        .skip(1)
        .map(|rest| {
            rest.chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[test]
fn test_runtime_classes_defined() {
    let out = shapes(&GenConfig::default());
    let mut names = runtime_names(&out.header);
    names.extend(runtime_names(&out.source));
    assert!(names.contains("gen"));
    assert!(names.contains("depth_guard"));
    for name in &names {
        assert!(
            RUNTIME_HEADER.contains(&format!("class {name} ")),
            "runtime::{name} is emitted but not defined"
        );
    }
}

#[test]
fn test_runtime_members_defined() {
    let out = shapes(&GenConfig::default());
    let code = format!("{}{}", out.header, out.source);

    let uses = [
        ("guard.breached()", "bool breached() const"),
        ("g.make< ", "template <typename T> T *make(uint64_t valueid, bool allow_subclass = false)"),
        ("g.between(0u, ccount - 1, ", "template <typename T> T between(T lo, T hi, uint64_t valueid)"),
        ("runtime::gen::make< ", "template <typename T> T *make("),
        ("template <> class harness< ", "template <class T> class harness;"),
    ];
    for (used, defined) in uses {
        assert!(code.contains(used), "generator no longer emits {used:?}");
        assert!(RUNTIME_HEADER.contains(defined), "runtime lacks {defined:?}");
    }
}

#[test]
fn test_harness_members_used_by_runtime() {
    let out = shapes(&GenConfig::default());
    for member in ["ccount", "mcount", "mroulette", "submakers", "subcount"] {
        assert!(RUNTIME_HEADER.contains(&format!("H::{member}")));
        assert!(out.header.contains(member));
    }
    assert!(RUNTIME_HEADER.contains("h.release()"));
    assert!(out.header.contains(" *release() { return pobj.release(); }"));
    assert!(out.header.contains("operator bool() const"));
}

#[test]
fn test_depth_limit_matches_runtime_crate() {
    assert!(RUNTIME_HEADER.contains("constexpr unsigned depthlimit = 4;"));
    assert!(RUNTIME_HEADER.contains("explicit depth_guard(unsigned &depth) : depth(depth) { ++depth; }"));
    assert!(RUNTIME_HEADER.contains("return depth > depthlimit;"));
}

#[test]
fn test_runtime_namespace_follows_config() {
    assert!(RUNTIME_HEADER.contains("namespace RAMFUZZ_NAMESPACE {"));
    let config = GenConfig {
        namespace: "fz".to_string(),
        ..GenConfig::default()
    };
    let out = shapes(&config);
    assert!(out.header.starts_with("#define RAMFUZZ_NAMESPACE fz\n"));
    assert!(out.header.contains("namespace fz {"));
}
