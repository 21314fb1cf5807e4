//! Build request generation.
//!
//! Every build gets a generated crate root that stitches the master and its
//! includes into one compilation unit:
//!
//! ```text
//! hello_7.rs
//! ├── mod host          support module (output, panic capture)
//! ├── mod resources     non-source includes, embedded
//! ├── mod hello         include!("/scripts/hello.rs")
//! ├── mod strings       include!("/scripts/lib/strings.rs")
//! ├── pub use hello::*, strings::*
//! └── scripthost_invoke + SCRIPTHOST_ABI_VERSION (single entry point only)
//! ```
//!
//! Each file module glob-imports its parent, so public items of every file
//! are visible in every other file. Private items stay private to their
//! file: a helper shared across files must be declared `pub`.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::entry::EntryCandidate;
use crate::directive::ResolvedBuildSet;
use crate::utils::path::file_stem_lossy;

const PRELUDE: &str = include_str!("script_prelude.in");

/// Names a file module must not take.
const RESERVED: &[&str] = &[
    "abstract", "alloc", "as", "async", "await", "become", "box", "break", "const", "continue",
    "core", "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen",
    "host", "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
    "priv", "pub", "ref", "resources", "return", "self", "static", "std", "struct", "super",
    "trait", "true", "try", "type", "typeof", "union", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Everything the toolchain needs for one build run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub master: PathBuf,
    pub generation: u64,
    pub crate_name: String,
    /// Generated crate root.
    pub root: PathBuf,
    /// Expected artifact.
    pub output: PathBuf,
    /// Directory the toolchain runs in.
    pub work_dir: PathBuf,
    pub references: Vec<PathBuf>,
}

/// Turn a file stem into a lowercase identifier.
pub fn sanitize_ident(stem: &str) -> String {
    let mut ident: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if ident.is_empty() || ident.chars().all(|c| c == '_') {
        ident = "script".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) || RESERVED.contains(&ident.as_str()) {
        ident.insert_str(0, "script_");
    }
    ident
}

/// Crate name for one build run of `master`.
pub fn crate_name(master: &Path, generation: u64) -> String {
    format!("{}_{generation}", sanitize_ident(&file_stem_lossy(master)))
}

/// Render the crate root for `set`.
///
/// The invoke trampoline is only emitted for `entry`; without it the
/// artifact still builds, so compile errors surface first.
pub fn render_root(set: &ResolvedBuildSet, entry: Option<&EntryCandidate>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "// Generated by scripthost for {}", set.master().path().display());
    out.push_str("#![allow(dead_code, unused_imports, unused_unsafe, non_snake_case)]\n\n");

    out.push_str("pub mod host {\n");
    out.push_str(PRELUDE);
    out.push_str("}\n\n");

    render_resources(&mut out, set);

    let mut taken = FxHashSet::default();
    let mut entry_module = None;

    for unit in set.sources() {
        let module = unique_ident(&file_stem_lossy(unit.path()), &mut taken);
        let holds_entry = entry.is_some_and(|e| e.file == unit.path());

        let _ = writeln!(out, "pub mod {module} {{");
        out.push_str("    use super::*;\n");
        let _ = writeln!(out, "    include!({:?});", unit.path().to_string_lossy());
        if let Some(entry) = entry.filter(|_| holds_entry) {
            out.push_str(
                "    pub(crate) fn __scripthost_entry() -> ::core::result::Result<(), ::std::string::String> {\n",
            );
            let _ = writeln!(
                out,
                "        crate::host::__ScriptOutcome::__into_outcome({}())",
                entry.call
            );
            out.push_str("    }\n");
            entry_module = Some(module.clone());
        }
        out.push_str("}\n");
        let _ = writeln!(out, "pub use {module}::*;\n");
    }

    if let Some(module) = entry_module {
        out.push_str("#[unsafe(no_mangle)]\n");
        out.push_str("pub static SCRIPTHOST_ABI_VERSION: u32 = host::ABI_VERSION;\n\n");
        out.push_str("#[unsafe(no_mangle)]\n");
        out.push_str("pub unsafe extern \"C\" fn scripthost_invoke(api: *const host::HostApi) -> u32 {\n");
        let _ = writeln!(out, "    unsafe {{ host::__enter(api, {module}::__scripthost_entry) }}");
        out.push_str("}\n");
    }

    out
}

fn render_resources(out: &mut String, set: &ResolvedBuildSet) {
    let mut names = FxHashSet::default();

    out.push_str("pub mod resources {\n");
    out.push_str("    static FILES: &[(&str, &[u8])] = &[\n");
    for unit in set.resources() {
        let Some(name) = unit.path().file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !names.insert(name.clone()) {
            crate::debug!("build"; "resource name {} taken, skipping {}", name, unit.path().display());
            continue;
        }
        let _ = writeln!(
            out,
            "        ({name:?}, include_bytes!({:?})),",
            unit.path().to_string_lossy()
        );
    }
    out.push_str("    ];\n\n");
    out.push_str("    /// Contents of the embedded file `name`.\n");
    out.push_str("    pub fn get(name: &str) -> Option<&'static [u8]> {\n");
    out.push_str("        FILES.iter().find(|(n, _)| *n == name).map(|(_, bytes)| *bytes)\n");
    out.push_str("    }\n\n");
    out.push_str("    /// Names of all embedded files.\n");
    out.push_str("    pub fn names() -> impl Iterator<Item = &'static str> {\n");
    out.push_str("        FILES.iter().map(|(n, _)| *n)\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");
}

fn unique_ident(stem: &str, taken: &mut FxHashSet<String>) -> String {
    let base = sanitize_ident(stem);
    let mut ident = base.clone();
    let mut n = 2;
    while !taken.insert(ident.clone()) {
        ident = format!("{base}_{n}");
        n += 1;
    }
    ident
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::build::entry::discover;
    use crate::directive::DirectiveResolver;

    #[test]
    fn test_sanitize_ident() {
        assert_eq!(sanitize_ident("Hello-World"), "hello_world");
        assert_eq!(sanitize_ident("1st"), "script_1st");
        assert_eq!(sanitize_ident("fn"), "script_fn");
        assert_eq!(sanitize_ident("host"), "script_host");
        assert_eq!(sanitize_ident("---"), "script");
    }

    #[test]
    fn test_crate_name_embeds_generation() {
        assert_eq!(crate_name(Path::new("/s/My Script.rs"), 12), "my_script_12");
    }

    #[test]
    fn test_unique_ident() {
        let mut taken = FxHashSet::default();
        assert_eq!(unique_ident("util", &mut taken), "util");
        assert_eq!(unique_ident("util", &mut taken), "util_2");
        assert_eq!(unique_ident("Util", &mut taken), "util_3");
    }

    #[test]
    fn test_render_root() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(
            dir.join("hello.rs"),
            "//css_include sub/hello.rs;\n//css_include data.txt;\nstruct Program;\nimpl Program { fn main() {} }\n",
        )
        .unwrap();
        fs::write(dir.join("sub/hello.rs"), "pub fn helper() {}\n").unwrap();
        fs::write(dir.join("data.txt"), "payload").unwrap();

        let set = DirectiveResolver::new(None)
            .resolve(&dir.join("hello.rs"), |_| {})
            .unwrap();
        let master = set.master().path().to_path_buf();
        let source = fs::read_to_string(&master).unwrap();
        let entry = discover(&master, &source).pop().unwrap();

        let root = render_root(&set, Some(&entry));
        assert!(root.contains("pub mod host {"));
        assert!(root.contains("pub mod hello {"));
        assert!(root.contains("pub mod hello_2 {"));
        assert!(root.contains("pub use hello_2::*;"));
        assert!(root.contains("(\"data.txt\", include_bytes!("));
        assert!(root.contains("__into_outcome(Program::main())"));
        assert!(root.contains("host::__enter(api, hello::__scripthost_entry)"));
        assert_eq!(root.matches("__scripthost_entry()").count(), 1);
    }

    #[test]
    fn test_render_root_without_entry() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("lib.rs"), "pub fn f() {}\n").unwrap();
        let set = DirectiveResolver::new(None)
            .resolve(&temp.path().join("lib.rs"), |_| {})
            .unwrap();

        let root = render_root(&set, None);
        assert!(!root.contains("scripthost_invoke"));
        assert!(!root.contains("SCRIPTHOST_ABI_VERSION"));
    }
}
