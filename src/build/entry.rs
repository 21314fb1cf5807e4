//! Entry point discovery.
//!
//! A script's entry point is a parameterless, non-generic function named
//! `main` (ASCII case-insensitive), either free at the top level of a source
//! file or associated with an inherent `impl` block:
//!
//! ```ignore
//! fn main() { ... }                    // call path: main
//!
//! struct Program;
//! impl Program {
//!     fn Main() -> Result<(), String>  // call path: Program::Main
//! }
//! ```
//!
//! Discovery runs on the sources before the toolchain is invoked. A file that
//! does not parse contributes no candidates; the compiler reports it.

use std::path::{Path, PathBuf};

use syn::{FnArg, ImplItem, Item, Signature, Type};

/// A function named `main` found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCandidate {
    /// Source file declaring the function.
    pub file: PathBuf,
    /// Path that calls the function from within the file's module.
    pub call: String,
    /// Whether the function declares parameters (including `self`).
    pub has_inputs: bool,
}

impl EntryCandidate {
    /// Whether the function can serve as the entry point.
    #[inline]
    pub fn qualifies(&self) -> bool {
        !self.has_inputs
    }
}

/// Collect every `main`-named function of `source`.
pub fn discover(file: &Path, source: &str) -> Vec<EntryCandidate> {
    let Ok(parsed) = syn::parse_file(source) else {
        crate::debug!("entry"; "{} does not parse, skipped", file.display());
        return Vec::new();
    };

    let mut found = Vec::new();
    for item in &parsed.items {
        match item {
            Item::Fn(func) => {
                if let Some(has_inputs) = main_signature(&func.sig) {
                    found.push(EntryCandidate {
                        file: file.to_path_buf(),
                        call: func.sig.ident.to_string(),
                        has_inputs,
                    });
                }
            }
            Item::Impl(block) if block.trait_.is_none() && block.generics.params.is_empty() => {
                let Some(owner) = plain_type_path(&block.self_ty) else {
                    continue;
                };
                for member in &block.items {
                    if let ImplItem::Fn(func) = member
                        && let Some(has_inputs) = main_signature(&func.sig)
                    {
                        found.push(EntryCandidate {
                            file: file.to_path_buf(),
                            call: format!("{owner}::{}", func.sig.ident),
                            has_inputs,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    found
}

/// `Some(has_inputs)` when `sig` is a synchronous, non-generic `main`.
fn main_signature(sig: &Signature) -> Option<bool> {
    let named_main = sig.ident.to_string().eq_ignore_ascii_case("main");
    if !named_main || sig.asyncness.is_some() || !sig.generics.params.is_empty() {
        return None;
    }
    let has_inputs = sig
        .inputs
        .iter()
        .any(|arg| matches!(arg, FnArg::Receiver(_) | FnArg::Typed(_)));
    Some(has_inputs)
}

/// Render a type path without generic arguments, e.g. `Program`.
fn plain_type_path(ty: &Type) -> Option<String> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let mut rendered = Vec::with_capacity(path.path.segments.len());
    for segment in &path.path.segments {
        if !segment.arguments.is_none() {
            return None;
        }
        rendered.push(segment.ident.to_string());
    }
    Some(rendered.join("::"))
}
