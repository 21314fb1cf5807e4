//! The external compiler.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::request::BuildRequest;
use crate::utils::exec::Cmd;

/// What a toolchain run produced.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub success: bool,
    /// stdout and stderr, in one buffer.
    pub output: String,
    pub command_line: String,
}

/// Compiles a [`BuildRequest`] into its artifact.
///
/// `Err` means the toolchain could not be run at all; a compile failure is
/// an `Ok` output with `success == false`.
pub trait Toolchain: Send + Sync {
    fn compile(&self, request: &BuildRequest) -> Result<CompileOutput>;
}

impl<T: Toolchain + ?Sized> Toolchain for Box<T> {
    fn compile(&self, request: &BuildRequest) -> Result<CompileOutput> {
        (**self).compile(request)
    }
}

/// `rustc`, producing a `cdylib`.
#[derive(Debug, Clone)]
pub struct Rustc {
    program: PathBuf,
    edition: String,
    extra_args: Vec<String>,
}

impl Rustc {
    pub fn new(program: PathBuf, edition: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            program,
            edition: edition.into(),
            extra_args,
        }
    }

    /// Find `name` on `PATH` (or use it as is when it is a path).
    pub fn locate(name: &str, edition: impl Into<String>, extra_args: Vec<String>) -> Result<Self> {
        let program = which::which(name).with_context(|| format!("`{name}` not found"))?;
        Ok(Self::new(program, edition, extra_args))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The full command for `request`.
    pub fn command(&self, request: &BuildRequest) -> Cmd {
        let mut cmd = Cmd::new(&self.program)
            .args(["--crate-type", "cdylib", "--crate-name"])
            .arg(&request.crate_name)
            .arg("--edition")
            .arg(&self.edition)
            .args(["--error-format", "short", "--color", "never"]);

        for reference in &request.references {
            cmd = cmd.args(reference_args(reference));
        }

        cmd.args(&self.extra_args)
            .arg("-o")
            .arg(&request.output)
            .arg(&request.root)
            .cwd(&request.work_dir)
    }
}

impl Toolchain for Rustc {
    fn compile(&self, request: &BuildRequest) -> Result<CompileOutput> {
        let cmd = self.command(request);
        let command_line = cmd.command_line();
        crate::debug!("build"; "{}", command_line);

        let captured = cmd.run_captured()?;
        Ok(CompileOutput {
            success: captured.success(),
            output: captured.output,
            command_line,
        })
    }
}

/// Command-line arguments linking one resolved reference.
///
/// - `libfoo-1a2b.rlib`, `libfoo.so`, `foo.dll` → `--extern foo=<path> -L dependency=<dir>`
/// - `libfoo.a`, `foo.lib` → `-L native=<dir> -l static=foo`
/// - `foo` → `--extern foo`
pub fn reference_args(reference: &Path) -> Vec<OsString> {
    let ext = reference
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    let name = library_name(reference);
    let dir = reference
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut args = Vec::new();
    match ext.as_deref() {
        Some("rlib" | "so" | "dylib" | "dll") => {
            let mut extern_arg = OsString::from(format!("{name}="));
            extern_arg.push(reference);
            let mut search = OsString::from("dependency=");
            search.push(dir);
            args.extend([OsString::from("--extern"), extern_arg, OsString::from("-L"), search]);
        }
        Some("a" | "lib") => {
            let mut search = OsString::from("native=");
            search.push(dir);
            args.extend([
                OsString::from("-L"),
                search,
                OsString::from("-l"),
                OsString::from(format!("static={name}")),
            ]);
        }
        _ => {
            let bare = reference.to_string_lossy().replace('-', "_");
            args.extend([OsString::from("--extern"), OsString::from(bare)]);
        }
    }
    args
}

/// Crate or library name of an artifact file name.
fn library_name(reference: &Path) -> String {
    let stem = reference
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_prefix("lib").unwrap_or(&stem);
    let stem = stem.split('-').next().unwrap_or(stem);
    stem.replace('-', "_")
}
