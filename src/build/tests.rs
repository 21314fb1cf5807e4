use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tempfile::TempDir;

use super::*;
use crate::directive::DirectiveResolver;

/// Stands in for rustc: writes (or withholds) the artifact.
#[derive(Clone, Default)]
struct FakeToolchain {
    fail_with: Option<String>,
    skip_artifact: bool,
    seen: Arc<Mutex<Vec<BuildRequest>>>,
    output_existed: Arc<Mutex<Vec<bool>>>,
}

impl Toolchain for FakeToolchain {
    fn compile(&self, request: &BuildRequest) -> Result<CompileOutput> {
        self.seen.lock().push(request.clone());
        self.output_existed.lock().push(request.output.exists());

        if let Some(output) = &self.fail_with {
            return Ok(CompileOutput {
                success: false,
                output: output.clone(),
                command_line: "fake-rustc".to_string(),
            });
        }
        if !self.skip_artifact {
            fs::write(&request.output, b"artifact")?;
        }
        Ok(CompileOutput {
            success: true,
            output: String::new(),
            command_line: "fake-rustc".to_string(),
        })
    }
}

fn setup(source: &str) -> (TempDir, ResolvedBuildSet) {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("inst")).unwrap();
    let master = temp.path().join("hello.rs");
    fs::write(&master, source).unwrap();
    let set = DirectiveResolver::new(None).resolve(&master, |_| {}).unwrap();
    (temp, set)
}

fn orchestrator(temp: &Path, toolchain: FakeToolchain) -> BuildOrchestrator {
    BuildOrchestrator::new(toolchain, temp.join("inst"))
}

#[test]
fn test_generations_strictly_increase() {
    let (temp, set) = setup("fn main() {}\n");
    let builds = orchestrator(temp.path(), FakeToolchain::default());

    let mut generations = Vec::new();
    for _ in 0..5 {
        let artifact = builds.build(&set).unwrap();
        generations.push(artifact.generation());
        thread::sleep(Duration::from_millis(5));
    }

    assert!(generations.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_artifact_named_after_master_and_generation() {
    let (temp, set) = setup("fn main() {}\n");
    let builds = orchestrator(temp.path(), FakeToolchain::default());

    let artifact = builds.build(&set).unwrap();
    let expected = format!(
        "hello_{}.{}",
        artifact.generation(),
        std::env::consts::DLL_EXTENSION
    );
    assert_eq!(artifact.path().file_name().unwrap().to_string_lossy(), expected);
    assert_eq!(artifact.master(), set.master().path());
    assert!(artifact.root().is_file());
    assert_eq!(artifact.entries().len(), 1);
}

#[test]
fn test_request_carries_references_and_work_dir() {
    let (temp, _) = setup("");
    let master = temp.path().join("hello.rs");
    fs::write(&master, "//css_ref serde;\nfn main() {}\n").unwrap();
    let set = DirectiveResolver::new(None).resolve(&master, |_| {}).unwrap();

    let toolchain = FakeToolchain::default();
    let builds = orchestrator(temp.path(), toolchain.clone());
    let artifact = builds.build(&set).unwrap();

    let seen = toolchain.seen.lock();
    let request = &seen[0];
    assert_eq!(request.references, vec![std::path::PathBuf::from("serde")]);
    assert_eq!(request.work_dir, temp.path().join("inst"));
    assert_eq!(request.crate_name, format!("hello_{}", artifact.generation()));
}

#[test]
fn test_stale_output_removed_before_compile() {
    let (temp, set) = setup("fn main() {}\n");
    let toolchain = FakeToolchain::default();
    let builds = orchestrator(temp.path(), toolchain.clone());

    // Plant the file the next generation will produce.
    let upcoming = NEXT_GENERATION.load(Ordering::Relaxed);
    let planted = temp.path().join("inst").join(format!(
        "hello_{upcoming}.{}",
        std::env::consts::DLL_EXTENSION
    ));
    fs::write(&planted, b"old").unwrap();

    let artifact = builds.build(&set).unwrap();
    if artifact.generation() == upcoming {
        assert!(!toolchain.output_existed.lock()[0]);
    }
}

#[test]
fn test_compile_failure_positions_first_error() {
    let (temp, set) = setup("fn main() { x }\n");
    let master = set.master().path().to_path_buf();
    let toolchain = FakeToolchain {
        fail_with: Some(format!(
            "{}:1:13: error[E0425]: cannot find value `x` in this scope\n",
            master.display()
        )),
        ..FakeToolchain::default()
    };
    let builds = orchestrator(temp.path(), toolchain);

    let err = builds.build(&set).unwrap_err();
    assert!(matches!(err, ScriptError::Build { .. }));
    let diag = err.diagnostic();
    assert_eq!(diag.file, master);
    assert_eq!((diag.line, diag.column), (1, 13));
    assert!(diag.message.contains("While executing command 'fake-rustc'"));
}

#[test]
fn test_missing_artifact_after_success() {
    let (temp, set) = setup("fn main() {}\n");
    let toolchain = FakeToolchain {
        skip_artifact: true,
        ..FakeToolchain::default()
    };
    let builds = orchestrator(temp.path(), toolchain);

    let err = builds.build(&set).unwrap_err();
    assert!(matches!(err, ScriptError::Build { .. }));
    assert_eq!(err.diagnostic().file, set.master().path());
}

#[test]
fn test_several_entries_still_build() {
    let (temp, set) = setup("fn main() {}\nstruct P;\nimpl P { fn main() {} }\n");
    let builds = orchestrator(temp.path(), FakeToolchain::default());

    let artifact = builds.build(&set).unwrap();
    assert_eq!(artifact.entries().len(), 2);
    let root = fs::read_to_string(artifact.root()).unwrap();
    assert!(!root.contains("scripthost_invoke"));
}
