//! End-to-end tests for the concrete tasks run through a sequence
//!
//! Commands go to a `MockRunner`; file tasks use real temporary directories.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use installkit::command::MockRunner;
use installkit::environment::PythonEnvironment;
use installkit::registry::{InMemoryConfigStore, RegistryPath, RegistryValue};
use installkit::sequence::{Sequence, SequenceState};
use installkit::task::{Outcome, Task, TaskContext};
use installkit::tasks::{
    CopyFiles, CreatePythonEnvironment, DeleteFiles, InstallOfflineWheel,
    InstallToVirtualEnvironment, ModifyResource, PipInstallPackage, ReadValueFromRegistry,
};
use tempfile::TempDir;

fn context(runner: MockRunner) -> (TaskContext, Arc<MockRunner>) {
    let runner = Arc::new(runner);
    let ctx = TaskContext::new(runner.clone(), Arc::new(InMemoryConfigStore::new()));
    (ctx, runner)
}

fn environment_pipeline(ctx: &TaskContext) -> Sequence {
    let venv = ctx.resources.resource::<PythonEnvironment>("venv");
    Sequence::new(vec![
        Box::new(CreatePythonEnvironment::new(ctx, "build/venv", "venv")),
        Box::new(InstallToVirtualEnvironment::new(
            ctx,
            vec!["requests".to_string()],
            venv.clone(),
        )),
        Box::new(InstallOfflineWheel::new(ctx, "pkg.whl", venv)),
    ])
}

// =============================================================================
// Environment pipeline
// =============================================================================

#[test]
fn test_create_install_and_wheel_succeed() {
    let (ctx, runner) = context(MockRunner::new());
    let mut sequence = environment_pipeline(&ctx);

    assert_eq!(sequence.execute().unwrap(), Outcome::Success);
    assert_eq!(sequence.state(), SequenceState::Completed);

    let commands = runner.executed_commands();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0], vec!["python", "-m", "venv", "build/venv"]);
    assert!(commands[1].contains(&"requests".to_string()));
    assert_eq!(commands[2].last().unwrap(), "pkg.whl");

    let env: PythonEnvironment = ctx.resources.get("venv").unwrap();
    assert_eq!(env.root(), std::path::Path::new("build/venv"));
}

#[test]
fn test_failed_install_skips_wheel() {
    let (ctx, runner) = context(MockRunner::new().fail_when_contains("requests", 1));
    let mut sequence = environment_pipeline(&ctx);

    let err = sequence.execute().unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Installation of InstallToVirtualEnvironment failed. Error: "));
    assert!(message.contains("requests"));

    assert_eq!(runner.call_count(), 2);
    assert!(runner
        .executed_commands()
        .iter()
        .all(|command| !command.iter().any(|arg| arg == "pkg.whl")));
    assert_eq!(sequence.state(), SequenceState::Failed);
}

#[test]
fn test_missing_environment_fails_with_key() {
    let (ctx, runner) = context(MockRunner::new());
    let task = InstallToVirtualEnvironment::new(
        &ctx,
        vec!["requests".to_string()],
        ctx.resources.resource::<PythonEnvironment>("never_created"),
    );

    let outcome = task.execute();
    assert!(outcome.error().unwrap().contains("never_created"));
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_deferred_parameter_set_after_construction() {
    let (ctx, runner) = context(MockRunner::new());
    let task = PipInstallPackage::new(&ctx, "numpy")
        .version("1.26.4")
        .python(ctx.resources.resource::<String>("interpreter"));

    ctx.resources
        .set("interpreter", "/opt/python/bin/python3".to_string())
        .unwrap();
    assert!(task.execute().is_success());
    assert_eq!(
        runner.executed_commands()[0][..4],
        ["/opt/python/bin/python3", "-m", "pip", "install"]
    );
    assert!(runner.executed_commands()[0].contains(&"numpy==1.26.4".to_string()));
}

// =============================================================================
// Registry and resources
// =============================================================================

#[test]
fn test_registry_value_flows_into_copy_target() {
    let plugins = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let plugin = source.path().join("plugin.rhp");
    fs::write(&plugin, "binary").unwrap();

    let key: RegistryPath = r"HKLM\SOFTWARE\App\InstallDir".parse().unwrap();
    let store = InMemoryConfigStore::from_entries([(
        key,
        RegistryValue::String(plugins.path().display().to_string()),
    )]);
    let ctx = TaskContext::new(Arc::new(MockRunner::new()), Arc::new(store));

    let mut sequence = Sequence::new(vec![
        Box::new(ReadValueFromRegistry::new(
            &ctx,
            r"HKEY_LOCAL_MACHINE\SOFTWARE\App\InstallDir",
            "install_dir",
        )),
        Box::new(ModifyResource::transform(
            &ctx,
            "install_dir",
            "plugin_dir",
            |value: &RegistryValue| PathBuf::from(value.to_string()),
        )),
        Box::new(CopyFiles::new(
            plugin,
            ctx.resources.resource::<PathBuf>("plugin_dir"),
        )),
    ]);

    sequence.execute().unwrap();
    assert_eq!(
        fs::read_to_string(plugins.path().join("plugin.rhp")).unwrap(),
        "binary"
    );
}

#[test]
fn test_delete_is_idempotent_without_fail_flag() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("stale.log");
    fs::write(&file, "old").unwrap();

    let (ctx, _) = context(MockRunner::new());
    ctx.resources.set("marker", 1u8).unwrap();

    let task = DeleteFiles::new(file.clone()).fail_on_doesnt_exist(false);
    assert!(task.execute().is_success());
    assert!(task.execute().is_success());
    assert!(!file.exists());

    assert_eq!(ctx.resources.keys(), vec!["marker".to_string()]);
    assert_eq!(ctx.resources.get::<u8>("marker").unwrap(), 1);
}

#[test]
fn test_custom_names_reach_errors() {
    let (ctx, _) = context(MockRunner::new());
    let mut sequence = Sequence::new(vec![Box::new(
        DeleteFiles::new(PathBuf::from("definitely-missing.tmp")).with_name("Cleanup"),
    )]);

    let err = sequence.execute().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Installation of Cleanup failed. Error: File not found: definitely-missing.tmp"
    );
    assert!(ctx.resources.is_empty());
}
