//! Tests for install plan files
//!
//! These tests verify:
//! - Plans survive a save/load cycle through a real file
//! - Load errors carry the file path
//! - Built sequences run against the mock runner and real files

use std::fs;
use std::sync::Arc;

use installkit::command::MockRunner;
use installkit::plan::{InstallPlan, StepConfig, ValueSource};
use installkit::registry::InMemoryConfigStore;
use installkit::sequence::SequenceState;
use installkit::task::TaskContext;
use tempfile::TempDir;

const PLAN: &str = r#"{
    "name": "plugin-setup",
    "resources": { "venv_dir": "build/venv" },
    "steps": [
        { "task": "create_environment", "path": { "resource": "venv_dir" }, "store_in": "venv" },
        {
            "task": "install_to_environment",
            "environment": "venv",
            "packages": ["requests", "attrs"]
        },
        {
            "task": "install_wheel",
            "name": "Offline wheel",
            "environment": "venv",
            "wheel": "dist/pkg.whl",
            "args": ["--no-deps"]
        }
    ]
}"#;

fn context() -> (TaskContext, Arc<MockRunner>) {
    let runner = Arc::new(MockRunner::new());
    let ctx = TaskContext::new(runner.clone(), Arc::new(InMemoryConfigStore::new()));
    (ctx, runner)
}

#[test]
fn test_save_and_load_plan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.json");

    let plan: InstallPlan = serde_json::from_str(PLAN).unwrap();
    plan.save_to_file(&path).unwrap();
    let loaded = InstallPlan::load_from_file(&path).unwrap();

    assert_eq!(loaded, plan);
    assert_eq!(loaded.name.as_deref(), Some("plugin-setup"));
    assert_eq!(loaded.steps.len(), 3);
    assert!(matches!(
        &loaded.steps[0],
        StepConfig::CreateEnvironment {
            path: ValueSource::Resource { resource },
            ..
        } if resource == "venv_dir"
    ));
}

#[test]
fn test_load_missing_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let err = InstallPlan::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_load_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{"steps": [{"task": "reboot"}]}"#).unwrap();

    let err = InstallPlan::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse install plan JSON"));
}

#[test]
fn test_built_plan_runs_in_order() {
    let (ctx, runner) = context();
    let plan: InstallPlan = serde_json::from_str(PLAN).unwrap();

    let mut sequence = plan.build(&ctx).unwrap();
    assert_eq!(
        sequence.task_names(),
        vec!["CreatePythonEnvironment", "InstallToVirtualEnvironment", "Offline wheel"]
    );
    sequence.execute().unwrap();
    assert_eq!(sequence.state(), SequenceState::Completed);

    let commands = runner.executed_commands();
    assert_eq!(commands[0], vec!["python", "-m", "venv", "build/venv"]);
    assert!(commands[1].ends_with(&["requests".to_string(), "attrs".to_string()]));
    assert!(commands[2].ends_with(&["--no-deps".to_string(), "dist/pkg.whl".to_string()]));
}

#[test]
fn test_file_steps_from_plan() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("settings.ini");
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();
    fs::write(&source, "[core]").unwrap();

    let plan = InstallPlan {
        name: None,
        resources: [("target".to_string(), target.display().to_string())].into(),
        steps: vec![
            StepConfig::CopyFiles {
                name: None,
                sources: vec![ValueSource::Literal(source.display().to_string())],
                target: ValueSource::Resource {
                    resource: "target".to_string(),
                },
            },
            StepConfig::DeleteFiles {
                name: None,
                paths: vec![ValueSource::Literal(source.display().to_string())],
                fail_on_doesnt_exist: true,
            },
        ],
    };

    let (ctx, _) = context();
    plan.build(&ctx).unwrap().execute().unwrap();

    assert!(!source.exists());
    assert_eq!(fs::read_to_string(target.join("settings.ini")).unwrap(), "[core]");
}

#[test]
fn test_build_rejects_invalid_plan() {
    let (ctx, runner) = context();
    let plan: InstallPlan =
        serde_json::from_str(r#"{"steps": [{"task": "pip_install", "package": " "}]}"#).unwrap();

    assert!(plan.build(&ctx).is_err());
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_preset_string_is_not_an_environment() {
    let plan: InstallPlan = serde_json::from_str(
        r#"{
            "resources": { "venv": "build/venv" },
            "steps": [
                {
                    "task": "install_to_environment",
                    "environment": "venv",
                    "packages": ["requests"]
                }
            ]
        }"#,
    )
    .unwrap();

    let err = plan.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Step 1 needs resource `venv` to be a python environment, but it holds a string"
    );

    let (ctx, runner) = context();
    assert!(plan.build(&ctx).is_err());
    assert!(runner.executed_commands().is_empty());
    assert!(ctx.resources.is_empty());
}

#[test]
fn test_registry_value_is_not_an_environment() {
    let plan: InstallPlan = serde_json::from_str(
        r#"{
            "steps": [
                {
                    "task": "read_registry",
                    "path": "HKLM\\SOFTWARE\\Python\\InstallPath",
                    "store_in": "python_home"
                },
                {
                    "task": "install_wheel",
                    "environment": "python_home",
                    "wheel": "dist/pkg.whl"
                }
            ]
        }"#,
    )
    .unwrap();

    let err = plan.validate().unwrap_err();
    assert!(err.to_string().contains("but it holds a registry value"));
}

#[test]
fn test_environment_is_not_a_path() {
    let plan: InstallPlan = serde_json::from_str(
        r#"{
            "steps": [
                { "task": "create_environment", "path": "build/venv", "store_in": "venv" },
                { "task": "copy_files", "sources": ["a.txt"], "target": { "resource": "venv" } }
            ]
        }"#,
    )
    .unwrap();

    let err = plan.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Step 2 needs resource `venv` to be a string, but it holds a python environment"
    );
}

#[test]
fn test_registry_value_reads_as_path() {
    let plan: InstallPlan = serde_json::from_str(
        r#"{
            "steps": [
                {
                    "task": "read_registry",
                    "path": "HKCU\\Software\\Vendor\\PluginDir",
                    "store_in": "plugin_dir"
                },
                {
                    "task": "copy_files",
                    "sources": ["a.txt"],
                    "target": { "resource": "plugin_dir" }
                }
            ]
        }"#,
    )
    .unwrap();

    plan.validate().unwrap();
}
