//! Given/when steps for session scenarios.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use devctr::api::{BuildCommand, CommandContext, delete, rebuild};
use devctr::engine::{HostOptions, PortPublish};
use devctr::session::{Invocation, NamingScheme, PortChecker, SessionController, SessionSettings};
use mockable::MockEnv;
use rstest_bdd_macros::{given, when};

use super::StepResult;
use super::fake_runtime::{FakeContainer, FakeRuntime};
use super::state::{DevSessionState, Workspace};

pub(crate) const IMAGE: &str = "devctr-dev:test";

/// Port checker answering from the scenario's list of busy ports.
struct ScenarioPorts(Vec<u16>);

impl PortChecker for ScenarioPorts {
    fn is_free(&self, port: u16) -> bool {
        !self.0.contains(&port)
    }
}

pub(crate) fn settings_for(workspace: &Workspace) -> SessionSettings {
    SessionSettings {
        image: String::from(IMAGE),
        install_dir: workspace.install_dir.clone(),
        descriptor_file: String::from("dev.env"),
        container_home: Utf8PathBuf::from("/home/me"),
        shell: String::from("/bin/bash"),
        naming: NamingScheme::new("dev", "dev-main"),
        stop_timeout_secs: 1,
        host: HostOptions::default(),
    }
}

fn empty_env() -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string().returning(|_| None);
    env
}

pub(crate) fn workspace(state: &DevSessionState) -> StepResult<Workspace> {
    state
        .workspace
        .get()
        .ok_or_else(|| String::from("workspace should be prepared"))
}

pub(crate) fn engine(state: &DevSessionState) -> StepResult<FakeRuntime> {
    state
        .engine
        .get()
        .ok_or_else(|| String::from("engine should be configured"))
}

pub(crate) fn project_container(state: &DevSessionState) -> StepResult<String> {
    let layout = workspace(state)?;
    let settings = settings_for(&layout);
    Ok(String::from(
        settings
            .naming
            .identity(&layout.project_dir, &layout.install_dir)
            .as_str(),
    ))
}

fn utf8(path: &std::path::Path) -> StepResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|raw| format!("{} is not UTF-8", raw.display()))
        .and_then(|dir| {
            dir.canonicalize_utf8()
                .map_err(|error| format!("cannot canonicalise {dir}: {error}"))
        })
}

#[given("a project checked out under a mounted source tree")]
fn given_project(dev_session_state: &DevSessionState) -> StepResult<()> {
    let temp = tempfile::tempdir().map_err(|error| format!("tempdir: {error}"))?;
    let root = utf8(temp.path())?;
    let install_dir = root.join(".dev");
    let src_dir = root.join("src");
    let project_dir = src_dir.join("api");
    for dir in [&install_dir, &project_dir] {
        std::fs::create_dir_all(dir).map_err(|error| format!("create {dir}: {error}"))?;
    }

    let descriptor = format!("MOUNT={src_dir}:/home/me/src\nPORT=8080:80\nEDITOR=nvim\n");
    std::fs::write(install_dir.join("dev.env"), descriptor)
        .map_err(|error| format!("write descriptor: {error}"))?;

    dev_session_state.workspace.set(Workspace {
        _temp: Arc::new(temp),
        install_dir,
        src_dir,
        project_dir,
    });
    Ok(())
}

#[given("no container exists for the project")]
fn given_no_container(dev_session_state: &DevSessionState) -> StepResult<()> {
    let name = project_container(dev_session_state)?;
    if engine(dev_session_state)?.journal().containers.contains_key(&name) {
        return Err(format!("{name} should not exist yet"));
    }
    Ok(())
}

fn seed_project_container(state: &DevSessionState, running: bool) -> StepResult<()> {
    let name = project_container(state)?;
    engine(state)?.seed(
        &name,
        FakeContainer {
            running,
            image: String::from(IMAGE),
            binds: Vec::new(),
            ports: vec![PortPublish {
                host_port: 8080,
                container_port: String::from("80"),
            }],
        },
    );
    Ok(())
}

#[given("the project container is running")]
fn given_running(dev_session_state: &DevSessionState) -> StepResult<()> {
    seed_project_container(dev_session_state, true)
}

#[given("the project container is stopped")]
fn given_stopped(dev_session_state: &DevSessionState) -> StepResult<()> {
    seed_project_container(dev_session_state, false)
}

#[given("host port {port} is in use")]
fn given_port_in_use(dev_session_state: &DevSessionState, port: u16) {
    let mut busy = dev_session_state.busy_ports.get().unwrap_or_default();
    busy.push(port);
    dev_session_state.busy_ports.set(busy);
}

fn run_session(state: &DevSessionState, cwd: &Utf8Path) -> StepResult<()> {
    let layout = workspace(state)?;
    let runtime = engine(state)?;
    let settings = settings_for(&layout);
    let env = empty_env();
    let checker = ScenarioPorts(state.busy_ports.get().unwrap_or_default());

    let descriptor = settings.load_descriptor(&env);
    let controller = SessionController::new(&runtime, &checker, &settings);
    let invocation = Invocation::from_dir(cwd, false)
        .map_err(|error| format!("cannot resolve {cwd}: {error}"))?;
    match controller.run(&invocation, &descriptor) {
        Ok(report) => state.report.set(report),
        Err(error) => state.error.set(error.to_string()),
    }
    Ok(())
}

#[when("dev is run from the project")]
fn when_run_from_project(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    run_session(dev_session_state, &layout.project_dir)
}

#[when("dev is run from the install directory")]
fn when_run_from_install_dir(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    run_session(dev_session_state, &layout.install_dir)
}

#[when("dev is run through a symlink to the install directory")]
fn when_run_through_symlink(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    let parent = layout
        .install_dir
        .parent()
        .ok_or_else(|| String::from("install directory should have a parent"))?;
    let link = parent.join("dev-link");
    std::os::unix::fs::symlink(&layout.install_dir, &link)
        .map_err(|error| format!("symlink {link}: {error}"))?;
    let trailing = Utf8PathBuf::from(format!("{link}/"));
    run_session(dev_session_state, &trailing)
}

#[when("the project container is deleted")]
fn when_deleted(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let settings = settings_for(&layout);
    let env = empty_env();
    let ctx = CommandContext {
        runtime: &runtime,
        settings: &settings,
        env: &env,
        cwd: &layout.project_dir,
    };

    delete(&ctx, None)
        .map(|_| ())
        .map_err(|error| format!("delete failed: {error}"))
}

#[when("the image is rebuilt from the project")]
fn when_rebuilt(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let settings = settings_for(&layout);
    let env = empty_env();
    let ctx = CommandContext {
        runtime: &runtime,
        settings: &settings,
        env: &env,
        cwd: &layout.project_dir,
    };

    rebuild(&ctx, None, &BuildCommand::default())
        .map(|_| ())
        .map_err(|error| format!("rebuild failed: {error}"))
}
