//! Assertion steps for session scenarios.

use devctr::engine::ExecMode;
use devctr::session::{PortMapping, SessionPath, SessionReport, SkipReason};
use rstest_bdd_macros::then;

use super::StepResult;
use super::fake_runtime::count_execs;
use super::state::DevSessionState;
use super::steps::{IMAGE, engine, project_container, workspace};

fn report(state: &DevSessionState) -> StepResult<SessionReport> {
    if let Some(message) = state.error.get() {
        return Err(format!("session failed: {message}"));
    }
    state
        .report
        .get()
        .ok_or_else(|| String::from("session report should be set"))
}

#[then("a container is created from the configured image")]
fn container_created(dev_session_state: &DevSessionState) -> StepResult<()> {
    let name = project_container(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    let [request] = journal.creates.as_slice() else {
        return Err(format!("expected one create, saw {}", journal.creates.len()));
    };
    let stored_image = journal
        .containers
        .get(&name)
        .map(|container| container.image.as_str());
    if request.name() != name || request.image() != IMAGE || stored_image != Some(IMAGE) {
        return Err(format!(
            "created {} from {}, expected {name} from {IMAGE}",
            request.name(),
            request.image()
        ));
    }
    Ok(())
}

#[then("the container working directory is {path}")]
fn container_working_directory(dev_session_state: &DevSessionState, path: String) -> StepResult<()> {
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    let working_dirs: Vec<Option<&str>> = journal
        .creates
        .iter()
        .map(|request| request.working_dir())
        .collect();
    if working_dirs == [Some(path.as_str())] {
        Ok(())
    } else {
        Err(format!("expected one create in {path}, saw {working_dirs:?}"))
    }
}

#[then("the source tree is mounted at {target}")]
fn source_tree_mounted(dev_session_state: &DevSessionState, target: String) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    let name = project_container(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    let binds = journal
        .containers
        .get(&name)
        .map(|container| container.binds.clone())
        .unwrap_or_default();
    let expected = format!("{}:{target}", layout.src_dir);
    if binds.contains(&expected) {
        Ok(())
    } else {
        Err(format!("expected bind {expected}, got {binds:?}"))
    }
}

#[then("host port {host} is published to container port {container}")]
fn port_published(
    dev_session_state: &DevSessionState,
    host: u16,
    container: String,
) -> StepResult<()> {
    let published: Vec<_> = report(dev_session_state)?
        .ports
        .iter()
        .filter_map(PortMapping::published)
        .cloned()
        .collect();
    if published
        .iter()
        .any(|port| port.host_port == host && port.container_port == container)
    {
        Ok(())
    } else {
        Err(format!("{host}:{container} not published in {published:?}"))
    }
}

#[then("no host ports are published")]
fn no_ports_published(dev_session_state: &DevSessionState) -> StepResult<()> {
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    match journal.creates.first() {
        Some(request) if request.ports().is_empty() => Ok(()),
        Some(request) => Err(format!("unexpected ports {:?}", request.ports())),
        None => Err(String::from("no container was created")),
    }
}

#[then("host port {port} is skipped as in use")]
fn port_skipped(dev_session_state: &DevSessionState, port: u16) -> StepResult<()> {
    let skipped = report(dev_session_state)?.ports.iter().any(|mapping| {
        matches!(mapping, PortMapping::Skip { reason: SkipReason::InUse(busy), .. } if *busy == port)
    });
    if skipped {
        Ok(())
    } else {
        Err(format!("port {port} was not skipped"))
    }
}

#[then("host port {port} is marked for unpublishing")]
fn port_unpublished(dev_session_state: &DevSessionState, port: u16) -> StepResult<()> {
    let marked = report(dev_session_state)?.ports.iter().any(|mapping| {
        matches!(mapping, PortMapping::Unpublish(publish) if publish.host_port == port)
    });
    if marked {
        Ok(())
    } else {
        Err(format!("port {port} was not marked for unpublishing"))
    }
}

fn expect_init_runs(state: &DevSessionState, times: usize) -> StepResult<()> {
    let runtime = engine(state)?;
    let seen = count_execs(&runtime.journal(), ExecMode::Detached);
    if seen == times {
        Ok(())
    } else {
        Err(format!("expected {times} initialization runs, saw {seen}"))
    }
}

#[then("the initialization script ran once")]
fn init_ran_once(dev_session_state: &DevSessionState) -> StepResult<()> {
    expect_init_runs(dev_session_state, 1)
}

#[then("the initialization script did not run")]
fn init_did_not_run(dev_session_state: &DevSessionState) -> StepResult<()> {
    expect_init_runs(dev_session_state, 0)
}

#[then("the shell starts in {path}")]
fn shell_starts_in(dev_session_state: &DevSessionState, path: String) -> StepResult<()> {
    let workdir = report(dev_session_state)?.workdir;
    if workdir.as_str() != path {
        return Err(format!("expected workdir {path}, got {workdir}"));
    }

    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    let shell = journal
        .execs
        .iter()
        .find(|request| request.mode() == ExecMode::Attached)
        .ok_or_else(|| String::from("no shell was attached"))?;
    if shell.command() == ["/bin/bash"] && shell.working_dir() == Some(path.as_str()) {
        Ok(())
    } else {
        Err(format!("unexpected shell request {shell:?}"))
    }
}

#[then("no container is created")]
fn no_container_created(dev_session_state: &DevSessionState) -> StepResult<()> {
    let runtime = engine(dev_session_state)?;
    let creates = runtime.journal().creates.len();
    if creates == 0 {
        Ok(())
    } else {
        Err(format!("expected no creates, saw {creates}"))
    }
}

#[then("no container is started")]
fn no_container_started(dev_session_state: &DevSessionState) -> StepResult<()> {
    let runtime = engine(dev_session_state)?;
    let starts = runtime.journal().starts.clone();
    if starts.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no starts, saw {starts:?}"))
    }
}

#[then("the session path is {path}")]
fn session_path_is(dev_session_state: &DevSessionState, path: String) -> StepResult<()> {
    let expected = match path.as_str() {
        "attached" => SessionPath::Attached,
        "started" => SessionPath::Started,
        "created" => SessionPath::Created,
        other => return Err(format!("unknown session path {other}")),
    };
    let actual = report(dev_session_state)?.path;
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected:?}, got {actual:?}"))
    }
}

#[then("the project container is running")]
fn project_running(dev_session_state: &DevSessionState) -> StepResult<()> {
    let name = project_container(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let running = runtime
        .journal()
        .containers
        .get(&name)
        .is_some_and(|container| container.running);
    if running {
        Ok(())
    } else {
        Err(format!("{name} should be running"))
    }
}

#[then("the container name is {name}")]
fn container_name_is(dev_session_state: &DevSessionState, name: String) -> StepResult<()> {
    let identity = report(dev_session_state)?.identity;
    if identity.as_str() == name {
        Ok(())
    } else {
        Err(format!("expected {name}, got {identity}"))
    }
}

#[then("the project container no longer exists")]
fn project_gone(dev_session_state: &DevSessionState) -> StepResult<()> {
    let name = project_container(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    if journal.containers.contains_key(&name) {
        return Err(format!("{name} still exists"));
    }
    if journal.stops != [name.clone()] || journal.removes != [name.clone()] {
        return Err(format!(
            "expected one stop and one remove of {name}, saw {:?} and {:?}",
            journal.stops, journal.removes
        ));
    }
    Ok(())
}

#[then("the image is built from the install directory")]
fn image_built(dev_session_state: &DevSessionState) -> StepResult<()> {
    let layout = workspace(dev_session_state)?;
    let runtime = engine(dev_session_state)?;
    let journal = runtime.journal();
    let [request] = journal.builds.as_slice() else {
        return Err(format!("expected one build, saw {}", journal.builds.len()));
    };
    if request.context_dir() == layout.install_dir && request.tag() == IMAGE {
        Ok(())
    } else {
        Err(format!(
            "built {} from {}, expected {IMAGE} from {}",
            request.tag(),
            request.context_dir(),
            layout.install_dir
        ))
    }
}
