//! In-memory container engine for session scenarios.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use devctr::engine::{
    BuildRequest, ContainerDetails, ContainerRuntime, ContainerSummary, CreateContainerRequest,
    ExecMode, ExecRequest, LogsRequest, PortPublish, PruneScope, PruneSummary,
};
use devctr::error::{ContainerError, DevctrError, Result};

/// One container as the fake engine remembers it.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeContainer {
    pub(crate) running: bool,
    pub(crate) image: String,
    pub(crate) binds: Vec<String>,
    pub(crate) ports: Vec<PortPublish>,
}

/// Everything the fake engine saw.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub(crate) containers: BTreeMap<String, FakeContainer>,
    pub(crate) creates: Vec<CreateContainerRequest>,
    pub(crate) starts: Vec<String>,
    pub(crate) stops: Vec<String>,
    pub(crate) removes: Vec<String>,
    pub(crate) execs: Vec<ExecRequest>,
    pub(crate) builds: Vec<BuildRequest>,
}

/// Cheaply cloneable handle to a shared [`Journal`].
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRuntime {
    journal: Arc<Mutex<Journal>>,
}

impl FakeRuntime {
    pub(crate) fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn seed(&self, name: &str, container: FakeContainer) {
        self.journal()
            .containers
            .insert(String::from(name), container);
    }
}

fn not_found(name: &str) -> DevctrError {
    DevctrError::from(ContainerError::NotFound {
        name: String::from(name),
    })
}

impl ContainerRuntime for FakeRuntime {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.journal().containers.contains_key(name))
    }

    fn running(&self, name: &str) -> Result<bool> {
        Ok(self
            .journal()
            .containers
            .get(name)
            .is_some_and(|container| container.running))
    }

    fn create(&self, request: &CreateContainerRequest) -> Result<()> {
        let mut journal = self.journal();
        if journal.containers.contains_key(request.name()) {
            return Err(DevctrError::from(ContainerError::AlreadyExists {
                name: String::from(request.name()),
            }));
        }
        journal.creates.push(request.clone());
        journal.containers.insert(
            String::from(request.name()),
            FakeContainer {
                running: true,
                image: String::from(request.image()),
                binds: request.binds().to_vec(),
                ports: request.ports().to_vec(),
            },
        );
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        let mut journal = self.journal();
        let container = journal
            .containers
            .get_mut(name)
            .ok_or_else(|| not_found(name))?;
        container.running = true;
        journal.starts.push(String::from(name));
        Ok(())
    }

    fn stop(&self, name: &str, _timeout_secs: u64) -> Result<()> {
        let mut journal = self.journal();
        let container = journal
            .containers
            .get_mut(name)
            .ok_or_else(|| not_found(name))?;
        container.running = false;
        journal.stops.push(String::from(name));
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut journal = self.journal();
        journal
            .containers
            .remove(name)
            .ok_or_else(|| not_found(name))?;
        journal.removes.push(String::from(name));
        Ok(())
    }

    fn exec(&self, request: &ExecRequest) -> Result<i64> {
        let mut journal = self.journal();
        let running = journal
            .containers
            .get(request.container())
            .is_some_and(|container| container.running);
        if !running {
            return Err(DevctrError::from(ContainerError::ExecFailed {
                container_id: String::from(request.container()),
                message: String::from("container is not running"),
            }));
        }
        journal.execs.push(request.clone());
        Ok(0)
    }

    fn inspect_ports(&self, name: &str) -> Result<Vec<PortPublish>> {
        self.journal()
            .containers
            .get(name)
            .map(|container| container.ports.clone())
            .ok_or_else(|| not_found(name))
    }

    fn update_remove_publish(&self, name: &str, port: &PortPublish) -> Result<()> {
        Err(DevctrError::from(ContainerError::UpdateFailed {
            container_id: String::from(name),
            message: format!("cannot unpublish {}", port.port_key()),
        }))
    }

    fn inspect(&self, name: &str) -> Result<ContainerDetails> {
        let journal = self.journal();
        let container = journal.containers.get(name).ok_or_else(|| not_found(name))?;
        Ok(ContainerDetails {
            name: String::from(name),
            running: container.running,
            ports: container.ports.clone(),
            ..ContainerDetails::default()
        })
    }

    fn image_created(&self, _image: &str) -> Result<Option<String>> {
        Ok(Some(String::from("2026-10-01T00:00:00Z")))
    }

    fn list(&self, prefix: &str) -> Result<Vec<ContainerSummary>> {
        Ok(self
            .journal()
            .containers
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, container)| ContainerSummary {
                name: name.clone(),
                running: container.running,
                status: String::from(if container.running { "Up" } else { "Exited (0)" }),
            })
            .collect())
    }

    fn logs(&self, name: &str, _request: &LogsRequest) -> Result<()> {
        self.exists(name)
            .and_then(|exists| if exists { Ok(()) } else { Err(not_found(name)) })
    }

    fn prune(&self, _scope: PruneScope) -> Result<PruneSummary> {
        let mut journal = self.journal();
        let before = journal.containers.len();
        journal.containers.retain(|_, container| container.running);
        Ok(PruneSummary {
            containers: before - journal.containers.len(),
            ..PruneSummary::default()
        })
    }

    fn build(&self, request: &BuildRequest) -> Result<()> {
        self.journal().builds.push(request.clone());
        Ok(())
    }
}

/// Detached execs are initialization runs; attached ones are shells.
pub(crate) fn count_execs(journal: &Journal, mode: ExecMode) -> usize {
    journal
        .execs
        .iter()
        .filter(|request| request.mode() == mode)
        .count()
}
