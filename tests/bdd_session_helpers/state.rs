//! Scenario state for session behavioural tests.

use std::sync::Arc;

use camino::Utf8PathBuf;
use devctr::session::SessionReport;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

use super::fake_runtime::FakeRuntime;

/// Host directories laid out for one scenario.
#[derive(Debug, Clone)]
pub(crate) struct Workspace {
    /// Keeps the temporary tree alive for the scenario.
    pub(crate) _temp: Arc<TempDir>,
    pub(crate) install_dir: Utf8PathBuf,
    pub(crate) src_dir: Utf8PathBuf,
    pub(crate) project_dir: Utf8PathBuf,
}

#[derive(Default, ScenarioState)]
pub(crate) struct DevSessionState {
    pub(crate) engine: Slot<FakeRuntime>,
    pub(crate) workspace: Slot<Workspace>,
    pub(crate) busy_ports: Slot<Vec<u16>>,
    pub(crate) report: Slot<SessionReport>,
    pub(crate) error: Slot<String>,
}

#[fixture]
pub(crate) fn dev_session_state() -> DevSessionState {
    let state = DevSessionState::default();
    state.engine.set(FakeRuntime::default());
    state.busy_ports.set(Vec::new());
    state
}
