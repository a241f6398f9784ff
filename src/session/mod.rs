//! Development sessions: from the current directory to an attached shell.
//!
//! A session derives the container identity from the working directory,
//! reads the environment descriptor, and then drives the container from
//! whatever state it is in (absent, stopped, or running) to an attached
//! shell in the matching working directory.

mod controller;
mod identity;
mod init;
mod ports;
mod settings;
mod workdir;

pub use controller::{Invocation, SessionController, SessionPath, SessionReport, SessionState};
pub use identity::{ContainerIdentity, NamingScheme};
pub use init::InitScript;
pub use ports::{
    PortChecker, PortMapping, SkipReason, TcpPortChecker, negotiate_create, negotiate_start_existing,
    parse_port_entry, published_ports,
};
pub use settings::SessionSettings;
pub use workdir::resolve_workdir;
