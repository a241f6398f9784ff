//! The local terminal side of attached sessions: size, raw mode, input, and
//! window-change tracking.

use std::io::{self, IsTerminal, Read};

use bollard::exec::ResizeExecOptions;
use tracing::warn;

use super::{ContainerExecClient, ExecRequest, exec_failed};
use crate::error::DevctrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TerminalSize {
    pub(super) width: u16,
    pub(super) height: u16,
}

/// The user's terminal as seen by an attached exec session.
pub(super) trait LocalTerminal {
    fn size(&self) -> Option<TerminalSize>;

    fn enter_raw_mode(&self) -> io::Result<()>;

    fn leave_raw_mode(&self) -> io::Result<()>;

    /// A blocking reader for keyboard input.
    fn input(&self) -> Box<dyn Read + Send>;
}

/// The process's own stdin and controlling terminal.
pub(super) struct SystemTerminal;

impl LocalTerminal for SystemTerminal {
    fn size(&self) -> Option<TerminalSize> {
        if !local_stdio_is_terminal() {
            return None;
        }
        let (width, height) = crossterm::terminal::size().ok()?;
        (width > 0 && height > 0).then_some(TerminalSize { width, height })
    }

    fn enter_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn leave_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn input(&self) -> Box<dyn Read + Send> {
        Box::new(io::stdin())
    }
}

/// Returns whether both stdin and stdout are attached to a terminal.
///
/// Callers use this to decide whether to request a pseudo-terminal.
#[must_use]
pub fn local_stdio_is_terminal() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Keeps the local terminal in raw mode while a TTY session is attached.
///
/// Keystrokes, including Ctrl-C, then reach the remote pseudo-terminal
/// unprocessed. The previous mode is restored on drop.
pub(super) struct RawModeGuard<'a, T: LocalTerminal> {
    terminal: &'a T,
    active: bool,
}

impl<'a, T: LocalTerminal> RawModeGuard<'a, T> {
    pub(super) fn enter(terminal: &'a T, request: &ExecRequest) -> Result<Self, DevctrError> {
        if !request.tty() {
            return Ok(Self {
                terminal,
                active: false,
            });
        }

        terminal.enter_raw_mode().map_err(|error| {
            exec_failed(
                request.container(),
                format!("failed to put the terminal in raw mode: {error}"),
            )
        })?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    #[cfg(test)]
    pub(super) const fn is_active(&self) -> bool {
        self.active
    }
}

impl<T: LocalTerminal> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(error) = self.terminal.leave_raw_mode() {
            warn!("Could not restore the terminal mode: {error}");
        }
    }
}

pub(super) async fn resize_to_local_terminal_async<C: ContainerExecClient, T: LocalTerminal>(
    client: &C,
    container: &str,
    exec_id: &str,
    terminal: &T,
) -> Result<(), DevctrError> {
    let Some(size) = terminal.size() else {
        return Ok(());
    };

    client
        .resize_exec(
            exec_id,
            ResizeExecOptions {
                width: size.width,
                height: size.height,
            },
        )
        .await
        .map_err(|error| exec_failed(container, format!("resize exec failed: {error}")))
}

/// Window-change notifications; inactive without a TTY or off Unix.
pub(super) struct ResizeListener {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl ResizeListener {
    #[cfg(unix)]
    pub(super) fn for_request(request: &ExecRequest) -> Result<Self, DevctrError> {
        if !request.tty() {
            return Ok(Self { signal: None });
        }

        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change())
            .map(|signal| Self {
                signal: Some(signal),
            })
            .map_err(|error| {
                exec_failed(
                    request.container(),
                    format!("failed to subscribe to SIGWINCH: {error}"),
                )
            })
    }

    #[cfg(not(unix))]
    pub(super) const fn for_request(_request: &ExecRequest) -> Result<Self, DevctrError> {
        Ok(Self {})
    }

    #[cfg(unix)]
    pub(super) const fn is_active(&self) -> bool {
        self.signal.is_some()
    }

    #[cfg(not(unix))]
    pub(super) const fn is_active(&self) -> bool {
        false
    }

    /// Resolves on the next window change; pending forever when inactive.
    pub(super) async fn changed(&mut self) {
        #[cfg(unix)]
        if let Some(signal) = self.signal.as_mut() {
            signal.recv().await;
            return;
        }
        std::future::pending::<()>().await;
    }
}
