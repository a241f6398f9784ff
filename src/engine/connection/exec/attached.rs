//! Attached exec sessions: stdin forwarding, output streaming, and resizes.

use std::io::{self, Read};
use std::pin::Pin;
use std::time::Duration;

use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::terminal::{
    LocalTerminal, RawModeGuard, ResizeListener, resize_to_local_terminal_async,
};
use super::{ContainerExecClient, EXEC_INSPECT_POLL_INTERVAL_MS, ExecRequest, exec_failed};
use crate::error::DevctrError;

type OutputStream = Pin<Box<dyn Stream<Item = Result<LogOutput, BollardError>> + Send>>;
type InputSink = Pin<Box<dyn AsyncWrite + Send>>;

const INPUT_CHUNK_BYTES: usize = 4096;
const INPUT_QUEUE_DEPTH: usize = 16;

/// Stream the session until the remote side closes its output.
///
/// Keyboard input is read on a plain OS thread, never on the async
/// runtime's blocking pool, so a read still pending when the shell exits
/// cannot hold up runtime shutdown. The thread ends on its next read once
/// the session is gone.
pub(super) async fn run_attached_session_async<C: ContainerExecClient, T: LocalTerminal>(
    client: &C,
    request: &ExecRequest,
    exec_id: &str,
    mut output: OutputStream,
    input: InputSink,
    terminal: &T,
) -> Result<(), DevctrError> {
    let _raw_mode = RawModeGuard::enter(terminal, request)?;
    let forwarder = if request.stdin() {
        let keystrokes = spawn_input_reader(terminal.input()).map_err(|error| {
            exec_failed(request.container(), format!("failed to read stdin: {error}"))
        })?;
        Some(tokio::spawn(forward_input_async(keystrokes, input)))
    } else {
        drop(input);
        None
    };

    let result = stream_output_async(client, request, exec_id, &mut output, terminal).await;
    if let Some(task) = forwarder {
        task.abort();
        drop(task.await);
    }
    result
}

/// Copy a blocking reader into a channel from a dedicated thread.
///
/// The channel closes when the reader hits end of input or fails; the
/// thread exits when the receiving side has gone away.
pub(super) fn spawn_input_reader<R: Read + Send + 'static>(
    mut reader: R,
) -> io::Result<mpsc::Receiver<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel(INPUT_QUEUE_DEPTH);
    std::thread::Builder::new()
        .name(String::from("dev-stdin"))
        .spawn(move || {
            let mut buffer = vec![0_u8; INPUT_CHUNK_BYTES];
            loop {
                let read = match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => read,
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                    Err(error) => {
                        debug!("stdin read ended: {error}");
                        break;
                    }
                };
                let chunk = buffer.get(..read).map(<[u8]>::to_vec).unwrap_or_default();
                if sender.blocking_send(chunk).is_err() {
                    break;
                }
            }
        })?;
    Ok(receiver)
}

/// Write queued keystrokes to the session, closing its input at the end.
pub(super) async fn forward_input_async(
    mut keystrokes: mpsc::Receiver<Vec<u8>>,
    mut input: InputSink,
) -> io::Result<()> {
    while let Some(chunk) = keystrokes.recv().await {
        input.write_all(&chunk).await?;
        input.flush().await?;
    }
    input.shutdown().await
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "false positive triggered inside tokio::select! expansion"
)]
async fn stream_output_async<C: ContainerExecClient, T: LocalTerminal>(
    client: &C,
    request: &ExecRequest,
    exec_id: &str,
    output: &mut OutputStream,
    terminal: &T,
) -> Result<(), DevctrError> {
    let container = request.container();
    let mut resizes = ResizeListener::for_request(request)?;
    if request.tty() {
        resize_to_local_terminal_async(client, container, exec_id, terminal).await?;
    }

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    loop {
        tokio::select! {
            maybe_chunk = output.next() => {
                let Some(received) = maybe_chunk else {
                    return Ok(());
                };
                let log = received.map_err(|error| {
                    exec_failed(container, format!("exec stream failed: {error}"))
                })?;
                write_chunk_async(container, log, &mut stdout, &mut stderr).await?;
            }
            () = resizes.changed(), if resizes.is_active() => {
                resize_to_local_terminal_async(client, container, exec_id, terminal).await?;
            }
        }
    }
}

async fn write_chunk_async(
    container: &str,
    chunk: LogOutput,
    stdout: &mut tokio::io::Stdout,
    stderr: &mut tokio::io::Stderr,
) -> Result<(), DevctrError> {
    let is_stderr = matches!(chunk, LogOutput::StdErr { .. });
    let bytes = chunk.into_bytes();
    let (result, label) = if is_stderr {
        (write_and_flush_async(stderr, &bytes).await, "stderr")
    } else {
        (write_and_flush_async(stdout, &bytes).await, "stdout")
    };
    result.map_err(|error| exec_failed(container, format!("failed writing {label}: {error}")))
}

async fn write_and_flush_async<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Poll the exec session until it stops running and report its exit code.
pub(super) async fn wait_for_exit_code_async<C: ContainerExecClient>(
    client: &C,
    container: &str,
    exec_id: &str,
) -> Result<i64, DevctrError> {
    loop {
        let inspect = client
            .inspect_exec(exec_id)
            .await
            .map_err(|error| exec_failed(container, format!("inspect exec failed: {error}")))?;

        if inspect.running.unwrap_or(false) {
            tokio::time::sleep(Duration::from_millis(EXEC_INSPECT_POLL_INTERVAL_MS)).await;
            continue;
        }

        return inspect.exit_code.ok_or_else(|| {
            exec_failed(
                container,
                format!("exec session '{exec_id}' completed without an exit code"),
            )
        });
    }
}
