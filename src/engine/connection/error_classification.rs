//! Error classification for Bollard failures.
//!
//! Connection failures are mapped onto socket-specific variants so the user
//! is told whether the socket is missing or merely unreadable. A 404 from any
//! container call becomes `NotFound`, and a 409 from container creation
//! becomes `AlreadyExists`; the session controller treats both as states
//! rather than failures.

use std::path::Path;

use crate::error::ContainerError;

const STATUS_NOT_FOUND: u16 = 404;
const STATUS_CONFLICT: u16 = 409;

/// Strip the `unix://` or `npipe://` scheme to get a filesystem path.
///
/// HTTP endpoints have no filesystem path.
pub(super) fn extract_socket_path(socket_uri: &str) -> Option<&Path> {
    socket_uri
        .strip_prefix("unix://")
        .or_else(|| socket_uri.strip_prefix("npipe://"))
        .map(Path::new)
}

fn classify_io_error_kind(
    kind: std::io::ErrorKind,
    socket_path: Option<&Path>,
    error_msg: &str,
) -> ContainerError {
    let connection_failed = || ContainerError::ConnectionFailed {
        message: error_msg.to_owned(),
    };
    match kind {
        std::io::ErrorKind::PermissionDenied => {
            socket_path.map_or_else(connection_failed, |path| ContainerError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        std::io::ErrorKind::NotFound => {
            socket_path.map_or_else(connection_failed, |path| ContainerError::SocketNotFound {
                path: path.to_path_buf(),
            })
        }
        _ => connection_failed(),
    }
}

/// Classify a Bollard connection error into a semantic `ContainerError`.
pub(super) fn classify_connection_error(
    bollard_error: &bollard::errors::Error,
    socket_uri: &str,
) -> ContainerError {
    let socket_path = extract_socket_path(socket_uri);
    let error_msg = bollard_error.to_string();

    match bollard_error {
        bollard::errors::Error::SocketNotFoundError(_) => {
            if let Some(path) = socket_path {
                return ContainerError::SocketNotFound {
                    path: path.to_path_buf(),
                };
            }
        }
        bollard::errors::Error::IOError { err } => {
            let kind = io_error_kind_in_chain(err).unwrap_or_else(|| err.kind());
            return classify_io_error_kind(kind, socket_path, &error_msg);
        }
        _ => {}
    }

    if let Some(kind) = io_error_kind_in_chain(bollard_error) {
        return classify_io_error_kind(kind, socket_path, &error_msg);
    }

    ContainerError::ConnectionFailed { message: error_msg }
}

/// Classify an Engine API response error for the named container.
///
/// `fallback` builds the operation-specific variant used for every status
/// other than 404.
pub(super) fn classify_response_error(
    bollard_error: &bollard::errors::Error,
    name: &str,
    fallback: impl FnOnce(String) -> ContainerError,
) -> ContainerError {
    if has_status(bollard_error, STATUS_NOT_FOUND) {
        return ContainerError::NotFound {
            name: name.to_owned(),
        };
    }
    fallback(bollard_error.to_string())
}

/// Classify a container-create failure; a 409 means the name is taken.
pub(super) fn classify_create_error(
    bollard_error: &bollard::errors::Error,
    name: &str,
) -> ContainerError {
    if has_status(bollard_error, STATUS_CONFLICT) {
        return ContainerError::AlreadyExists {
            name: name.to_owned(),
        };
    }
    ContainerError::CreateFailed {
        name: name.to_owned(),
        message: bollard_error.to_string(),
    }
}

fn has_status(bollard_error: &bollard::errors::Error, expected: u16) -> bool {
    matches!(
        bollard_error,
        bollard::errors::Error::DockerResponseServerError { status_code, .. } if *status_code == expected
    )
}

/// Walk the error source chain looking for an `io::Error` kind.
fn io_error_kind_in_chain(error: &dyn std::error::Error) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = error.source();
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return Some(io_err.kind());
        }
        current = err.source();
    }
    None
}
