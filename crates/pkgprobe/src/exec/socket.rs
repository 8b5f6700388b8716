//! HTTP transport to the Docker daemon's Unix socket.
//!
//! Requests go through a `hyper` client over `hyperlocal`'s Unix connector. Callers are
//! blocking, so every public Docker operation drives its requests on a current-thread
//! `tokio` runtime of its own. Response bodies are collected whole; for a hijacked exec
//! stream that means reading until the daemon closes it.

use super::{ExecResult, ExecutionError};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// Run `future` to completion on a fresh current-thread runtime.
///
/// Must not be called from inside another `tokio` runtime.
pub(crate) fn block_on<F: Future>(future: F) -> ExecResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExecutionError::io("failed to start the I/O runtime", err))?;
    Ok(runtime.block_on(future))
}

#[derive(Debug)]
pub(crate) struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SocketTransport {
    socket: PathBuf,
}

impl SocketTransport {
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    #[cfg(unix)]
    pub async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&serde_json::Value>,
    ) -> ExecResult<ApiResponse> {
        use hyper_util::client::legacy::Client;
        use hyper_util::rt::TokioExecutor;
        use hyperlocal::UnixConnector;

        let payload = match body {
            Some(value) => serde_json::to_vec(value).map_err(|err| {
                ExecutionError::Protocol(format!("failed to encode request: {err}"))
            })?,
            None => Vec::new(),
        };
        let uri: hyper::Uri = hyperlocal::Uri::new(&self.socket, path_and_query).into();
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(Full::new(Bytes::from(payload)))
            .map_err(|err| ExecutionError::Protocol(format!("invalid request: {err}")))?;

        // One connection per request; the runtime does not outlive the call.
        let client: Client<UnixConnector, Full<Bytes>> = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(UnixConnector);
        let response = client.request(request).await.map_err(|err| {
            if err.is_connect() {
                ExecutionError::Connect {
                    endpoint: self.socket.display().to_string(),
                    source: io::Error::other(err),
                }
            } else {
                ExecutionError::io("request to the Docker daemon failed", io::Error::other(err))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| {
                ExecutionError::io("connection broke while reading response", io::Error::other(err))
            })?
            .to_bytes();
        Ok(ApiResponse { status, body })
    }

    #[cfg(not(unix))]
    #[allow(clippy::unused_async)]
    pub async fn send(
        &self,
        _method: Method,
        _path_and_query: &str,
        _body: Option<&serde_json::Value>,
    ) -> ExecResult<ApiResponse> {
        Err(ExecutionError::Connect {
            endpoint: self.socket.display().to_string(),
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            ),
        })
    }
}
