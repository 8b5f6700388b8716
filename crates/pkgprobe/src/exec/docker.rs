//! Docker Engine API client and the container-backed [`Executor`].
//!
//! An exec attaches to both output streams without a TTY, so the daemon sends them
//! multiplexed over the response body. The body is split into frames and demultiplexed
//! here; the exit code comes from inspecting the exec once the stream has closed.
//!
//! The daemon can briefly report an exec as still running after its stream closed.
//! There is no polling: such an exec fails with [`ExecutionError::Protocol`] and the
//! caller decides whether to retry the scenario.

use super::demux::{split_frames, Demuxer};
use super::socket::{block_on, ApiResponse, SocketTransport};
use super::{ExecRequest, ExecResult, ExecutionError, Executor};
use crate::model::{EnvironmentConfig, EnvironmentRef, ExecOutput};
use hyper::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Engine API version all requests are pinned to.
const API_VERSION: &str = "v1.41";

/// Socket used when `DOCKER_HOST` does not name one.
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecInspect {
    #[serde(default)]
    exit_code: Option<i64>,
    #[serde(default)]
    running: bool,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin client for the parts of the Docker Engine API this crate needs.
#[derive(Clone, Debug)]
pub struct DockerClient {
    transport: SocketTransport,
}

impl DockerClient {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            transport: SocketTransport::new(socket.into()),
        }
    }

    /// Client for `DOCKER_HOST` when it is a `unix://` URL, else the default socket.
    #[must_use]
    pub fn from_env() -> Self {
        let socket = std::env::var("DOCKER_HOST")
            .ok()
            .and_then(|host| host.strip_prefix("unix://").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCKER_SOCKET));
        Self::new(socket)
    }

    #[must_use]
    pub fn socket(&self) -> &Path {
        self.transport.socket()
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ExecResult<ApiResponse> {
        self.transport
            .send(method, &format!("/{API_VERSION}{path}"), body)
            .await
    }

    /// Run a command inside a running container to completion.
    pub fn exec(&self, container: &str, request: &ExecRequest) -> ExecResult<ExecOutput> {
        request.split_program()?;
        block_on(self.exec_async(container, request))?
    }

    async fn exec_async(&self, container: &str, request: &ExecRequest) -> ExecResult<ExecOutput> {
        let mut spec = json!({
            "AttachStdin": false,
            "AttachStdout": true,
            "AttachStderr": true,
            "Tty": false,
            "Cmd": request.argv,
        });
        if let (Some(dir), Some(fields)) = (&request.working_dir, spec.as_object_mut()) {
            fields.insert("WorkingDir".to_string(), Value::String(dir.clone()));
        }

        let created = self
            .send(Method::POST, &format!("/containers/{container}/exec"), Some(&spec))
            .await?;
        if matches!(created.status, 404 | 409) {
            return Err(ExecutionError::InvalidEnvironment {
                id: container.to_string(),
            });
        }
        let exec_id = parse_json::<IdResponse>(&expect_success(created)?)?.id;

        let started = self
            .send(
                Method::POST,
                &format!("/exec/{exec_id}/start"),
                Some(&json!({ "Detach": false, "Tty": false })),
            )
            .await?;
        let stream = expect_success(started)?;
        let mut demuxer = Demuxer::new();
        for chunk in split_frames(&stream.body) {
            demuxer.push_chunk(chunk);
        }
        let (stdout, stderr) = demuxer.finish();

        let inspected = self
            .send(Method::GET, &format!("/exec/{exec_id}/json"), None)
            .await?;
        let inspect = parse_json::<ExecInspect>(&expect_success(inspected)?)?;
        if inspect.running {
            return Err(ExecutionError::Protocol(
                "exec stream closed while the command was still running".to_string(),
            ));
        }
        let exit_code = inspect
            .exit_code
            .and_then(|code| i32::try_from(code).ok())
            .ok_or_else(|| ExecutionError::Protocol("exec finished without exit code".to_string()))?;

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// Pull `image:tag`, waiting for the pull to finish.
    pub fn pull_image(&self, image: &str, tag: &str) -> ExecResult<()> {
        let path = format!(
            "/images/create?{}",
            query(&[("fromImage", image), ("tag", tag)])
        );
        let response = block_on(self.send(Method::POST, &path, None))??;
        let response = expect_success(response)?;
        // The body is a stream of JSON progress lines; failures show up as `error` entries.
        for line in response.body.split(|byte| *byte == b'\n') {
            if let Ok(ApiMessage {
                error: Some(error), ..
            }) = serde_json::from_slice::<ApiMessage>(line)
            {
                return Err(ExecutionError::Api {
                    status: response.status,
                    message: error,
                });
            }
        }
        Ok(())
    }

    /// Create and start an idle container for `config`.
    pub fn start_container(&self, config: &EnvironmentConfig) -> ExecResult<EnvironmentRef> {
        block_on(self.start_container_async(config))?
    }

    async fn start_container_async(&self, config: &EnvironmentConfig) -> ExecResult<EnvironmentRef> {
        let binds: Vec<String> = config
            .mounts
            .iter()
            .map(|mount| {
                let mode = if mount.read_only { ":ro" } else { "" };
                format!("{}:{}{mode}", mount.host.display(), mount.container)
            })
            .collect();
        let spec = json!({
            "Image": config.image_ref(),
            "Cmd": ["sleep", "infinity"],
            "WorkingDir": config.work_root,
            "Tty": false,
            "HostConfig": { "Binds": binds },
        });
        let path = match &config.name {
            Some(name) => format!("/containers/create?{}", query(&[("name", name.as_str())])),
            None => "/containers/create".to_string(),
        };
        let created = expect_success(self.send(Method::POST, &path, Some(&spec)).await?)?;
        let id = parse_json::<IdResponse>(&created)?.id;
        debug!(container = %id, image = %config.image_ref(), "container created");

        let started = self
            .send(Method::POST, &format!("/containers/{id}/start"), None)
            .await?;
        if !(started.is_success() || started.status == 304) {
            let err = api_error(&started);
            let _ = self.remove_container_async(&id).await;
            return Err(err);
        }
        Ok(EnvironmentRef::new(id))
    }

    /// Force-remove a container. A container that is already gone is not an error.
    pub fn remove_container(&self, id: &str) -> ExecResult<()> {
        block_on(self.remove_container_async(id))?
    }

    async fn remove_container_async(&self, id: &str) -> ExecResult<()> {
        let response = self
            .send(Method::DELETE, &format!("/containers/{id}?force=true"), None)
            .await?;
        if response.is_success() || response.status == 404 {
            Ok(())
        } else {
            Err(api_error(&response))
        }
    }
}

/// URL-encoded query string.
fn query(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn expect_success(response: ApiResponse) -> ExecResult<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(api_error(&response))
    }
}

fn api_error(response: &ApiResponse) -> ExecutionError {
    let message = serde_json::from_slice::<ApiMessage>(&response.body)
        .ok()
        .and_then(|msg| msg.message.or(msg.error))
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).trim().to_string());
    ExecutionError::Api {
        status: response.status,
        message,
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(response: &ApiResponse) -> ExecResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|err| ExecutionError::Protocol(format!("unexpected response body: {err}")))
}

/// Executor that runs commands in Docker containers via `docker exec` semantics.
#[derive(Clone, Debug)]
pub struct DockerExecutor {
    client: DockerClient,
}

impl DockerExecutor {
    #[must_use]
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &DockerClient {
        &self.client
    }
}

impl Executor for DockerExecutor {
    fn execute(&self, env: &EnvironmentRef, request: &ExecRequest) -> ExecResult<ExecOutput> {
        debug!(container = %env, argv = ?request.argv, "docker exec");
        self.client.exec(env.id(), request)
    }
}
