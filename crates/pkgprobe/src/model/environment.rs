use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque handle to a running isolated environment (for Docker, a container id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentRef(String);

impl EnvironmentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Handle for the host itself, used by the local executor.
    #[must_use]
    pub fn local() -> Self {
        Self("local".to_string())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to provision for one target runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Base image or runtime identifier, e.g. `node`.
    pub image: String,
    /// Runtime version, used as the image tag.
    pub version: String,
    /// Working root inside the environment.
    pub work_root: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
    /// Container name; generated by the campaign runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EnvironmentConfig {
    #[must_use]
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Where the package under test comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PackageSource {
    Registry(String),
    Local(PathBuf),
}

/// Container path local packages are mounted at.
pub const LOCAL_PACKAGE_MOUNT: &str = "/pkg";

/// Package under test plus registry credentials.
///
/// The auth token is handed to the isolation layer as-is and never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub source: PackageSource,
    #[serde(skip)]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
}

impl PackageSpec {
    /// Interpret an identifier: an existing path is a local package, anything else a registry name.
    #[must_use]
    pub fn parse(identifier: &str) -> Self {
        let path = Path::new(identifier);
        let source = if path.exists() {
            PackageSource::Local(path.to_path_buf())
        } else {
            PackageSource::Registry(identifier.to_string())
        };
        Self {
            source,
            auth_token: None,
            registry_url: None,
        }
    }

    /// Human-readable name for reports.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.source {
            PackageSource::Registry(name) => name.clone(),
            PackageSource::Local(path) => path.display().to_string(),
        }
    }

    /// Argument naming the package for an install command inside the environment.
    #[must_use]
    pub fn install_target(&self) -> String {
        match &self.source {
            PackageSource::Registry(name) => name.clone(),
            PackageSource::Local(_) => LOCAL_PACKAGE_MOUNT.to_string(),
        }
    }
}

impl fmt::Debug for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSpec")
            .field("source", &self.source)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("registry_url", &self.registry_url)
            .finish()
    }
}
