//! Isolation layer: environment lifecycle and package installation.

use crate::exec::{DockerClient, ExecRequest, ExecutionError};
use crate::model::{EnvironmentConfig, EnvironmentRef, PackageSpec};
use miette::Diagnostic;
use tracing::{debug, info};

pub type IsolationResult<T> = Result<T, IsolationError>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum IsolationError {
    #[error("failed to create environment from {image}: {source}")]
    #[diagnostic(code(pkgprobe::isolation::create))]
    Create {
        image: String,
        #[source]
        source: ExecutionError,
    },

    #[error("failed to install {package}: {reason}")]
    #[diagnostic(code(pkgprobe::isolation::install))]
    Install { package: String, reason: String },

    #[error("failed to destroy environment {id}: {source}")]
    #[diagnostic(code(pkgprobe::isolation::destroy))]
    Destroy {
        id: String,
        #[source]
        source: ExecutionError,
    },
}

/// Creates, prepares and removes isolated environments.
pub trait Isolation: Send + Sync {
    fn create_environment(&self, config: &EnvironmentConfig) -> IsolationResult<EnvironmentRef>;

    /// Install the package under test; done once per environment before any scenario.
    fn install_package(&self, env: &EnvironmentRef, package: &PackageSpec) -> IsolationResult<()>;

    fn destroy_environment(&self, env: &EnvironmentRef) -> IsolationResult<()>;
}

/// Registry used when the package spec names none.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Docker containers as environments, with npm installing the package globally.
#[derive(Clone, Debug)]
pub struct DockerIsolation {
    client: DockerClient,
}

impl DockerIsolation {
    #[must_use]
    pub fn new(client: DockerClient) -> Self {
        Self { client }
    }

    fn install_step(
        &self,
        env: &EnvironmentRef,
        package: &PackageSpec,
        request: &ExecRequest,
    ) -> IsolationResult<()> {
        let install_failed = |reason: String| IsolationError::Install {
            package: package.display_name(),
            reason,
        };
        let output = self
            .client
            .exec(env.id(), request)
            .map_err(|err| install_failed(err.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(install_failed(format!(
                "exit code {}: {}",
                output.exit_code, output.stderr
            )))
        }
    }
}

/// `//host/path/:_authToken` key npm uses for registry credentials.
fn auth_token_key(registry: &str) -> String {
    let without_scheme = registry
        .strip_prefix("https:")
        .or_else(|| registry.strip_prefix("http:"))
        .unwrap_or(registry);
    let base = without_scheme.trim_end_matches('/');
    let base = if base.starts_with("//") {
        base.to_string()
    } else {
        format!("//{base}")
    };
    format!("{base}/:_authToken")
}

impl Isolation for DockerIsolation {
    fn create_environment(&self, config: &EnvironmentConfig) -> IsolationResult<EnvironmentRef> {
        let create_failed = |source| IsolationError::Create {
            image: config.image_ref(),
            source,
        };
        info!(image = %config.image_ref(), "pulling image");
        self.client
            .pull_image(&config.image, &config.version)
            .map_err(create_failed)?;
        let env = self.client.start_container(config).map_err(create_failed)?;
        info!(image = %config.image_ref(), container = %env, "environment ready");
        Ok(env)
    }

    fn install_package(&self, env: &EnvironmentRef, package: &PackageSpec) -> IsolationResult<()> {
        let registry = package.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY);
        if let Some(token) = &package.auth_token {
            debug!(%env, registry, "configuring registry credentials");
            let key = auth_token_key(registry);
            let request = ExecRequest::new(["npm", "config", "set", key.as_str(), token.as_str()]);
            self.install_step(env, package, &request)?;
        }

        let mut argv = vec!["npm".to_string(), "install".to_string(), "-g".to_string()];
        if let Some(url) = &package.registry_url {
            argv.push("--registry".to_string());
            argv.push(url.clone());
        }
        argv.push(package.install_target());
        info!(%env, package = %package.display_name(), "installing package");
        self.install_step(env, package, &ExecRequest::new(argv))
    }

    fn destroy_environment(&self, env: &EnvironmentRef) -> IsolationResult<()> {
        self.client
            .remove_container(env.id())
            .map_err(|source| IsolationError::Destroy {
                id: env.id().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_token_key_strips_scheme_and_trailing_slash() {
        assert_eq!(
            auth_token_key("https://registry.npmjs.org/"),
            "//registry.npmjs.org/:_authToken"
        );
        assert_eq!(
            auth_token_key("http://npm.internal:4873/private"),
            "//npm.internal:4873/private/:_authToken"
        );
    }
}
