/// Docker and Docker Compose integration
///
/// Compose commands (pull, up, logs, exec, cp) are built here as argument
/// vectors and run through the console's `CommandRunner`. Container status
/// goes straight to the Docker API through bollard.

use async_trait::async_trait;
use bollard::container::InspectContainerOptions;
use bollard::Docker;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::console::Console;
use super::executor::{ExternalCommand, OperationResult};

/// The compose project that defines the managed service
#[derive(Debug, Clone)]
pub struct ComposeProject {
    project_root: PathBuf,
    compose_file: PathBuf,
    service: String,
}

impl ComposeProject {
    pub fn new(project_root: impl Into<PathBuf>, compose_file: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            compose_file: compose_file.into(),
            service: service.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// `docker compose -f <file> <args...>`, run from the project root
    pub fn command<I, S>(&self, args: I) -> ExternalCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalCommand::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(self.compose_file.to_string_lossy())
            .args(args)
            .current_dir(&self.project_root)
    }

    pub fn pull(&self) -> ExternalCommand {
        self.command(["pull"])
    }

    pub fn up(&self) -> ExternalCommand {
        self.command(["up", "-d"])
    }

    pub fn logs(&self, tail: usize) -> ExternalCommand {
        self.command(["logs".to_string(), format!("--tail={}", tail)]).capture()
    }

    /// Run a program inside the managed service without a TTY
    pub fn exec<I, S>(&self, program_and_args: I) -> ExternalCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command(["exec".to_string(), "-T".to_string(), self.service.clone()])
            .args(program_and_args)
    }

    pub fn copy_into(&self, host_path: &Path, container_path: &str) -> ExternalCommand {
        self.command([
            "cp".to_string(),
            host_path.to_string_lossy().into_owned(),
            format!("{}:{}", self.service, container_path),
        ])
        .capture()
    }

    pub fn remove_in_container(&self, container_path: &str) -> ExternalCommand {
        self.exec(["rm", "-f", "--", container_path])
    }
}

/// What the runtime says about one container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectOutcome {
    State(String),
    NotFound,
    Failed(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerInspector: Send + Sync {
    async fn inspect(&self, container: &str) -> InspectOutcome;
}

/// Bollard-backed inspector
pub struct DockerInspector {
    client: Result<Docker, String>,
    timeout: Duration,
}

impl DockerInspector {
    /// Never fails; a bad client setup surfaces on the first inspection
    pub fn connect(timeout: Duration) -> Self {
        let client = Docker::connect_with_local_defaults().map_err(|e| {
            warn!(error = %e, "failed to set up Docker client");
            format!("Failed to connect to Docker daemon. Is Docker running? ({})", e)
        });
        Self { client, timeout }
    }
}

#[async_trait]
impl ContainerInspector for DockerInspector {
    async fn inspect(&self, container: &str) -> InspectOutcome {
        let docker = match &self.client {
            Ok(docker) => docker,
            Err(e) => return InspectOutcome::Failed(e.clone()),
        };

        let request = docker.inspect_container(container, None::<InspectContainerOptions>);
        match tokio::time::timeout(self.timeout, request).await {
            Err(_) => InspectOutcome::Failed(format!(
                "docker inspect timed out after {}",
                humantime::format_duration(self.timeout)
            )),
            Ok(Ok(response)) => {
                let state = response
                    .state
                    .and_then(|s| s.status)
                    .map(|status| status.to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                InspectOutcome::State(state)
            }
            Ok(Err(bollard::errors::Error::DockerResponseServerError { status_code: 404, .. })) => {
                InspectOutcome::NotFound
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                if is_missing_object(&message) {
                    InspectOutcome::NotFound
                } else {
                    InspectOutcome::Failed(message)
                }
            }
        }
    }
}

fn is_missing_object(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("no such object") || lower.contains("no such container")
}

/// Semantic state of the managed container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    NotDeployed,
    /// Any other state the runtime reports, verbatim (exited, paused, ...)
    Other(String),
    Error(String),
}

impl From<InspectOutcome> for ServiceState {
    fn from(outcome: InspectOutcome) -> Self {
        match outcome {
            InspectOutcome::State(state) if state == "running" => ServiceState::Running,
            InspectOutcome::State(state) => ServiceState::Other(state),
            InspectOutcome::NotFound => ServiceState::NotDeployed,
            InspectOutcome::Failed(message) => ServiceState::Error(message),
        }
    }
}

impl ServiceState {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceState::Running => "running",
            ServiceState::NotDeployed => "not_deployed",
            ServiceState::Other(state) => state.as_str(),
            ServiceState::Error(_) => "error",
        }
    }
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub success: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ServiceState> for StatusReport {
    fn from(state: ServiceState) -> Self {
        let status = state.as_str().to_string();
        match state {
            ServiceState::Error(message) => StatusReport {
                success: false,
                status,
                error: Some(message),
            },
            _ => StatusReport {
                success: true,
                status,
                error: None,
            },
        }
    }
}

impl Console {
    /// Pull the latest image, then create or update the service
    pub async fn deploy(&self) -> OperationResult {
        let _lock = self.exclusive().await;

        info!(service = %self.compose().service(), "pulling latest images");
        let pull = self.runner().run(self.compose().pull()).await;
        if !pull.success {
            // `up` still applies any locally available image
            warn!(error = %pull.error.trim(), "image pull failed, continuing with up");
        }

        info!(service = %self.compose().service(), "starting service");
        let up = self.runner().run(self.compose().up()).await;
        up.for_step("docker compose up")
    }

    /// Last `logs_tail` lines of the compose project's logs
    pub async fn logs(&self) -> OperationResult {
        self.runner().run(self.compose().logs(self.logs_tail())).await
    }

    pub async fn status(&self) -> StatusReport {
        let outcome = self.inspector().inspect(self.container_name()).await;
        let state = ServiceState::from(outcome);
        if let ServiceState::Error(message) = &state {
            warn!(container = %self.container_name(), error = %message, "status inspection failed");
        }
        state.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::console::tests::{console_with, safe_config};
    use crate::core::executor::MockCommandRunner;

    fn project() -> ComposeProject {
        ComposeProject::new("/srv/mongo", "docker-compose.yml", "mongo")
    }

    #[test]
    fn test_compose_commands() {
        let up = project().up();
        assert_eq!(up.program, "docker");
        assert_eq!(up.args, vec!["compose", "-f", "docker-compose.yml", "up", "-d"]);
        assert_eq!(up.working_dir, Some(PathBuf::from("/srv/mongo")));

        let logs = project().logs(50);
        assert!(logs.has_arg("--tail=50"));

        let exec = project().exec(["mongodump", "--archive"]);
        assert_eq!(
            exec.args[3..].to_vec(),
            vec!["exec", "-T", "mongo", "mongodump", "--archive"]
        );
    }

    #[test]
    fn test_copy_into_targets_service() {
        let cp = project().copy_into(Path::new("/tmp/staged.gz"), "/tmp/staged.gz");
        assert_eq!(&cp.args[3..], &["cp", "/tmp/staged.gz", "mongo:/tmp/staged.gz"]);
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(ServiceState::from(InspectOutcome::State("running".into())), ServiceState::Running);
        assert_eq!(ServiceState::from(InspectOutcome::NotFound), ServiceState::NotDeployed);
        assert_eq!(
            ServiceState::from(InspectOutcome::State("exited".into())).as_str(),
            "exited"
        );
        assert_eq!(ServiceState::from(InspectOutcome::Failed("boom".into())).as_str(), "error");
    }

    #[test]
    fn test_not_deployed_is_success() {
        let report = StatusReport::from(ServiceState::NotDeployed);
        assert!(report.success);
        assert_eq!(report.status, "not_deployed");
        assert_eq!(report.error, None);

        let report = StatusReport::from(ServiceState::Error("daemon down".into()));
        assert!(!report.success);
        assert_eq!(report.status, "error");
        assert_eq!(report.error.as_deref(), Some("daemon down"));
    }

    #[test]
    fn test_missing_object_messages() {
        assert!(is_missing_object("Error: No such object: mongo"));
        assert!(is_missing_object("No such container: mongo"));
        assert!(!is_missing_object("permission denied"));
    }

    #[tokio::test]
    async fn test_deploy_continues_after_failed_pull() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.has_arg("pull"))
            .times(1)
            .returning(|_| OperationResult::failure("network unreachable"));
        runner
            .expect_run()
            .withf(|cmd| cmd.has_arg("up"))
            .times(1)
            .returning(|_| OperationResult::success("Command executed successfully."));

        let console = console_with(&config, runner);
        let result = console.deploy().await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_repeated_deploy_succeeds() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(4)
            .returning(|_| OperationResult::success("Command executed successfully."));

        let console = console_with(&config, runner);
        assert!(console.deploy().await.success);
        assert!(console.deploy().await.success);
    }

    #[tokio::test]
    async fn test_failed_up_names_step() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.has_arg("pull"))
            .returning(|_| OperationResult::success(""));
        runner
            .expect_run()
            .withf(|cmd| cmd.has_arg("up"))
            .returning(|_| OperationResult::failure("port is already allocated"));

        let console = console_with(&config, runner);
        let result = console.deploy().await;
        assert!(!result.success);
        assert_eq!(result.error, "docker compose up failed: port is already allocated");
    }

    #[tokio::test]
    async fn test_logs_uses_configured_tail() {
        let (_dir, config) = safe_config();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.has_arg("logs") && cmd.has_arg("--tail=50"))
            .times(1)
            .returning(|_| OperationResult::success("mongo  | waiting for connections"));

        let console = console_with(&config, runner);
        let result = console.logs().await;
        assert!(result.success);
        assert!(result.output.contains("waiting for connections"));
    }
}
