//! Container runtime access
//!
//! `ContainerRuntime` is the seam between the bootstrap flow and the
//! Docker CLI; `DockerCli` drives the real binary.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::container::{BuildSpec, ContainerInfo, EnvVar, RunSpec};
use crate::domain::database::DbSettings;
use crate::error::{BootstrapError, BootstrapResult};
use crate::infra::command::{CommandRunner, LogSink};

/// Operations the bootstrap flow needs from a container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build an image, streaming build output
    async fn build_image(&self, spec: &BuildSpec) -> BootstrapResult<()>;

    /// Running containers whose name contains `name_filter`
    async fn running_containers(&self, name_filter: &str) -> BootstrapResult<Vec<ContainerInfo>>;

    /// Start a detached container, returning its id
    async fn run_container(&self, spec: &RunSpec) -> BootstrapResult<String>;

    async fn stop_container(&self, id: &str) -> BootstrapResult<()>;

    /// Run one statement through `psql` inside a container, returning stdout
    async fn exec_psql(&self, container: &str, db: &DbSettings, sql: &str) -> BootstrapResult<String>;
}

/// Whether env values go out verbatim or redacted for logging
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgMode {
    Exec,
    Display,
}

fn env_arg(var: &EnvVar, mode: ArgMode) -> String {
    match mode {
        ArgMode::Exec => var.assignment(),
        ArgMode::Display => var.display_assignment(),
    }
}

/// `docker build -t <image> --build-arg K=V ... <context>`
pub fn build_args(spec: &BuildSpec, mode: ArgMode) -> Vec<String> {
    let mut args = vec!["build".to_string(), "-t".to_string(), spec.image.clone()];
    for var in &spec.build_args {
        args.push("--build-arg".to_string());
        args.push(env_arg(var, mode));
    }
    args.push(spec.context.to_string_lossy().to_string());
    args
}

/// `docker ps --filter name=<filter> --format ...`
pub fn ps_args(name_filter: &str) -> Vec<String> {
    vec![
        "ps".to_string(),
        "--filter".to_string(),
        format!("name={}", name_filter),
        "--format".to_string(),
        ContainerInfo::PS_FORMAT.to_string(),
    ]
}

/// `docker run -d --name <name> -e K=V ... -p <host>:<container> <image>`
pub fn run_args(spec: &RunSpec, mode: ArgMode) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        spec.name.to_string(),
    ];
    for var in &spec.env {
        args.push("-e".to_string());
        args.push(env_arg(var, mode));
    }
    args.push("-p".to_string());
    args.push(spec.port_mapping());
    args.push(spec.image.clone());
    args
}

/// Session options that make every transaction read-only
pub const READ_ONLY_PGOPTIONS: &str = "-c default_transaction_read_only=on";

/// `docker exec -i -e PGPASSWORD=.. -e PGOPTIONS=.. <container> psql -v ON_ERROR_STOP=1 -U <user> -d <db> -c <sql>`
///
/// The env vars are set inside the container so they reach `psql` itself.
pub fn psql_args(container: &str, db: &DbSettings, sql: &str) -> Vec<String> {
    let password = EnvVar::new("PGPASSWORD", &db.password).assignment();
    let options = EnvVar::new("PGOPTIONS", READ_ONLY_PGOPTIONS).assignment();

    [
        "exec",
        "-i",
        "-e",
        password.as_str(),
        "-e",
        options.as_str(),
        container,
        "psql",
        "-v",
        "ON_ERROR_STOP=1",
        "-U",
        db.user.as_str(),
        "-d",
        db.database.as_str(),
        "-c",
        sql,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Docker CLI backed runtime
pub struct DockerCli {
    program: String,
    sink: LogSink,
    cancel: CancellationToken,
}

impl DockerCli {
    pub fn new(program: impl Into<String>, sink: LogSink, cancel: CancellationToken) -> Self {
        Self {
            program: program.into(),
            sink,
            cancel,
        }
    }

    fn step(&self, verb: &str) -> String {
        format!("{} {}", self.program, verb)
    }

    /// Run a captured command and fail on non-zero exit
    async fn captured(&self, verb: &str, args: &[String]) -> BootstrapResult<String> {
        let output = CommandRunner::run_captured(&self.program, args, &self.cancel).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(step = %self.step(verb), error = %stderr.trim(), "Docker command failed");
            return Err(BootstrapError::command_failed(
                self.step(verb),
                output.status.code(),
                Some(stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(&self, spec: &BuildSpec) -> BootstrapResult<()> {
        info!(
            ">>> {} {}",
            self.program,
            build_args(spec, ArgMode::Display).join(" ")
        );

        let status = CommandRunner::run_streaming(
            &self.program,
            &build_args(spec, ArgMode::Exec),
            self.sink.clone(),
            &self.cancel,
        )
        .await?;

        if !status.success() {
            return Err(BootstrapError::command_failed(
                self.step("build"),
                status.code(),
                None,
            ));
        }
        Ok(())
    }

    async fn running_containers(&self, name_filter: &str) -> BootstrapResult<Vec<ContainerInfo>> {
        let stdout = self.captured("ps", &ps_args(name_filter)).await?;
        Ok(ContainerInfo::parse_ps_output(&stdout))
    }

    async fn run_container(&self, spec: &RunSpec) -> BootstrapResult<String> {
        info!(
            ">>> {} {}",
            self.program,
            run_args(spec, ArgMode::Display).join(" ")
        );

        let stdout = self
            .captured("run", &run_args(spec, ArgMode::Exec))
            .await?;
        Ok(stdout.trim().to_string())
    }

    async fn stop_container(&self, id: &str) -> BootstrapResult<()> {
        info!(">>> {} stop {}", self.program, id);
        self.captured("stop", &["stop".to_string(), id.to_string()])
            .await
            .map(|_| ())
    }

    async fn exec_psql(&self, container: &str, db: &DbSettings, sql: &str) -> BootstrapResult<String> {
        self.captured("exec", &psql_args(container, db, sql))
            .await
    }
}
