//! Database bootstrap execution
//!
//! Builds the Postgres image, refuses to start when a marked container is
//! already running, then launches a detached container on the configured port.

use std::future::Future;

use tracing::{info, warn};

use crate::config::env::constants::{CONTAINER_MARKER, CONTAINER_PORT, IMAGE_TAG};
use crate::config::EnvConfig;
use crate::domain::container::{BuildSpec, ContainerInfo, ContainerName, RunSpec};
use crate::domain::database::validate_sql;
use crate::domain::stage::{Stage, StageStatus};
use crate::error::{BootstrapError, BootstrapResult};
use crate::infra::docker::ContainerRuntime;

/// Result of a successful `up`
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub container: ContainerName,
    /// Id printed by `docker run -d`
    pub container_id: String,
    /// Host port Postgres is published on
    pub port: u16,
    pub stages: Vec<Stage>,
}

impl BootstrapReport {
    /// Confirmation line for the operator
    pub fn ready_message(&self) -> String {
        format!("Postgres is running on port {}", self.port)
    }
}

pub struct Bootstrapper<R> {
    runtime: R,
    config: EnvConfig,
}

impl<R: ContainerRuntime> Bootstrapper<R> {
    pub fn new(runtime: R, config: EnvConfig) -> Self {
        Self { runtime, config }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn build_spec(&self) -> BuildSpec {
        BuildSpec {
            image: IMAGE_TAG.to_string(),
            context: self.config.build_context.clone(),
            build_args: self.config.db.credential_vars(),
        }
    }

    pub fn run_spec(&self, name: ContainerName) -> RunSpec {
        RunSpec {
            image: IMAGE_TAG.to_string(),
            name,
            env: self.config.db.credential_vars(),
            host_port: self.config.db.port,
            container_port: CONTAINER_PORT,
        }
    }

    /// Build, check for a conflicting container, run
    pub async fn up(&self) -> BootstrapResult<BootstrapReport> {
        self.up_as(ContainerName::now(CONTAINER_MARKER)).await
    }

    /// `up` with an explicit container name
    pub async fn up_as(&self, name: ContainerName) -> BootstrapResult<BootstrapReport> {
        let mut stages = vec![
            Stage::new("docker_build", "Docker Build"),
            Stage::new("conflict_check", "Conflict Check"),
            Stage::new("docker_run", "Docker Run"),
        ];

        info!(
            user = %self.config.db.user,
            database = %self.config.db.database,
            port = self.config.db.port,
            context = %self.config.build_context.display(),
            "=== Bootstrapping Postgres ==="
        );

        let result = self.execute_stages(&mut stages, name).await;

        info!("=== Stage Summary ===");
        for stage in &stages {
            info!("{}", stage.summary_line());
        }

        let (container, container_id) = result?;
        info!(
            container = %container,
            container_id = %container_id,
            port = self.config.db.port,
            "Postgres container started"
        );

        Ok(BootstrapReport {
            container,
            container_id,
            port: self.config.db.port,
            stages,
        })
    }

    async fn execute_stages(
        &self,
        stages: &mut [Stage],
        name: ContainerName,
    ) -> BootstrapResult<(ContainerName, String)> {
        // Stage 1: Docker Build
        info!("[1/3] Building database image...");
        let build = self.build_spec();
        let built = run_stage(&mut stages[0], self.runtime.build_image(&build)).await;
        if let Err(e) = built {
            skip_pending(stages);
            return Err(e);
        }

        // Stage 2: Conflict Check
        info!("[2/3] Checking for running '{}' containers...", CONTAINER_MARKER);
        let check = async {
            let running = self.runtime.running_containers(CONTAINER_MARKER).await?;
            if running.is_empty() {
                Ok(())
            } else {
                for c in &running {
                    warn!(container = %c.name, id = %c.id, "Conflicting container is running");
                }
                Err(BootstrapError::Conflict(running))
            }
        };
        let checked = run_stage(&mut stages[1], check).await;
        if let Err(e) = checked {
            skip_pending(stages);
            return Err(e);
        }

        // Stage 3: Docker Run
        info!("[3/3] Starting container {}...", name);
        let run = self.run_spec(name.clone());
        let container_id = run_stage(&mut stages[2], self.runtime.run_container(&run)).await?;

        Ok((name, container_id))
    }

    /// Running containers carrying the marker
    pub async fn status(&self) -> BootstrapResult<Vec<ContainerInfo>> {
        self.runtime.running_containers(CONTAINER_MARKER).await
    }

    /// Stop every running container carrying the marker
    pub async fn down(&self) -> BootstrapResult<Vec<ContainerInfo>> {
        let running = self.status().await?;
        if running.is_empty() {
            info!("No running '{}' containers", CONTAINER_MARKER);
        }
        for c in &running {
            self.runtime.stop_container(&c.id).await?;
            info!(container = %c.name, id = %c.id, "Container stopped");
        }
        Ok(running)
    }

    /// Run a read-only statement in the single running bootstrap container
    pub async fn query(&self, sql: &str) -> BootstrapResult<String> {
        let validation = validate_sql(sql);
        if !validation.valid {
            return Err(BootstrapError::InvalidSql(
                validation.error.unwrap_or_default(),
            ));
        }

        let mut running = self.status().await?;
        let container = match running.len() {
            0 => return Err(BootstrapError::NotRunning(CONTAINER_MARKER.to_string())),
            1 => running.remove(0),
            _ => return Err(BootstrapError::Conflict(running)),
        };

        info!(container = %container.name, "Running query");
        self.runtime
            .exec_psql(&container.name, &self.config.db, sql)
            .await
    }
}

async fn run_stage<T, F>(stage: &mut Stage, work: F) -> BootstrapResult<T>
where
    F: Future<Output = BootstrapResult<T>>,
{
    stage.start();
    let result = work.await;
    match &result {
        Ok(_) => stage.finish(true, None),
        Err(e) => stage.finish(false, Some(e.to_string())),
    }
    result
}

fn skip_pending(stages: &mut [Stage]) {
    for stage in stages.iter_mut() {
        if stage.status == StageStatus::Pending {
            stage.skip(Some("previous stage failed".to_string()));
        }
    }
}
