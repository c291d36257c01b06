//! QEP DB Bootstrap - 本地 Postgres 容器引导
//!
//! 构建数据库镜像，检测同名容器冲突，然后以分离模式启动新容器

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

pub use config::EnvConfig;
pub use error::{BootstrapError, BootstrapResult};
pub use infra::{ContainerRuntime, DockerCli};
pub use services::{BootstrapReport, Bootstrapper};
