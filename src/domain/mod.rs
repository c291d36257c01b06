//! 领域模型模块
//!
//! 纯数据结构，不依赖 tokio/进程执行

pub mod container;
pub mod database;
pub mod stage;

pub use container::{BuildSpec, ContainerInfo, ContainerName, EnvVar, RunSpec};
pub use database::{validate_sql, DbSettings, SqlValidation};
pub use stage::{LogLine, LogStream, Stage, StageStatus};
