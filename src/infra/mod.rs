//! 基础设施模块
//!
//! 封装外部依赖（命令执行、容器运行时）

pub mod command;
pub mod docker;

pub use command::{stderr_sink, CommandRunner, LogSink};
pub use docker::{ContainerRuntime, DockerCli};
