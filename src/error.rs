//! 统一错误处理
//!
//! `BootstrapError` 覆盖所有失败路径，并映射到进程退出码

use thiserror::Error;

use crate::domain::container::ContainerInfo;
use crate::infra::command::CommandError;

/// 引导错误类型
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// 环境变量或参数无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 已有同名标记的容器在运行
    #[error("{}", conflict_message(.0))]
    Conflict(Vec<ContainerInfo>),

    /// 外部命令返回非零退出码
    #[error("{} failed with exit code {}{}", .step, .code, stderr_suffix(.stderr))]
    CommandFailed {
        step: String,
        code: i32,
        stderr: Option<String>,
    },

    /// 命令启动失败、等待失败或被取消
    #[error(transparent)]
    Command(#[from] CommandError),

    /// 没有运行中的容器
    #[error("No running container matches '{0}'. Start one with: qep-db up")]
    NotRunning(String),

    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BootstrapError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn command_failed(step: impl Into<String>, code: Option<i32>, stderr: Option<String>) -> Self {
        Self::CommandFailed {
            step: step.into(),
            code: code.unwrap_or(1),
            stderr: stderr.filter(|s| !s.trim().is_empty()),
        }
    }

    /// 进程退出码
    ///
    /// 外部命令失败时透传其退出码，其余情况为 1
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::CommandFailed { code, .. } if *code != 0 => *code,
            BootstrapError::Command(CommandError::Cancelled) => 130,
            BootstrapError::Command(CommandError::SpawnFailed(_, e))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                127
            }
            _ => 1,
        }
    }
}

fn conflict_message(containers: &[ContainerInfo]) -> String {
    containers
        .iter()
        .map(|c| {
            format!(
                "Container '{}' ({}) is already running.\nStop it with: docker stop {}",
                c.name, c.id, c.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn stderr_suffix(stderr: &Option<String>) -> String {
    stderr
        .as_deref()
        .map(|s| format!(": {}", s.trim()))
        .unwrap_or_default()
}

/// 便捷类型别名
pub type BootstrapResult<T> = Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: &str, name: &str) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            name: name.to_string(),
            image: "qep-postgres:latest".to_string(),
            status: "Up 1 minute".to_string(),
            state: "running".to_string(),
            created: String::new(),
            ports: vec![],
        }
    }

    #[test]
    fn test_conflict_message_names_container_and_remedy() {
        let err = BootstrapError::Conflict(vec![running("abc123", "qep-postgres-1700000000")]);
        let msg = err.to_string();
        assert!(msg.contains("qep-postgres-1700000000"));
        assert!(msg.contains("docker stop abc123"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_command_failed_propagates_exit_code() {
        let err = BootstrapError::command_failed("docker build", Some(17), None);
        assert_eq!(err.exit_code(), 17);
        assert_eq!(err.to_string(), "docker build failed with exit code 17");
    }

    #[test]
    fn test_command_failed_without_code_is_one() {
        let err = BootstrapError::command_failed("docker run", None, Some("port is already allocated\n".to_string()));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().ends_with(": port is already allocated"));
    }

    #[test]
    fn test_cancelled_and_missing_binary() {
        assert_eq!(BootstrapError::Command(CommandError::Cancelled).exit_code(), 130);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = BootstrapError::Command(CommandError::SpawnFailed("docker".to_string(), missing));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_other_spawn_failure_is_one() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BootstrapError::Command(CommandError::SpawnFailed("docker".to_string(), denied));
        assert_eq!(err.exit_code(), 1);
    }
}
