//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 实时日志流式输出
//! - 取消支持（Ctrl-C）
//! - stdout/stderr 分离

use std::process::{ExitStatus, Output, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::stage::{LogLine, LogStream};

/// 日志接收器
pub type LogSink = Arc<dyn Fn(&LogLine) + Send + Sync>;

/// 将每一行原样写到 stderr
pub fn stderr_sink() -> LogSink {
    Arc::new(|line: &LogLine| eprintln!("{}", line.content))
}

/// 命令执行器
pub struct CommandRunner;

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败（程序名, 错误）
    SpawnFailed(String, std::io::Error),
    /// 命令被取消
    Cancelled,
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(program, e) => {
                write!(f, "Failed to spawn command '{}': {}", program, e)
            }
            CommandError::Cancelled => write!(f, "Command was cancelled"),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(_, e) | CommandError::WaitFailed(e) => Some(e),
            CommandError::Cancelled => None,
        }
    }
}

impl CommandRunner {
    /// 执行命令并流式输出日志
    ///
    /// 每一行 stdout/stderr 都会交给 `sink`。取消时终止子进程。
    pub async fn run_streaming(
        program: &str,
        args: &[String],
        sink: LogSink,
        cancel: &CancellationToken,
    ) -> Result<ExitStatus, CommandError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::SpawnFailed(program.to_string(), e))?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| spawn_line_reader(out, LogStream::Stdout, sink.clone()));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| spawn_line_reader(err, LogStream::Stderr, sink.clone()));

        // 等待命令完成，支持取消
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(program = %program, "Command cancelled, killing process");
                let _ = child.kill().await;
                Err(CommandError::Cancelled)
            }
            status = child.wait() => status.map_err(CommandError::WaitFailed),
        };

        // 等待日志读取完成
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        result
    }

    /// 执行命令并收集全部输出
    ///
    /// 用于不需要实时日志的场景（如 docker ps / docker run -d）
    pub async fn run_captured(
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Output, CommandError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(program = %program, "Running captured command");

        tokio::select! {
            _ = cancel.cancelled() => Err(CommandError::Cancelled),
            output = command.output() => {
                output.map_err(|e| CommandError::SpawnFailed(program.to_string(), e))
            }
        }
    }
}

fn spawn_line_reader<R>(reader: R, stream: LogStream, sink: LogSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            sink(&LogLine::new(stream, line));
        }
    })
}
