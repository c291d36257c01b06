//! 环境变量配置加载

use std::env;
use std::path::PathBuf;

use crate::domain::database::DbSettings;
use crate::error::{BootstrapError, BootstrapResult};

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 数据库凭据与宿主机端口
    pub db: DbSettings,
    /// 镜像构建上下文目录
    pub build_context: PathBuf,
    /// 容器运行时可执行文件
    pub docker_bin: String,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> BootstrapResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意 key -> value 查找函数加载配置
    ///
    /// 未设置或为空的变量使用默认值
    pub fn from_lookup<F>(lookup: F) -> BootstrapResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| value(key).unwrap_or_else(|| default.to_string());

        let port = match value("POSTGRES_PORT") {
            Some(raw) => parse_port(&raw)?,
            None => DbSettings::DEFAULT_PORT,
        };

        let db = DbSettings {
            user: or_default("POSTGRES_USER", DbSettings::DEFAULT_USER),
            password: or_default("POSTGRES_PASSWORD", DbSettings::DEFAULT_PASSWORD),
            database: or_default("POSTGRES_DB", DbSettings::DEFAULT_DATABASE),
            port,
        };

        Ok(Self {
            db,
            build_context: PathBuf::from(or_default(
                "QEP_DB_BUILD_CONTEXT",
                constants::DEFAULT_BUILD_CONTEXT,
            )),
            docker_bin: or_default("QEP_DB_DOCKER", constants::DEFAULT_DOCKER_BIN),
        })
    }
}

fn parse_port(raw: &str) -> BootstrapResult<u16> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            BootstrapError::config(format!(
                "POSTGRES_PORT must be a port number between 1 and 65535, got '{}'",
                raw
            ))
        })
}

/// 常量
pub mod constants {
    /// 镜像 tag
    pub const IMAGE_TAG: &str = "qep-postgres:latest";

    /// 容器名称前缀，同时作为冲突检测的名称过滤条件
    pub const CONTAINER_MARKER: &str = "qep-postgres";

    /// 容器内 Postgres 端口
    pub const CONTAINER_PORT: u16 = 5432;

    pub const DEFAULT_BUILD_CONTEXT: &str = "db";

    pub const DEFAULT_DOCKER_BIN: &str = "docker";

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
