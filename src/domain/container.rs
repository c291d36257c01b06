//! 容器相关领域模型

use std::fmt;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

/// 容器信息（`docker ps` 的一行）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub state: String,
    pub created: String,
    pub ports: Vec<String>,
}

impl ContainerInfo {
    /// `docker ps --format` 模板，字段以 `|` 分隔
    pub const PS_FORMAT: &'static str =
        "{{.ID}}|{{.Names}}|{{.Image}}|{{.Status}}|{{.State}}|{{.CreatedAt}}|{{.Ports}}";

    /// 解析单行输出，空行或缺少 ID 时返回 None
    pub fn parse_ps_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let parts: Vec<&str> = line.split('|').collect();
        let id = parts.first().map(|s| s.trim()).unwrap_or("");
        if id.is_empty() {
            return None;
        }

        let field = |i: usize| parts.get(i).map(|s| s.trim()).unwrap_or("").to_string();

        Some(Self {
            id: id.to_string(),
            name: field(1),
            image: field(2),
            status: field(3),
            state: field(4),
            created: field(5),
            ports: parts
                .get(6)
                .unwrap_or(&"")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// 解析 `docker ps` 的完整输出
    pub fn parse_ps_output(output: &str) -> Vec<Self> {
        output.lines().filter_map(Self::parse_ps_line).collect()
    }
}

/// 容器名称：固定前缀 + Unix 时间戳
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn at(prefix: &str, unix_secs: i64) -> Self {
        Self(format!("{}-{}", prefix, unix_secs))
    }

    pub fn now(prefix: &str) -> Self {
        Self::at(prefix, Utc::now().timestamp())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 环境变量 / 构建参数
#[derive(Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
    /// 是否为敏感变量（如包含 PASSWORD, SECRET, KEY 等）
    pub sensitive: bool,
}

impl EnvVar {
    pub const REDACTED: &'static str = "***REDACTED***";

    /// 敏感关键词列表
    const SENSITIVE_KEYWORDS: &'static [&'static str] = &[
        "password", "secret", "key", "token", "credential", "auth",
        "apikey", "private", "jwt", "pem", "cert",
    ];

    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let sensitive = Self::is_sensitive_key(&key);
        Self {
            key,
            value: value.into(),
            sensitive,
        }
    }

    /// 检查变量名是否敏感
    pub fn is_sensitive_key(key: &str) -> bool {
        let key_lower = key.to_lowercase();
        Self::SENSITIVE_KEYWORDS.iter().any(|kw| key_lower.contains(kw))
    }

    /// 可安全打印的值
    pub fn display_value(&self) -> &str {
        if self.sensitive {
            Self::REDACTED
        } else {
            &self.value
        }
    }

    /// `KEY=VALUE`
    pub fn assignment(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// `KEY=VALUE`，敏感值已脱敏
    pub fn display_assignment(&self) -> String {
        format!("{}={}", self.key, self.display_value())
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVar")
            .field("key", &self.key)
            .field("value", &self.display_value())
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// 镜像构建参数
#[derive(Debug, Clone)]
pub struct BuildSpec {
    /// 目标镜像 tag
    pub image: String,
    /// 构建上下文目录
    pub context: PathBuf,
    /// `--build-arg` 列表
    pub build_args: Vec<EnvVar>,
}

/// 容器运行参数
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub image: String,
    pub name: ContainerName,
    /// `-e` 列表
    pub env: Vec<EnvVar>,
    pub host_port: u16,
    pub container_port: u16,
}

impl RunSpec {
    /// `-p` 参数，如 "6000:5432"
    pub fn port_mapping(&self) -> String {
        format!("{}:{}", self.host_port, self.container_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sensitive_key() {
        assert!(EnvVar::is_sensitive_key("POSTGRES_PASSWORD"));
        assert!(EnvVar::is_sensitive_key("api_key"));
        assert!(!EnvVar::is_sensitive_key("POSTGRES_USER"));
        assert!(!EnvVar::is_sensitive_key("POSTGRES_DB"));
    }

    #[test]
    fn test_env_var_redaction() {
        let password = EnvVar::new("POSTGRES_PASSWORD", "hunter2");
        assert_eq!(password.assignment(), "POSTGRES_PASSWORD=hunter2");
        assert_eq!(password.display_assignment(), "POSTGRES_PASSWORD=***REDACTED***");
        assert!(!format!("{:?}", password).contains("hunter2"));

        let user = EnvVar::new("POSTGRES_USER", "alice");
        assert_eq!(user.display_assignment(), "POSTGRES_USER=alice");
    }

    #[test]
    fn test_parse_ps_line() {
        let line = "3f2a1b|qep-postgres-1700000000|qep-postgres:latest|Up 2 minutes|running|2024-01-01 10:00:00 +0000 UTC|0.0.0.0:5432->5432/tcp, :::5432->5432/tcp";
        let info = ContainerInfo::parse_ps_line(line).expect("valid line");
        assert_eq!(info.id, "3f2a1b");
        assert_eq!(info.name, "qep-postgres-1700000000");
        assert_eq!(info.state, "running");
        assert_eq!(info.ports.len(), 2);
    }

    #[test]
    fn test_parse_ps_output_skips_blank_lines() {
        let output = "\nabc|one|img|Up|running|now|\n\ndef|two|img|Up|running|now|\n";
        let containers = ContainerInfo::parse_ps_output(output);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1].name, "two");
        assert!(containers[0].ports.is_empty());
    }

    #[test]
    fn test_container_name_uses_timestamp() {
        let a = ContainerName::at("qep-postgres", 1_700_000_000);
        let b = ContainerName::at("qep-postgres", 1_700_000_001);
        assert_eq!(a.as_str(), "qep-postgres-1700000000");
        assert_ne!(a, b);
    }

    #[test]
    fn test_container_name_now() {
        let before = Utc::now().timestamp();
        let name = ContainerName::now("qep-postgres");
        let secs: i64 = name
            .as_str()
            .strip_prefix("qep-postgres-")
            .and_then(|s| s.parse().ok())
            .unwrap();
        assert!(secs >= before && secs <= Utc::now().timestamp());
    }

    #[test]
    fn test_port_mapping() {
        let spec = RunSpec {
            image: "qep-postgres:latest".to_string(),
            name: ContainerName::at("qep-postgres", 1),
            env: vec![],
            host_port: 6000,
            container_port: 5432,
        };
        assert_eq!(spec.port_mapping(), "6000:5432");
    }
}
