//! 数据库相关领域模型

use std::fmt;

use super::container::EnvVar;

/// 数据库凭据与端口
#[derive(Clone, PartialEq, Eq)]
pub struct DbSettings {
    pub user: String,
    pub password: String,
    pub database: String,
    /// 宿主机端口
    pub port: u16,
}

impl DbSettings {
    pub const DEFAULT_USER: &'static str = "postgres";
    pub const DEFAULT_PASSWORD: &'static str = "postgres";
    pub const DEFAULT_DATABASE: &'static str = "postgres";
    pub const DEFAULT_PORT: u16 = 5432;

    /// 构建参数与运行时环境变量共用的凭据
    pub fn credential_vars(&self) -> Vec<EnvVar> {
        vec![
            EnvVar::new("POSTGRES_USER", &self.user),
            EnvVar::new("POSTGRES_PASSWORD", &self.password),
            EnvVar::new("POSTGRES_DB", &self.database),
        ]
    }
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            user: Self::DEFAULT_USER.to_string(),
            password: Self::DEFAULT_PASSWORD.to_string(),
            database: Self::DEFAULT_DATABASE.to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("user", &self.user)
            .field("password", &EnvVar::REDACTED)
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

/// SQL 验证结果
#[derive(Debug, PartialEq)]
pub struct SqlValidation {
    pub valid: bool,
    pub error: Option<String>,
}

impl SqlValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            valid: false,
            error: Some(message.to_string()),
        }
    }
}

/// 检查是否包含写操作
pub fn is_dangerous_sql(sql: &str) -> bool {
    const WRITE_KEYWORDS: &[&str] = &[
        "DELETE", "TRUNCATE", "DROP", "ALTER", "INSERT", "UPDATE", "CREATE", "GRANT", "REVOKE",
        "COPY",
    ];

    sql.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .any(|word| WRITE_KEYWORDS.iter().any(|kw| word.eq_ignore_ascii_case(kw)))
}

/// 是否只有一条语句
///
/// 引号内的 `;` 不算分隔符，末尾的 `;` 允许
pub fn is_single_statement(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut terminated = false;

    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if terminated => {
                if !c.is_whitespace() && c != ';' {
                    return false;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                ';' => terminated = true,
                _ => {}
            },
        }
    }

    true
}

/// 只允许单条只读语句（SELECT / EXPLAIN / WITH）
///
/// 服务端仍以 `default_transaction_read_only` 执行，见 `infra::docker::psql_args`
pub fn validate_sql(sql: &str) -> SqlValidation {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return SqlValidation::invalid("SQL cannot be empty");
    }

    let sql_upper = trimmed.to_uppercase();
    if !sql_upper.starts_with("SELECT")
        && !sql_upper.starts_with("EXPLAIN")
        && !sql_upper.starts_with("WITH")
    {
        return SqlValidation::invalid("SQL must start with SELECT, EXPLAIN, or WITH");
    }

    if !is_single_statement(trimmed) {
        return SqlValidation::invalid("Only a single statement is allowed");
    }

    if is_dangerous_sql(trimmed) {
        return SqlValidation::invalid("Only read-only statements are allowed");
    }

    SqlValidation::ok()
}
