use std::fmt;

#[derive(Debug, Clone)]
pub enum TinylinkError {
    MissingParameter(String),
    AllocationExhausted(String),
    NotFound(String),
    StoreUnavailable(String),
    CacheUnavailable(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
}

impl TinylinkError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            TinylinkError::MissingParameter(_) => "E001",
            TinylinkError::AllocationExhausted(_) => "E002",
            TinylinkError::NotFound(_) => "E003",
            TinylinkError::StoreUnavailable(_) => "E004",
            TinylinkError::CacheUnavailable(_) => "E005",
            TinylinkError::DatabaseConfig(_) => "E006",
            TinylinkError::DatabaseConnection(_) => "E007",
            TinylinkError::DatabaseOperation(_) => "E008",
            TinylinkError::Validation(_) => "E009",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TinylinkError::MissingParameter(_) => "Missing Parameter",
            TinylinkError::AllocationExhausted(_) => "Allocation Exhausted",
            TinylinkError::NotFound(_) => "Resource Not Found",
            TinylinkError::StoreUnavailable(_) => "Store Unavailable",
            TinylinkError::CacheUnavailable(_) => "Cache Unavailable",
            TinylinkError::DatabaseConfig(_) => "Database Configuration Error",
            TinylinkError::DatabaseConnection(_) => "Database Connection Error",
            TinylinkError::DatabaseOperation(_) => "Database Operation Error",
            TinylinkError::Validation(_) => "Validation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            TinylinkError::MissingParameter(msg)
            | TinylinkError::AllocationExhausted(msg)
            | TinylinkError::NotFound(msg)
            | TinylinkError::StoreUnavailable(msg)
            | TinylinkError::CacheUnavailable(msg)
            | TinylinkError::DatabaseConfig(msg)
            | TinylinkError::DatabaseConnection(msg)
            | TinylinkError::DatabaseOperation(msg)
            | TinylinkError::Validation(msg) => msg,
        }
    }

    /// Infrastructure errors worth retrying later, as opposed to a definitive answer.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            TinylinkError::StoreUnavailable(_)
                | TinylinkError::CacheUnavailable(_)
                | TinylinkError::DatabaseConnection(_)
        )
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for TinylinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TinylinkError {}

// 便捷的构造函数
impl TinylinkError {
    pub fn missing_parameter<T: Into<String>>(msg: T) -> Self {
        TinylinkError::MissingParameter(msg.into())
    }

    pub fn allocation_exhausted<T: Into<String>>(msg: T) -> Self {
        TinylinkError::AllocationExhausted(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TinylinkError::NotFound(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        TinylinkError::StoreUnavailable(msg.into())
    }

    pub fn cache_unavailable<T: Into<String>>(msg: T) -> Self {
        TinylinkError::CacheUnavailable(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        TinylinkError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        TinylinkError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        TinylinkError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        TinylinkError::Validation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TinylinkError {
    fn from(err: sea_orm::DbErr) -> Self {
        TinylinkError::DatabaseOperation(err.to_string())
    }
}

impl From<redis::RedisError> for TinylinkError {
    fn from(err: redis::RedisError) -> Self {
        TinylinkError::CacheUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TinylinkError>;
