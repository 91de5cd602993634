//! 配置模块
//!
//! 配置从 TOML 文件加载，启动时校验后显式传递给各组件。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 默认配置文件查找路径
pub const CONFIG_PATHS: [&str; 2] = ["config.toml", "./config/config.toml"];

/// 服务配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 帖子配置
    pub topic: TopicConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 绑定地址
    pub bind_address: String,
    /// HTTP 服务端口
    pub port: u16,
    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// 数据库配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 连接串；为空时使用内存存储
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志目录
    pub log_dir: PathBuf,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 是否输出到文件
    pub file_output: bool,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 日志级别或 EnvFilter 指令
    pub level: String,
}

/// 帖子配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// 自动摘要的最大字符数
    pub summary_length: usize,
    /// 每个帖子最多记录的图片数
    pub max_images: usize,
    /// 列表页摘要截断长度
    pub list_summary_length: usize,
    /// 列表页预览图片数
    pub list_images: usize,
    /// 没有摘要时显示的占位文本
    pub summary_placeholder: String,
    /// 禁用词，大小写不敏感
    pub forbidden_words: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            timeout_seconds: 10,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 20,
            min_connections: 5,
            acquire_timeout_seconds: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_prefix: "sforum".to_string(),
            file_output: true,
            console_output: true,
            level: "info".to_string(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            summary_length: 300,
            max_images: 20,
            list_summary_length: 300,
            list_images: 6,
            summary_placeholder: "未捕获到本文摘要内容".to_string(),
            forbidden_words: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::FileWrite(e.to_string()))?;
        }

        fs::write(path.as_ref(), content).map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// 按显式路径、默认路径、默认值的顺序加载，然后应用环境变量
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load_from_file(path)?
            }
            None => match CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
                Some(path) => {
                    info!("Loading configuration from {}", path.display());
                    Self::load_from_file(path)?
                }
                None => {
                    info!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// `DATABASE_URL` 覆盖数据库连接串
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("HTTP端口必须大于0".to_string()));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }
        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Validation("请求超时时间必须大于0".to_string()));
        }

        if let Some(url) = &self.database.url {
            if url.trim().is_empty() {
                return Err(ConfigError::Validation("数据库连接串不能为空".to_string()));
            }
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation("最大连接数必须大于0".to_string()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Validation(
                "最小连接数不能大于最大连接数".to_string(),
            ));
        }

        if self.logging.file_prefix.is_empty() {
            return Err(ConfigError::Validation("日志文件前缀不能为空".to_string()));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}",
                self.logging.level
            )));
        }

        if self.topic.summary_length == 0 || self.topic.list_summary_length == 0 {
            return Err(ConfigError::Validation("摘要长度必须大于0".to_string()));
        }
        if self.topic.forbidden_words.iter().any(|w| w.trim().is_empty()) {
            return Err(ConfigError::Validation("禁用词不能为空".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("文件写入错误: {0}")]
    FileWrite(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("配置序列化错误: {0}")]
    Serialize(String),
    #[error("配置验证错误: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, None);
        assert_eq!(config.topic.summary_length, 300);
        assert_eq!(config.topic.list_images, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.database.min_connections = 50;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.topic.forbidden_words = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.topic.forbidden_words = vec!["spam".to_string()];
        config.save_to_file(&config_path).unwrap();

        let loaded_config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[server]\nport = 8088\n").unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[server\n").unwrap();

        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(ConfigError::Parse(_))
        ));
    }
}
