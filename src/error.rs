//! 统一错误处理模块
//!
//! 提供页面翻译工具的统一错误类型定义，并区分致命错误与单文件可恢复错误

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

/// 页面翻译统一错误类型
///
/// 致命错误（凭据缺失、文件不存在、配置错误）会在处理任何文件之前终止运行；
/// 其余错误只影响当前文件，运行继续。
#[derive(Debug)]
pub enum TranslationError {
    /// 未提供API密钥
    MissingCredential {
        /// 可提供密钥的环境变量
        env_var: String,
    },

    /// 显式指定的输入文件不存在
    FileNotFound {
        /// 文件路径
        path: String,
    },

    /// 网络请求相关错误
    Network {
        /// 错误消息
        message: String,
        /// HTTP状态码（如果适用）
        status_code: Option<u16>,
    },

    /// 翻译API相关错误
    TranslationApi {
        /// API响应状态码
        status_code: u16,
        /// 错误消息
        message: String,
        /// API地址
        api_url: String,
    },

    /// HTML解析相关错误
    HtmlParse {
        /// 具体错误信息
        details: String,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 配置相关错误
    Configuration {
        /// 配置项名称
        field: String,
        /// 错误原因
        reason: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl TranslationError {
    /// 是否应在处理文件之前终止整个运行
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TranslationError::MissingCredential { .. }
                | TranslationError::FileNotFound { .. }
                | TranslationError::Configuration { .. }
        )
    }
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::MissingCredential { env_var } => {
                write!(
                    f,
                    "缺少DeepL API密钥: 请设置{}环境变量或使用--api-key",
                    env_var
                )
            }
            TranslationError::FileNotFound { path } => {
                write!(f, "输入文件不存在: {}", path)
            }
            TranslationError::Network {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "网络请求失败 [{}]: {}", code, message)
                } else {
                    write!(f, "网络请求失败: {}", message)
                }
            }
            TranslationError::TranslationApi {
                status_code,
                message,
                api_url,
            } => {
                write!(f, "翻译API错误 [{}] {}: {}", status_code, api_url, message)
            }
            TranslationError::HtmlParse { details } => {
                write!(f, "HTML解析失败: {}", details)
            }
            TranslationError::FileOperation {
                path,
                operation,
                source,
            } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            TranslationError::Configuration { field, reason } => {
                write!(f, "配置错误 [{}]: {}", field, reason)
            }
            TranslationError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for TranslationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TranslationError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 页面翻译结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! translation_error {
    (missing_credential, $env:expr) => {
        $crate::error::TranslationError::MissingCredential {
            env_var: $env.to_string(),
        }
    };
    (file_not_found, $path:expr) => {
        $crate::error::TranslationError::FileNotFound {
            path: $path.to_string(),
        }
    };
    (network, $msg:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: None,
        }
    };
    (network, $msg:expr, $code:expr) => {
        $crate::error::TranslationError::Network {
            message: $msg.to_string(),
            status_code: Some($code),
        }
    };
    (translation_api, $code:expr, $msg:expr, $url:expr) => {
        $crate::error::TranslationError::TranslationApi {
            status_code: $code,
            message: $msg.to_string(),
            api_url: $url.to_string(),
        }
    };
    (html_parse, $details:expr) => {
        $crate::error::TranslationError::HtmlParse {
            details: $details.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::TranslationError::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
    (config, $field:expr, $reason:expr) => {
        $crate::error::TranslationError::Configuration {
            field: $field.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从anyhow::Error转换为TranslationError
impl From<AnyhowError> for TranslationError {
    fn from(error: AnyhowError) -> Self {
        TranslationError::Internal { source: error }
    }
}

/// 从reqwest::Error转换为TranslationError
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        TranslationError::Network {
            message: error.to_string(),
            status_code,
        }
    }
}

/// 从std::io::Error转换为TranslationError
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslationError::TranslationApi {
            status_code: 456,
            message: "Quota exceeded".to_string(),
            api_url: "https://api.deepl.com/v2/translate".to_string(),
        };

        assert_eq!(
            format!("{}", err),
            "翻译API错误 [456] https://api.deepl.com/v2/translate: Quota exceeded"
        );
    }

    #[test]
    fn test_error_macro() {
        let err = translation_error!(network, "Test error", 502);
        match err {
            TranslationError::Network {
                message,
                status_code,
            } => {
                assert_eq!(message, "Test error");
                assert_eq!(status_code, Some(502));
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(translation_error!(missing_credential, "DEEPL_API_KEY").is_fatal());
        assert!(translation_error!(file_not_found, "index.html").is_fatal());
        assert!(translation_error!(config, "api_url", "bad").is_fatal());
        assert!(!translation_error!(html_parse, "unclosed <script>").is_fatal());
        assert!(!translation_error!(translation_api, 500, "boom", "u").is_fatal());
    }

    #[test]
    fn test_anyhow_conversion() {
        let anyhow_err = anyhow::anyhow!("Test anyhow error");
        let translation_err: TranslationError = anyhow_err.into();

        match translation_err {
            TranslationError::Internal { .. } => {}
            _ => panic!("Wrong error type"),
        }
    }
}
