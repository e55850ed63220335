/// 翻译API配置常量
///
/// 该文件定义了DeepL翻译服务相关的常量配置，方便统一管理和维护

/// DeepL API配置
pub mod api_config {
    /// DeepL Pro接口地址
    pub const PRO_API_URL: &str = "https://api.deepl.com/v2/translate";

    /// DeepL Free接口地址
    pub const FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";

    /// Free账户密钥后缀
    pub const FREE_KEY_SUFFIX: &str = ":fx";

    /// API密钥环境变量
    pub const API_KEY_ENV: &str = "DEEPL_API_KEY";

    /// 认证头前缀
    pub const AUTH_SCHEME: &str = "DeepL-Auth-Key";
}

/// 翻译服务配置
pub mod service_config {
    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "EN";

    /// 单次请求最多文本条数（DeepL限制为50）
    pub const MAX_TEXTS_PER_REQUEST: usize = 50;

    /// 单次请求正文上限（DeepL限制为128KiB，留出JSON开销）
    pub const MAX_REQUEST_BYTES: usize = 100 * 1024;

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// 请求User-Agent
    pub const USER_AGENT: &str = concat!("page-translate/", env!("CARGO_PKG_VERSION"));
}

/// 站点布局配置
pub mod site_config {
    /// 扫描时跳过的目录（`.` 和 `_` 开头的目录另外跳过）
    pub const SKIPPED_DIRS: &[&str] = &["node_modules"];

    /// 可识别的HTML扩展名
    pub const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
}

/// DeepL状态码
pub mod status_codes {
    /// 认证失败
    pub const FORBIDDEN: u16 = 403;

    /// 请求过于频繁
    pub const TOO_MANY_REQUESTS: u16 = 429;

    /// 配额用尽
    pub const QUOTA_EXCEEDED: u16 = 456;
}

/// 根据密钥类型选择API地址
pub fn default_api_url(api_key: &str) -> &'static str {
    if api_key.ends_with(api_config::FREE_KEY_SUFFIX) {
        api_config::FREE_API_URL
    } else {
        api_config::PRO_API_URL
    }
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// 判断扩展名是否为HTML
pub fn is_html_extension(ext: &str) -> bool {
    site_config::HTML_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}
