//! 配置管理模块
//!
//! 提供CLI参数解析、API凭据解析和翻译配置管理功能

// 标准库导入
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// 第三方crate导入
use clap::{Parser, ValueEnum};

// 本地模块导入
use crate::api_constants::{api_config, default_api_url, is_valid_api_url, service_config};
use crate::error::Result;
use crate::translation_error;

/// 目标语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    /// 法语
    French,
    /// 西班牙语
    Spanish,
}

impl TargetLanguage {
    /// 全部支持的目标语言（按处理顺序）
    pub const ALL: [TargetLanguage; 2] = [TargetLanguage::French, TargetLanguage::Spanish];

    /// 小写语言代码，用于目录名、文件后缀和front matter
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::French => "fr",
            TargetLanguage::Spanish => "es",
        }
    }

    /// DeepL接口使用的语言代码
    pub fn deepl_code(&self) -> &'static str {
        match self {
            TargetLanguage::French => "FR",
            TargetLanguage::Spanish => "ES",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `--lang` 参数取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageSelection {
    /// 仅法语
    Fr,
    /// 仅西班牙语
    Es,
    /// 法语和西班牙语
    Both,
}

impl LanguageSelection {
    /// 展开为目标语言集合
    pub fn languages(&self) -> Vec<TargetLanguage> {
        match self {
            LanguageSelection::Fr => vec![TargetLanguage::French],
            LanguageSelection::Es => vec![TargetLanguage::Spanish],
            LanguageSelection::Both => TargetLanguage::ALL.to_vec(),
        }
    }
}

/// 输出文件放置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputLayout {
    /// `<root>/<lang>/<相对路径>`
    #[default]
    Directory,
    /// `<目录>/<文件名>_<lang>.<扩展名>`
    Suffix,
}

/// API凭据
///
/// Debug输出不会暴露密钥内容。
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// 取出原始密钥
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// 解析API凭据
///
/// 优先使用命令行参数，其次是环境变量；空字符串视为未提供。
/// 非演练模式下缺少凭据会返回致命错误。
pub fn resolve_credential(
    flag: Option<&str>,
    env_value: Option<String>,
    dry_run: bool,
) -> Result<Option<Credential>> {
    let key = flag
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env_value
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        });

    match key {
        Some(key) => Ok(Some(Credential::new(key))),
        None if dry_run => Ok(None),
        None => Err(translation_error!(
            missing_credential,
            api_config::API_KEY_ENV
        )),
    }
}

/// DeepL客户端配置结构体
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use page_translate::config::{Credential, TranslatorConfig};
///
/// let config = TranslatorConfig::new(Credential::new("secret:fx"))
///     .with_source_lang("EN")
///     .with_max_texts_per_request(20);
/// assert_eq!(config.api_url(), "https://api-free.deepl.com/v2/translate");
/// ```
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    credential: Credential,
    api_url: String,
    source_lang: String,
    timeout: Duration,
    max_texts_per_request: usize,
    max_request_bytes: usize,
    preserve_formatting: bool,
}

impl TranslatorConfig {
    /// 创建新的配置实例
    ///
    /// API地址根据密钥类型自动选择（`:fx` 结尾为Free账户）。
    pub fn new(credential: Credential) -> Self {
        let api_url = default_api_url(credential.expose()).to_string();
        Self {
            credential,
            api_url,
            source_lang: service_config::DEFAULT_SOURCE_LANG.to_string(),
            timeout: Duration::from_secs(service_config::REQUEST_TIMEOUT_SECONDS),
            max_texts_per_request: service_config::MAX_TEXTS_PER_REQUEST,
            max_request_bytes: service_config::MAX_REQUEST_BYTES,
            preserve_formatting: true,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_texts_per_request(&self) -> usize {
        self.max_texts_per_request
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    pub fn preserve_formatting(&self) -> bool {
        self.preserve_formatting
    }

    /// 设置API地址
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    /// 设置源语言代码
    pub fn with_source_lang(mut self, lang: &str) -> Self {
        self.source_lang = lang.trim().to_ascii_uppercase();
        self
    }

    /// 设置请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 设置单次请求最多文本条数
    pub fn with_max_texts_per_request(mut self, count: usize) -> Self {
        self.max_texts_per_request = count;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !is_valid_api_url(&self.api_url) {
            return Err(translation_error!(
                config,
                "api_url",
                format!("无效的API地址: {}", self.api_url)
            ));
        }
        if self.source_lang.is_empty() {
            return Err(translation_error!(config, "source_lang", "源语言不能为空"));
        }
        if self.max_texts_per_request == 0 || self.max_request_bytes == 0 {
            return Err(translation_error!(config, "batch", "批处理上限必须大于0"));
        }
        Ok(())
    }
}

/// 一次运行的配置
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 项目根目录
    pub root: PathBuf,
    /// 指定的单个文件
    pub file: Option<PathBuf>,
    /// 目标语言集合
    pub languages: Vec<TargetLanguage>,
    /// 输出放置方式
    pub layout: OutputLayout,
    /// 演练模式
    pub dry_run: bool,
    /// 是否翻译 title/alt/placeholder/aria-label 属性
    pub translate_attributes: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            file: None,
            languages: TargetLanguage::ALL.to_vec(),
            layout: OutputLayout::default(),
            dry_run: false,
            translate_attributes: false,
        }
    }
}

/// CLI参数结构
#[derive(Parser, Debug)]
#[command(author, version, about = "HTML页面翻译CLI工具 - 通过DeepL生成法语和西班牙语页面", long_about = None)]
pub struct Cli {
    /// DeepL API密钥 (默认读取DEEPL_API_KEY环境变量)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// 仅显示将要翻译的内容，不调用API也不写文件
    #[arg(long)]
    pub dry_run: bool,

    /// 目标语言
    #[arg(long, value_enum, default_value_t = LanguageSelection::Both)]
    pub lang: LanguageSelection,

    /// 指定单个文件 (相对路径基于项目根目录)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// 项目根目录
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// 输出文件放置方式
    #[arg(long, value_enum, default_value_t = OutputLayout::Directory)]
    pub layout: OutputLayout,

    /// 自定义翻译API地址
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// 源语言代码
    #[arg(long, default_value = service_config::DEFAULT_SOURCE_LANG)]
    pub source_lang: String,

    /// 同时翻译 title/alt/placeholder/aria-label 属性
    #[arg(long)]
    pub attributes: bool,

    /// 请求超时时间（秒）
    #[arg(long, default_value_t = service_config::REQUEST_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// 详细输出模式
    #[arg(short, long)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// 生成运行配置
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            root: self.root.clone(),
            file: self.file.clone(),
            languages: self.lang.languages(),
            layout: self.layout,
            dry_run: self.dry_run,
            translate_attributes: self.attributes,
        }
    }

    /// 生成DeepL客户端配置
    pub fn translator_config(&self, credential: Credential) -> Result<TranslatorConfig> {
        let mut config = TranslatorConfig::new(credential)
            .with_source_lang(&self.source_lang)
            .with_timeout(Duration::from_secs(self.timeout));

        if let Some(url) = self.api_url.as_deref() {
            config = config.with_api_url(url);
        }

        config.validate()?;
        Ok(config)
    }
}
