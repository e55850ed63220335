use std::ops::Range;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api_constants::{api_config, service_config, status_codes};
use crate::config::{TargetLanguage, TranslatorConfig};
use crate::error::{Result, TranslationError};
use crate::translation_error;

/// 文本翻译接口
///
/// 返回的译文与输入一一对应、顺序一致。
pub trait Translate {
    fn translate_batch<'a>(
        &'a self,
        texts: &'a [String],
        target: TargetLanguage,
    ) -> BoxFuture<'a, Result<Vec<String>>>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a [String],
    source_lang: &'a str,
    target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preserve_formatting: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// DeepL v2 `/translate` 客户端
pub struct DeepLClient {
    client: Client,
    config: TranslatorConfig,
}

impl DeepLClient {
    /// 创建客户端，整个运行期间复用同一个连接池
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;

        let auth = format!(
            "{} {}",
            api_config::AUTH_SCHEME,
            config.credential().expose()
        );
        let mut auth_value = HeaderValue::from_str(&auth)
            .map_err(|_| translation_error!(config, "api_key", "API密钥包含非法字符"))?;
        auth_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(service_config::USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| translation_error!(config, "http_client", e))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    async fn translate_all(&self, texts: &[String], target: TargetLanguage) -> Result<Vec<String>> {
        let chunks = chunk_texts(
            texts,
            self.config.max_texts_per_request(),
            self.config.max_request_bytes(),
        );

        let mut translated = Vec::with_capacity(texts.len());
        for (index, range) in chunks.iter().enumerate() {
            debug!(
                "📦 批次 {}/{}: {} 条文本 -> {}",
                index + 1,
                chunks.len(),
                range.len(),
                target
            );
            let batch = self.request(&texts[range.clone()], target).await?;
            translated.extend(batch);
        }

        Ok(translated)
    }

    async fn request(&self, texts: &[String], target: TargetLanguage) -> Result<Vec<String>> {
        let api_url = self.config.api_url();
        let body = TranslateRequest {
            text: texts,
            source_lang: self.config.source_lang(),
            target_lang: target.deepl_code(),
            preserve_formatting: self.config.preserve_formatting().then_some(true),
        };

        let response = self.client.post(api_url).json(&body).send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &response_text, api_url));
        }

        parse_response(&response_text, texts.len(), api_url)
    }
}

impl Translate for DeepLClient {
    fn translate_batch<'a>(
        &'a self,
        texts: &'a [String],
        target: TargetLanguage,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(self.translate_all(texts, target))
    }
}

/// 按条数和正文大小将文本切分成批次
pub fn chunk_texts(texts: &[String], max_count: usize, max_bytes: usize) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut bytes = 0;

    for (index, text) in texts.iter().enumerate() {
        // 引号和逗号
        let cost = text.len() + 3;
        let count = index - start;
        if count > 0 && (count >= max_count || bytes + cost > max_bytes) {
            chunks.push(start..index);
            start = index;
            bytes = 0;
        }
        bytes += cost;
    }

    if start < texts.len() {
        chunks.push(start..texts.len());
    }
    chunks
}

fn parse_response(body: &str, expected: usize, api_url: &str) -> Result<Vec<String>> {
    let parsed: TranslateResponse = serde_json::from_str(body).map_err(|e| {
        translation_error!(translation_api, 200, format!("无法解析响应: {}", e), api_url)
    })?;

    if parsed.translations.len() != expected {
        return Err(translation_error!(
            translation_api,
            200,
            format!(
                "译文数量不匹配: 请求{}条，返回{}条",
                expected,
                parsed.translations.len()
            ),
            api_url
        ));
    }

    if let Some(lang) = parsed
        .translations
        .first()
        .and_then(|t| t.detected_source_language.as_deref())
    {
        debug!("🔍 检测到源语言: {}", lang);
    }

    Ok(parsed.translations.into_iter().map(|t| t.text).collect())
}

fn api_error(status: u16, body: &str, api_url: &str) -> TranslationError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let message = match status {
        status_codes::FORBIDDEN => format!("认证失败，请检查API密钥 ({})", detail),
        status_codes::QUOTA_EXCEEDED => format!("翻译配额已用尽 ({})", detail),
        status_codes::TOO_MANY_REQUESTS => format!("请求过于频繁 ({})", detail),
        _ => detail,
    };

    translation_error!(translation_api, status, message, api_url)
}
