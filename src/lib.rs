//! page-translate - 通过DeepL翻译静态站点HTML页面的工具库
//!
//! 提供HTML文件发现、可翻译文本提取、DeepL调用、译文回填和输出写入等核心功能。

pub mod api_constants;
pub mod config;
pub mod error;
pub mod front_matter;
pub mod html_processor;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod translator;
pub mod utils;
