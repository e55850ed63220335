//! Jekyll front matter处理
//!
//! front matter不参与翻译，只把其中的 `lang:` 改为目标语言。

use std::sync::OnceLock;

use regex::Regex;

fn front_matter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
            .expect("front matter正则表达式无效")
    })
}

fn lang_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^lang:[ \t]*[A-Za-z_-]*[ \t]*\r?$").expect("lang正则表达式无效")
    })
}

/// 拆分后的页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    /// front matter内部的YAML（不含分隔线）
    pub front_matter: Option<&'a str>,
    /// 页面正文
    pub body: &'a str,
}

/// 拆分front matter与正文
pub fn split(content: &str) -> Page<'_> {
    match front_matter_regex().captures(content) {
        Some(captures) => {
            let whole = captures.get(0).map(|m| m.end()).unwrap_or(0);
            Page {
                front_matter: Some(captures.get(1).map_or("", |m| m.as_str())),
                body: &content[whole..],
            }
        }
        None => Page {
            front_matter: None,
            body: content,
        },
    }
}

/// 将front matter中的语言改为目标语言，没有 `lang:` 时追加一行
pub fn set_lang(front_matter: &str, lang_code: &str) -> String {
    let replacement = format!("lang: {}", lang_code);
    if lang_line_regex().is_match(front_matter) {
        lang_line_regex()
            .replace_all(front_matter, regex::NoExpand(replacement.as_str()))
            .into_owned()
    } else if front_matter.trim().is_empty() {
        replacement
    } else {
        format!("{}\n{}", front_matter.trim_end(), replacement)
    }
}

/// 重新组装页面
pub fn assemble(front_matter: Option<&str>, body: &str) -> String {
    match front_matter {
        Some(yaml) => format!("---\n{}\n---\n{}", yaml, body),
        None => body.to_string(),
    }
}
