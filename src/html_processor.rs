//! HTML处理模块
//!
//! 提供可翻译文本的提取、按原始字节位置回填译文，以及译文结构校验功能。
//!
//! 提取基于对原始字符串的词法扫描而不是DOM序列化，因此标签、属性和空白
//! 在输出中保持逐字节不变，只有文本内容被替换。

// 标准库导入
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::OnceLock;

// 第三方crate导入
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

// 本地模块导入
use crate::error::Result;
use crate::translation_error;

/// 可翻译的属性
pub const TRANSLATABLE_ATTRIBUTES: &[&str] = &["title", "alt", "placeholder", "aria-label"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// 内容按代码处理、不提交翻译的元素
const CODE_ELEMENTS: &[&str] = &["code", "kbd", "samp"];

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?s)<!--.*?-->",
            r"|<!\[CDATA\[.*?\]\]>",
            r"|<![A-Za-z][^>]*>",
            r"|<\?[^>]*>",
            r"|\{%.*?%\}",
            r"|\{\{.*?\}\}",
            r#"|</?[A-Za-z][^\s/<>]*(?:"[^"]*"|'[^']*'|\{%.*?%\}|\{\{.*?\}\}|[^'"<>])*>"#,
        ))
        .expect("标记正则表达式无效")
    })
}

fn tag_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(/?)([A-Za-z][^\s/<>]*)").expect("标签名正则表达式无效"))
}

fn stray_markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[A-Za-z/!?]").expect("残缺标记正则表达式无效"))
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s(title|alt|placeholder|aria-label)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("属性正则表达式无效")
    })
}

fn no_translate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r#"(?i)\stranslate\s*=\s*["']?no\b"#,
            r#"|\sclass\s*=\s*(?:"[^"]*\bnotranslate\b[^"]*"|'[^']*\bnotranslate\b[^']*'|notranslate\b)"#,
        ))
        .expect("translate属性正则表达式无效")
    })
}

fn raw_text_close_regex(name: &str) -> Option<&'static Regex> {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static STYLE: OnceLock<Regex> = OnceLock::new();
    match name {
        "script" => Some(
            SCRIPT.get_or_init(|| Regex::new(r"(?i)</script\s*>").expect("script正则表达式无效")),
        ),
        "style" => Some(
            STYLE.get_or_init(|| Regex::new(r"(?i)</style\s*>").expect("style正则表达式无效")),
        ),
        _ => None,
    }
}

/// 文本片段的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// 文本节点
    Text,
    /// 属性值，记录属性名和引号
    Attribute { name: String, quote: char },
}

/// 一个可翻译的文本片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// 在原始HTML中的字节范围（不含首尾空白）
    pub range: Range<usize>,
    pub kind: SegmentKind,
    /// 解码实体后的文本，作为翻译输入
    pub text: String,
}

/// 提取选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// 是否提取 title/alt/placeholder/aria-label 属性
    pub translate_attributes: bool,
}

struct OpaqueRegion {
    tag: String,
    depth: usize,
}

struct Scanner<'a> {
    html: &'a str,
    options: ExtractOptions,
    segments: Vec<TextSegment>,
    opaque: Option<OpaqueRegion>,
}

impl<'a> Scanner<'a> {
    fn new(html: &'a str, options: ExtractOptions) -> Self {
        Self {
            html,
            options,
            segments: Vec::new(),
            opaque: None,
        }
    }

    fn run(mut self) -> Result<Vec<TextSegment>> {
        let mut pos = 0;
        while pos < self.html.len() {
            match markup_regex().find_at(self.html, pos) {
                Some(token) => {
                    self.text(pos..token.start())?;
                    pos = self.markup(token.range())?;
                }
                None => {
                    self.text(pos..self.html.len())?;
                    pos = self.html.len();
                }
            }
        }
        Ok(self.segments)
    }

    fn text(&mut self, range: Range<usize>) -> Result<()> {
        let html = self.html;
        let raw = &html[range.clone()];
        if let Some(stray) = stray_markup_regex().find(raw) {
            let offset = range.start + stray.start();
            return Err(translation_error!(
                html_parse,
                format!("第{}行存在未闭合的标记", line_of(html, offset))
            ));
        }

        if self.opaque.is_none() {
            if let Some(segment) = make_segment(html, range, SegmentKind::Text) {
                self.segments.push(segment);
            }
        }
        Ok(())
    }

    /// 处理一个标记，返回下一次扫描的起点
    fn markup(&mut self, range: Range<usize>) -> Result<usize> {
        let html = self.html;
        let token = &html[range.clone()];
        let captures = match tag_name_regex().captures(token) {
            Some(captures) => captures,
            // 注释、doctype、Liquid标签等
            None => return Ok(range.end),
        };

        let closing = captures.get(1).map_or(false, |m| !m.as_str().is_empty());
        let name = captures
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let self_closing = token.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str());

        if closing {
            if let Some(region) = self.opaque.as_mut() {
                if region.tag == name {
                    region.depth -= 1;
                    if region.depth == 0 {
                        self.opaque = None;
                    }
                }
            }
            return Ok(range.end);
        }

        match self.opaque.as_mut() {
            Some(region) => {
                if region.tag == name && !self_closing {
                    region.depth += 1;
                }
            }
            None => {
                if no_translate_regex().is_match(token) || CODE_ELEMENTS.contains(&name.as_str()) {
                    if !self_closing {
                        self.opaque = Some(OpaqueRegion {
                            tag: name.clone(),
                            depth: 1,
                        });
                    }
                } else if self.options.translate_attributes {
                    self.attributes(range.start, token);
                }
            }
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !token.ends_with("/>") {
            return self.skip_raw_text(&name, range);
        }

        Ok(range.end)
    }

    fn attributes(&mut self, tag_start: usize, token: &str) {
        for captures in attribute_regex().captures_iter(token) {
            let name = captures
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            let (value, quote) = match (captures.get(2), captures.get(3)) {
                (Some(value), _) => (value, '"'),
                (None, Some(value)) => (value, '\''),
                (None, None) => continue,
            };
            let range = tag_start + value.start()..tag_start + value.end();
            if let Some(segment) =
                make_segment(self.html, range, SegmentKind::Attribute { name, quote })
            {
                self.segments.push(segment);
            }
        }
    }

    fn skip_raw_text(&self, name: &str, range: Range<usize>) -> Result<usize> {
        let close = raw_text_close_regex(name).and_then(|re| re.find_at(self.html, range.end));
        match close {
            Some(close) => Ok(close.end()),
            None => Err(translation_error!(
                html_parse,
                format!(
                    "第{}行的<{}>标签没有闭合",
                    line_of(self.html, range.start),
                    name
                )
            )),
        }
    }
}

fn make_segment(html: &str, range: Range<usize>, kind: SegmentKind) -> Option<TextSegment> {
    let raw = &html[range.clone()];
    let leading = raw.len() - raw.trim_start().len();
    let trailing = raw.len() - raw.trim_end().len();
    if leading == raw.len() {
        return None;
    }

    let core = range.start + leading..range.end - trailing;
    let text = html_escape::decode_html_entities(&html[core.clone()]).into_owned();
    if !text.chars().any(char::is_alphabetic) {
        return None;
    }

    Some(TextSegment {
        range: core,
        kind,
        text,
    })
}

fn line_of(html: &str, offset: usize) -> usize {
    html[..offset].matches('\n').count() + 1
}

/// 提取HTML中的可翻译文本片段
///
/// 跳过 script/style 内容、注释、Liquid模板标签、code/kbd/samp 元素以及标记了
/// `translate="no"` 或 `notranslate` 的元素。结构残缺时返回 `HtmlParse` 错误。
pub fn extract_segments(html: &str, options: ExtractOptions) -> Result<Vec<TextSegment>> {
    Scanner::new(html, options).run()
}

/// 去重后的待翻译文本，保持首次出现的顺序
pub fn unique_texts(segments: &[TextSegment]) -> Vec<String> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .filter(|segment| seen.insert(segment.text.as_str()))
        .map(|segment| segment.text.clone())
        .collect()
}

/// 将译文回填到原始HTML
///
/// 没有译文、译文为空或与原文相同的片段保留原始字节。
pub fn apply_translations(
    html: &str,
    segments: &[TextSegment],
    translations: &HashMap<String, String>,
) -> String {
    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;

    for segment in segments {
        let translated = match translations.get(&segment.text) {
            Some(t) if !t.trim().is_empty() && *t != segment.text => t,
            _ => continue,
        };

        output.push_str(&html[cursor..segment.range.start]);
        match &segment.kind {
            SegmentKind::Text => output.push_str(&html_escape::encode_text(translated)),
            SegmentKind::Attribute { quote: '\'', .. } => {
                output.push_str(&html_escape::encode_single_quoted_attribute(translated))
            }
            SegmentKind::Attribute { .. } => {
                output.push_str(&html_escape::encode_double_quoted_attribute(translated))
            }
        }
        cursor = segment.range.end;
    }

    output.push_str(&html[cursor..]);
    output
}

/// 解析HTML为DOM
pub fn parse_html(html: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| translation_error!(html_parse, format!("{:?}", e)))
}

/// 校验译文与原文的元素结构一致
///
/// 比较标签名、嵌套关系和属性；开启属性翻译时可翻译属性只比较名称。
pub fn verify_structure(original: &str, translated: &str, translate_attributes: bool) -> Result<()> {
    let before = element_skeleton(&parse_html(original)?, translate_attributes);
    let after = element_skeleton(&parse_html(translated)?, translate_attributes);

    if before == after {
        return Ok(());
    }

    let position = before
        .iter()
        .zip(after.iter())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| before.len().min(after.len()));
    Err(translation_error!(
        html_parse,
        format!(
            "译文结构与原文不一致: 第{}个标记 {:?} -> {:?}",
            position + 1,
            before.get(position),
            after.get(position)
        )
    ))
}

fn element_skeleton(dom: &RcDom, translate_attributes: bool) -> Vec<String> {
    enum Visit {
        Enter(Handle),
        Exit(String),
    }

    let mut skeleton = Vec::new();
    let mut stack = vec![Visit::Enter(dom.document.clone())];

    while let Some(visit) = stack.pop() {
        let node = match visit {
            Visit::Enter(node) => node,
            Visit::Exit(tag_name) => {
                skeleton.push(format!("</{}>", tag_name));
                continue;
            }
        };

        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        {
            let tag_name = name.local.as_ref().to_string();
            let mut entry = format!("<{}", tag_name);
            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.as_ref();
                if translate_attributes && TRANSLATABLE_ATTRIBUTES.contains(&attr_name) {
                    entry.push_str(&format!(" {}=*", attr_name));
                } else {
                    entry.push_str(&format!(" {}={:?}", attr_name, &*attr.value));
                }
            }
            entry.push('>');
            skeleton.push(entry);
            stack.push(Visit::Exit(tag_name));
        }

        // 逆序入栈以保持文档顺序
        for child in node.children.borrow().iter().rev() {
            stack.push(Visit::Enter(child.clone()));
        }
    }

    skeleton
}
