//! 题干文本处理
//!
//! 通知中的题干预览：去 HTML 标签、解码实体、合并空白、截断。

use phf::phf_map;
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::utils::logging::truncate_text;

/// 常见命名实体
static NAMED_ENTITIES: phf::Map<&'static str, char> = phf_map! {
    "amp" => '&',
    "lt" => '<',
    "gt" => '>',
    "quot" => '"',
    "apos" => '\'',
    "nbsp" => '\u{a0}',
    "copy" => '©',
    "reg" => '®',
    "deg" => '°',
    "middot" => '·',
    "times" => '×',
    "divide" => '÷',
    "euro" => '€',
    "hellip" => '…',
    "ndash" => '–',
    "mdash" => '—',
    "lsquo" => '‘',
    "rsquo" => '’',
    "ldquo" => '“',
    "rdquo" => '”',
    "laquo" => '«',
    "raquo" => '»',
    "iquest" => '¿',
    "iexcl" => '¡',
    "aacute" => 'á',
    "eacute" => 'é',
    "iacute" => 'í',
    "oacute" => 'ó',
    "uacute" => 'ú',
    "ntilde" => 'ñ',
    "uuml" => 'ü',
    "Aacute" => 'Á',
    "Eacute" => 'É',
    "Iacute" => 'Í',
    "Oacute" => 'Ó',
    "Uacute" => 'Ú',
    "Ntilde" => 'Ñ',
};

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern"))
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});").expect("entity pattern"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"))
}

/// 去掉 HTML 标签（标签位置替换为空格，避免相邻单词粘连）
pub fn strip_tags(html: &str) -> String {
    tag_regex().replace_all(html, " ").into_owned()
}

/// 解码 HTML 实体，无法识别的实体原样保留
pub fn decode_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                NAMED_ENTITIES.get(body).copied()
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// 合并连续空白并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

/// 生成纯文本预览
///
/// # 参数
/// - `html`: 题干 HTML
/// - `max_chars`: 最大字符数（含截断时追加的 `...`）
pub fn plain_preview(html: &str, max_chars: usize) -> String {
    let text = collapse_whitespace(&decode_entities(&strip_tags(html)));
    truncate_text(&text, max_chars)
}
