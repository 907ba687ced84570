//! 进度解析 - 业务能力层
//!
//! 站点的视频进度条不暴露数值，只能从元素的 style 属性里抠出
//! `width: 37.5%;` 这样的片段。这里只负责"解析"能力，不关心轮询流程

use regex::Regex;
use std::sync::OnceLock;

/// 匹配 width 声明里的百分比数字，大小写和空白都宽容处理
fn width_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)width\s*:?\s*(\d+(?:\.\d+)?)\s*%").expect("进度正则不合法")
    })
}

/// 从 style 文本中提取进度百分比
///
/// # 参数
/// - `style`: 元素的 style 属性原文，可能混有无关的 CSS 声明
///
/// # 返回
/// 解析成功返回 [0, 100] 内的百分比；输入为空、没有匹配、
/// 数字解析失败或超出范围时返回 None
pub fn extract_width_percentage(style: &str) -> Option<f64> {
    if style.is_empty() {
        return None;
    }

    let captures = width_regex().captures(style)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;

    // 超出范围视为解析失败，不做截断
    if !(0.0..=100.0).contains(&value) {
        return None;
    }

    Some(value)
}
