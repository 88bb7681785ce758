use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::LabelConfig;
use crate::text_metrics;

use super::TextBlock;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|\\n|\n").unwrap());

/// Wraps and measures a label with the configured font settings.
pub(crate) fn measure_label(text: &str, config: &LabelConfig) -> TextBlock {
    let font_size = config.font_size;
    let family = config.font_family.as_str();
    let fast = config.fast_text_metrics;
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, config.wrap_width, font_size, family, fast));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, family, fast))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

/// Relative advance of a character at a 1px font size.
pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        'i' | 'j' | 'l' | 'I' => 0.25,
        '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.28,
        '(' | ')' | '[' | ']' | '{' | '}' | 'f' | 't' | 'r' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.946,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.67,
        'a'..='z' => 0.56,
        _ if ch.is_ascii() => 0.568,
        // wide scripts (CJK and friends)
        _ => 1.0,
    }
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    LINE_BREAK
        .split(text)
        .map(|line| line.trim().to_string())
        .collect()
}

pub(crate) fn wrap_line(
    line: &str,
    max_width: f32,
    font_size: f32,
    font_family: &str,
    fast_metrics: bool,
) -> Vec<String> {
    if text_width(line, font_size, font_family, fast_metrics) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size, font_family, fast_metrics) > max_width
            && !current.is_empty()
        {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str, fast_metrics: bool) -> f32 {
    if fast_metrics {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}
