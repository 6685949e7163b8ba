//! HTML templates for quote cards and free-text cards
//!
//! Every interpolated value goes through [`escape_html`]. Font sizes are
//! chosen from the unescaped character count.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::design::*;
use super::presets::{StylePreset, TextStyle, get_preset};
use super::sanitize::escape_html;

/// Text shown on a card
#[derive(Debug, Clone, Copy)]
pub struct CardContent<'a> {
    pub core_value: &'a str,
    pub supporting_value: &'a str,
    pub quote: &'a str,
    pub author: Option<&'a str>,
}

/// Build the card HTML for `style`; unknown ids fall back to the classic card
pub fn quote_card_html(content: &CardContent<'_>, style: &str) -> String {
    match get_preset(style) {
        Some(preset) => preset_card_html(content, preset),
        None => classic_card_html(content),
    }
}

fn font_imports() -> String {
    FONT_IMPORTS
        .iter()
        .map(|url| format!("@import url('{}');", url))
        .collect::<Vec<_>>()
        .join("\n    ")
}

const DOVE_SVG: &str = r#"<svg class="dove-svg" viewBox="0 0 100 100" xmlns="http://www.w3.org/2000/svg">
          <path d="M20 50 Q30 30, 50 35 Q70 30, 80 50 Q75 40, 65 45 Q70 50, 75 60 Q70 70, 60 65 Q50 70, 40 65 Q30 70, 25 60 Q30 50, 20 50 Z" fill="{secondary}"/>
          <circle cx="65" cy="45" r="3" fill="{primary}"/>
          <path d="M45 50 Q50 45, 55 50 Q60 55, 65 50 Q70 55, 75 60" stroke="{primary}" stroke-width="2" fill="none"/>
          <path d="M35 55 Q40 50, 45 55 Q50 60, 55 55" stroke="{primary}" stroke-width="2" fill="none"/>
        </svg>"#;

/// White card with a gold border, serif type and the brand footer
pub fn classic_card_html(content: &CardContent<'_>) -> String {
    let core_font = core_value_font_size(content.core_value);
    let quote_font = quote_font_size(content.quote);
    let author = content
        .author
        .filter(|a| !a.is_empty())
        .map(|a| format!(r#"<div class="author">&#x2014; {}</div>"#, escape_html(a)))
        .unwrap_or_default();
    let dove = DOVE_SVG
        .replace("{primary}", COLOR_PRIMARY)
        .replace("{secondary}", COLOR_SECONDARY);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <style>
    {imports}

    * {{ box-sizing: border-box; }}

    body {{
      margin: 0;
      padding: 0;
      width: {width}px;
      height: {height}px;
      background: {white};
      display: flex;
      justify-content: center;
      align-items: center;
      font-family: {font_primary};
    }}

    .container {{
      width: {container_width}px;
      height: {container_height}px;
      background: {white};
      border: 5px solid {border};
      padding: {padding}px;
      display: flex;
      flex-direction: column;
      justify-content: space-between;
      position: relative;
    }}

    .header {{ text-align: center; margin-bottom: {header_margin}; flex-shrink: 0; }}

    .core-value {{
      font-family: {font_primary};
      font-size: {core_font};
      font-weight: 400;
      color: {black};
      margin-bottom: 12px;
      line-height: 1.2;
      text-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
    }}

    .supporting-value {{
      font-family: {font_primary};
      font-size: {supporting_font};
      font-weight: 400;
      color: {gray};
      text-shadow: 0 1px 2px rgba(0, 0, 0, 0.05);
    }}

    .quote-section {{
      flex: 1;
      display: flex;
      flex-direction: column;
      justify-content: center;
      text-align: center;
      align-items: center;
      padding: 40px 20px;
    }}

    .quote {{
      font-family: {font_secondary};
      font-size: {quote_font};
      font-weight: 400;
      color: {black};
      line-height: 1.1;
      margin-bottom: {quote_margin};
      text-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
      max-width: 95%;
      word-wrap: break-word;
    }}

    .author {{
      font-family: {font_secondary};
      font-size: {author_font};
      font-weight: 400;
      color: {gray};
      text-align: right;
      font-style: italic;
      align-self: flex-end;
      max-width: 95%;
    }}

    .footer {{
      border-top: 2px solid {border};
      padding-top: {footer_padding};
      text-align: center;
      flex-shrink: 0;
    }}

    .footer-content {{ display: flex; align-items: center; justify-content: center; }}

    .footer-text {{
      font-family: {font_footer};
      font-size: {footer_font};
      color: {black};
      font-weight: 400;
    }}

    .dove-icon {{
      margin-left: {icon_margin};
      width: {icon_size};
      height: {icon_size};
      background: {primary};
      border-radius: 50%;
      display: inline-flex;
      align-items: center;
      justify-content: center;
    }}

    .dove-svg {{ width: {icon_svg_size}; height: {icon_svg_size}; fill: {secondary}; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <div class="core-value">Core Value: {core_value}</div>
      <div class="supporting-value">Supporting Value: {supporting_value}</div>
    </div>
    <div class="quote-section">
      <div class="quote">&quot;{quote}&quot;</div>
      {author}
    </div>
    <div class="footer">
      <div class="footer-content">
        <span class="footer-text">{handle}</span>
        <div class="dove-icon">
        {dove}
        </div>
      </div>
    </div>
  </div>
</body>
</html>"#,
        imports = font_imports(),
        width = IMAGE_WIDTH,
        height = IMAGE_HEIGHT,
        container_width = CONTAINER_WIDTH,
        container_height = CONTAINER_HEIGHT,
        padding = PADDING,
        white = COLOR_WHITE,
        black = COLOR_BLACK,
        gray = COLOR_GRAY,
        border = COLOR_BORDER,
        primary = COLOR_PRIMARY,
        secondary = COLOR_SECONDARY,
        font_primary = FONT_PRIMARY,
        font_secondary = FONT_SECONDARY,
        font_footer = FONT_FOOTER,
        header_margin = HEADER_MARGIN,
        quote_margin = QUOTE_MARGIN,
        footer_padding = FOOTER_PADDING,
        icon_margin = ICON_MARGIN,
        icon_size = ICON_SIZE,
        icon_svg_size = ICON_SVG_SIZE,
        supporting_font = FONT_SIZE_SUPPORTING_VALUE,
        author_font = FONT_SIZE_AUTHOR,
        footer_font = FONT_SIZE_FOOTER,
        core_value = escape_html(content.core_value),
        supporting_value = escape_html(content.supporting_value),
        quote = escape_html(content.quote),
        handle = BRAND_HANDLE,
    )
}

fn text_css(style: &TextStyle) -> String {
    let mut css = format!(
        "font-size: {}; font-weight: {}; color: {};",
        style.font_size, style.font_weight, style.color
    );
    if let Some(line_height) = style.line_height {
        let _ = write!(css, " line-height: {};", line_height);
    }
    if let Some(opacity) = style.opacity {
        let _ = write!(css, " opacity: {};", opacity);
    }
    if let Some(max_width) = style.max_width {
        let _ = write!(css, " max-width: {};", max_width);
    }
    css
}

/// Dark "Today's Anchor" card driven by a preset
pub fn preset_card_html(content: &CardContent<'_>, preset: &StylePreset) -> String {
    let s = &preset.styles;
    let author = content.author.filter(|a| !a.is_empty()).unwrap_or("Unknown");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <style>
    * {{ box-sizing: border-box; }}
    body {{
      margin: 0;
      width: {width}px;
      height: {height}px;
      background: #000000;
      display: flex;
      align-items: center;
      justify-content: center;
      font-family: sans-serif;
    }}
    .frame {{
      width: {frame_width}px;
      height: {frame_height}px;
      background: {border_gradient};
      border-radius: {border_radius};
      padding: {border_padding};
    }}
    .card {{
      width: 100%;
      height: 100%;
      background: {background};
      border-radius: 20px;
      display: flex;
      flex-direction: column;
      align-items: center;
      justify-content: space-between;
      padding: 60px 40px;
      text-align: center;
    }}
    .header {{ display: flex; flex-direction: column; align-items: center; margin-top: 40px; }}
    .title {{ {title_css} margin-bottom: 25px; }}
    .divider {{ width: {divider_width}; height: {divider_height}; background: {divider_background}; }}
    .header .divider {{ margin-bottom: 25px; }}
    .core-value {{ {core_css} margin-bottom: 20px; line-height: 1.2; }}
    .supporting-value {{ {supporting_css} line-height: 1.2; }}
    .body {{ display: flex; flex-direction: column; align-items: center; }}
    .quote {{ {quote_css} margin-bottom: 20px; }}
    .author {{ {author_css} font-style: italic; }}
    .footer {{ display: flex; flex-direction: column; align-items: center; width: 100%; }}
    .footer .divider {{ margin-bottom: 20px; }}
    .handle {{ {handle_css} }}
  </style>
</head>
<body>
  <div class="frame">
    <div class="card">
      <div class="header">
        <div class="title">Today&#x27;s Anchor</div>
        <div class="divider"></div>
        <div class="core-value">{core_prefix}{core_value}</div>
        <div class="supporting-value">{supporting_prefix}{supporting_value}</div>
      </div>
      <div class="body">
        <div class="quote">&quot;{quote}&quot;</div>
        <div class="author">{author_prefix}{author}</div>
      </div>
      <div class="footer">
        <div class="divider"></div>
        <div class="handle">{handle}</div>
      </div>
    </div>
  </div>
</body>
</html>"#,
        width = preset.dimensions.width,
        height = preset.dimensions.height,
        frame_width = preset.dimensions.width - 4,
        frame_height = preset.dimensions.height - 4,
        border_gradient = s.border.gradient,
        border_radius = s.border.radius,
        border_padding = s.border.padding,
        background = s.background,
        title_css = text_css(&s.title),
        divider_width = s.divider.width,
        divider_height = s.divider.height,
        divider_background = s.divider.background,
        core_css = text_css(&s.core_value),
        supporting_css = text_css(&s.supporting_value),
        quote_css = text_css(&s.quote),
        author_css = text_css(&s.author),
        handle_css = text_css(&s.handle),
        core_prefix = escape_html(s.core_value.prefix),
        core_value = escape_html(content.core_value),
        supporting_prefix = escape_html(s.supporting_value.prefix),
        supporting_value = escape_html(content.supporting_value),
        quote = escape_html(content.quote),
        author_prefix = escape_html(s.author.prefix),
        author = escape_html(author),
        handle = escape_html(s.handle_text),
    )
}

// ========== Free-text card ==========

const TURQUOISE: &str = "#40E0D0";

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*|\*[^*]+\*").expect("valid regex"));

/// One run of text card markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan<'a> {
    Plain(&'a str),
    /// `**text**`
    Highlight(&'a str),
    /// `*text*`
    Italic(&'a str),
}

/// Split `**highlight**` and `*italic*` markup; unmatched asterisks stay plain
pub fn parse_markup(text: &str) -> Vec<TextSpan<'_>> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in MARKUP.find_iter(text) {
        if m.start() > last {
            spans.push(TextSpan::Plain(&text[last..m.start()]));
        }
        let markup = m.as_str();
        if markup.starts_with("**") {
            spans.push(TextSpan::Highlight(&markup[2..markup.len() - 2]));
        } else {
            spans.push(TextSpan::Italic(&markup[1..markup.len() - 1]));
        }
        last = m.end();
    }
    if last < text.len() {
        spans.push(TextSpan::Plain(&text[last..]));
    }
    spans
}

pub fn text_font_size(text: &str) -> &'static str {
    match text.chars().count() {
        0..=10 => "120px",
        11..=20 => "100px",
        21..=40 => "80px",
        41..=80 => "60px",
        _ => "48px",
    }
}

/// Black card with large serif text and inline markup
pub fn text_card_html(text: &str) -> String {
    let mut body = String::new();
    for span in parse_markup(text) {
        let (content, color, font_style) = match span {
            TextSpan::Plain(t) => (t, COLOR_WHITE, "normal"),
            TextSpan::Highlight(t) => (t, TURQUOISE, "normal"),
            TextSpan::Italic(t) => (t, COLOR_WHITE, "italic"),
        };
        let _ = write!(
            body,
            r#"<span style="color: {}; font-style: {};">{}</span>"#,
            color,
            font_style,
            escape_html(content)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <style>
    body {{
      margin: 0;
      width: {width}px;
      height: {height}px;
      background: #000000;
      display: flex;
      align-items: center;
      justify-content: center;
      padding: 60px;
      box-sizing: border-box;
    }}
    .text {{
      font-size: {font_size};
      font-weight: 400;
      color: #ffffff;
      text-align: left;
      font-family: 'Times New Roman', serif;
      line-height: 1.3;
      word-wrap: break-word;
      white-space: pre-wrap;
      max-width: 800px;
    }}
  </style>
</head>
<body>
  <div class="text">{body}</div>
</body>
</html>"#,
        width = IMAGE_WIDTH,
        height = IMAGE_HEIGHT,
        font_size = text_font_size(text),
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content<'a>(quote: &'a str, author: Option<&'a str>) -> CardContent<'a> {
        CardContent {
            core_value: "Growth",
            supporting_value: "Curiosity",
            quote,
            author,
        }
    }

    #[test]
    fn test_classic_card_escapes_values() {
        let html = quote_card_html(&content("<script>alert('x')</script> is bad.", None), "style1");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
        assert!(html.contains("Core Value: Growth"));
        assert!(html.contains("@miraclemind.live"));
        assert!(!html.contains(r#"class="author""#));
    }

    #[test]
    fn test_classic_card_font_sizing() {
        let short = quote_card_html(&content("Be here now, fully.", Some("Ram Dass")), "style1");
        assert!(short.contains("font-size: 84px"));
        assert!(short.contains("&#x2014; Ram Dass"));

        let long = quote_card_html(&content(&"word ".repeat(25), None), "style1");
        assert!(long.contains("font-size: 68px"));
    }

    #[test]
    fn test_preset_card() {
        let html = quote_card_html(&content("Every moment is a fresh beginning.", None), "daily-anchor-2");
        assert!(html.contains("Today&#x27;s Anchor"));
        assert!(html.contains("background: #D4AF37"));
        assert!(html.contains("Unknown"));
        assert!(html.contains("width: 1076px"));
    }

    #[test]
    fn test_unknown_style_falls_back_to_classic() {
        let html = quote_card_html(&content("Every moment is a fresh beginning.", None), "nope");
        assert!(html.contains("class=\"dove-icon\""));
    }

    #[test]
    fn test_parse_markup() {
        assert_eq!(
            parse_markup("Choose **love** over *fear* today"),
            vec![
                TextSpan::Plain("Choose "),
                TextSpan::Highlight("love"),
                TextSpan::Plain(" over "),
                TextSpan::Italic("fear"),
                TextSpan::Plain(" today"),
            ]
        );
        assert_eq!(parse_markup("2 * 3"), vec![TextSpan::Plain("2 * 3")]);
    }

    #[test]
    fn test_text_font_steps() {
        assert_eq!(text_font_size("x".repeat(10).as_str()), "120px");
        assert_eq!(text_font_size("x".repeat(11).as_str()), "100px");
        assert_eq!(text_font_size("x".repeat(40).as_str()), "80px");
        assert_eq!(text_font_size("x".repeat(80).as_str()), "60px");
        assert_eq!(text_font_size("x".repeat(81).as_str()), "48px");
    }

    #[test]
    fn test_text_card_markup_and_escaping() {
        let html = text_card_html("Be **bold** & <kind>");
        assert!(html.contains(r#"<span style="color: #40E0D0; font-style: normal;">bold</span>"#));
        assert!(html.contains("&amp; &lt;kind&gt;"));
        assert!(html.contains("font-size: 100px"));
    }
}
