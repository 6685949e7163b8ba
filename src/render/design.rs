//! Brand design constants for quote cards

/// Output image size (Instagram portrait)
pub const IMAGE_WIDTH: u32 = 1080;
pub const IMAGE_HEIGHT: u32 = 1350;
pub const CONTAINER_WIDTH: u32 = 1020;
pub const CONTAINER_HEIGHT: u32 = 1290;
pub const PADDING: u32 = 60;

// Colors
pub const COLOR_PRIMARY: &str = "#f7c359";
pub const COLOR_SECONDARY: &str = "#C5282F";
pub const COLOR_BLACK: &str = "#000000";
pub const COLOR_GRAY: &str = "#545454";
pub const COLOR_WHITE: &str = "#ffffff";
pub const COLOR_BORDER: &str = "#f7c359";

// Typography
pub const FONT_PRIMARY: &str = "'Playfair Display', serif";
pub const FONT_SECONDARY: &str = "'Cormorant Garamond', serif";
pub const FONT_FOOTER: &str = "'Noticia Text', serif";

pub const FONT_SIZE_CORE_VALUE: &str = "44px";
pub const FONT_SIZE_CORE_VALUE_LONG: &str = "40px";
pub const FONT_SIZE_SUPPORTING_VALUE: &str = "28px";
pub const FONT_SIZE_QUOTE_SHORT: &str = "84px";
pub const FONT_SIZE_QUOTE_MEDIUM: &str = "76px";
pub const FONT_SIZE_QUOTE_LONG: &str = "68px";
pub const FONT_SIZE_AUTHOR: &str = "32px";
pub const FONT_SIZE_FOOTER: &str = "28px";

// Spacing
pub const HEADER_MARGIN: &str = "20px";
pub const QUOTE_MARGIN: &str = "30px";
pub const FOOTER_PADDING: &str = "30px";
pub const ICON_MARGIN: &str = "15px";

// Brand
pub const BRAND_HANDLE: &str = "@miraclemind.live";
pub const ICON_SIZE: &str = "32px";
pub const ICON_SVG_SIZE: &str = "22px";

pub const FONT_IMPORTS: &[&str] = &[
    "https://fonts.googleapis.com/css2?family=Playfair+Display:wght@400;600;700&display=swap",
    "https://fonts.googleapis.com/css2?family=Cormorant+Garamond:wght@300;400;500;600&display=swap",
    "https://fonts.googleapis.com/css2?family=Noticia+Text:wght@400;700&display=swap",
];

/// Inclusive length bounds, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub min: usize,
    pub max: usize,
}

pub const LIMIT_CORE_VALUE: Limit = Limit { min: 1, max: 50 };
pub const LIMIT_SUPPORTING_VALUE: Limit = Limit { min: 1, max: 60 };
pub const LIMIT_QUOTE: Limit = Limit { min: 10, max: 200 };
pub const LIMIT_AUTHOR: Limit = Limit { min: 0, max: 30 };

pub fn core_value_font_size(core_value: &str) -> &'static str {
    if core_value.chars().count() > 20 {
        FONT_SIZE_CORE_VALUE_LONG
    } else {
        FONT_SIZE_CORE_VALUE
    }
}

pub fn quote_font_size(quote: &str) -> &'static str {
    match quote.chars().count() {
        n if n > 100 => FONT_SIZE_QUOTE_LONG,
        n if n > 60 => FONT_SIZE_QUOTE_MEDIUM,
        _ => FONT_SIZE_QUOTE_SHORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_steps() {
        assert_eq!(core_value_font_size("Growth"), "44px");
        assert_eq!(core_value_font_size(&"x".repeat(20)), "44px");
        assert_eq!(core_value_font_size(&"x".repeat(21)), "40px");

        assert_eq!(quote_font_size(&"q".repeat(60)), "84px");
        assert_eq!(quote_font_size(&"q".repeat(61)), "76px");
        assert_eq!(quote_font_size(&"q".repeat(100)), "76px");
        assert_eq!(quote_font_size(&"q".repeat(101)), "68px");
    }
}
