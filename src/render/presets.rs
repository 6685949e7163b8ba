//! Named card style presets
//!
//! The classic `style1` card is built from [`super::design`]; presets are the
//! dark "Today's Anchor" cards. Archived presets stay resolvable by id but are
//! not offered in listings.

use serde::Serialize;

use super::design::{BRAND_HANDLE, IMAGE_HEIGHT, IMAGE_WIDTH};

/// Id of the classic card layout
pub const CLASSIC_STYLE: &str = "style1";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub archived: bool,
    pub created_at: &'static str,
    pub dimensions: Dimensions,
    pub styles: PresetStyles,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetStyles {
    pub background: &'static str,
    pub border: Border,
    pub title: TextStyle,
    pub divider: Divider,
    pub core_value: TextStyle,
    pub supporting_value: TextStyle,
    pub quote: TextStyle,
    pub author: TextStyle,
    pub handle: TextStyle,
    pub handle_text: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Border {
    pub gradient: &'static str,
    pub radius: &'static str,
    pub padding: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Divider {
    pub width: &'static str,
    pub height: &'static str,
    pub background: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub font_size: &'static str,
    pub font_weight: &'static str,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub prefix: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<&'static str>,
}

const GOLD_DIVIDER: &str = "linear-gradient(90deg, transparent 0%, #D4AF37 50%, transparent 100%)";

const fn text(font_size: &'static str, font_weight: &'static str, color: &'static str) -> TextStyle {
    TextStyle {
        font_size,
        font_weight,
        color,
        line_height: None,
        opacity: None,
        prefix: "",
        max_width: None,
    }
}

/// The anchor layout; presets differ only in their border
const fn anchor_styles(border_gradient: &'static str) -> PresetStyles {
    PresetStyles {
        background: "linear-gradient(135deg, #0a0a0a 0%, #1a1a1a 50%, #0a0a0a 100%)",
        border: Border {
            gradient: border_gradient,
            radius: "24px",
            padding: "2px",
        },
        title: TextStyle {
            line_height: Some("1.2"),
            ..text("32px", "500", "#ffffff")
        },
        divider: Divider {
            width: "500px",
            height: "2px",
            background: GOLD_DIVIDER,
        },
        core_value: TextStyle {
            prefix: "Core Value: ",
            ..text("36px", "400", "#ffffff")
        },
        supporting_value: TextStyle {
            opacity: Some(0.8),
            prefix: "Supporting Value: ",
            ..text("25px", "300", "#ffffff")
        },
        quote: TextStyle {
            line_height: Some("1.3"),
            max_width: Some("850px"),
            ..text("68px", "300", "#ffffff")
        },
        author: TextStyle {
            opacity: Some(0.8),
            prefix: "\u{2014} ",
            ..text("20px", "300", "#cccccc")
        },
        handle: text("18px", "300", "#cccccc"),
        handle_text: BRAND_HANDLE,
    }
}

const PORTRAIT: Dimensions = Dimensions {
    width: IMAGE_WIDTH,
    height: IMAGE_HEIGHT,
};

pub static STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        id: "daily-anchor-1",
        name: "Daily Anchor 1",
        description: "Original \"Today's Anchor\" design with gradient border and golden dividers",
        archived: true,
        created_at: "2025-08-26",
        dimensions: PORTRAIT,
        styles: anchor_styles(
            "linear-gradient(45deg, #40E0D0 0%, #C41E3A 25%, #D4AF37 50%, #C41E3A 75%, #40E0D0 100%)",
        ),
    },
    StylePreset {
        id: "daily-anchor-2",
        name: "Daily Anchor 2",
        description: "Gold border variation of Daily Anchor design",
        archived: false,
        created_at: "2025-08-26",
        dimensions: PORTRAIT,
        styles: anchor_styles("#D4AF37"),
    },
];

pub fn get_preset(id: &str) -> Option<&'static StylePreset> {
    STYLE_PRESETS.iter().find(|preset| preset.id == id)
}

pub fn active_presets() -> impl Iterator<Item = &'static StylePreset> {
    STYLE_PRESETS.iter().filter(|preset| !preset.archived)
}

pub fn archived_presets() -> impl Iterator<Item = &'static StylePreset> {
    STYLE_PRESETS.iter().filter(|preset| preset.archived)
}

/// Styles accepted by image generation: the classic card or an active preset
pub fn is_known_style(id: &str) -> bool {
    id == CLASSIC_STYLE || active_presets().any(|preset| preset.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_listings() {
        assert_eq!(get_preset("daily-anchor-1").unwrap().name, "Daily Anchor 1");
        assert!(get_preset("daily-anchor-9").is_none());

        let active: Vec<_> = active_presets().map(|p| p.id).collect();
        assert_eq!(active, vec!["daily-anchor-2"]);
        let archived: Vec<_> = archived_presets().map(|p| p.id).collect();
        assert_eq!(archived, vec!["daily-anchor-1"]);
    }

    #[test]
    fn test_known_styles() {
        assert!(is_known_style("style1"));
        assert!(is_known_style("daily-anchor-2"));
        assert!(!is_known_style("daily-anchor-1"));
        assert!(!is_known_style("style2"));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(get_preset("daily-anchor-2").unwrap()).unwrap();
        assert_eq!(json["createdAt"], "2025-08-26");
        assert_eq!(json["dimensions"]["width"], 1080);
        assert_eq!(json["styles"]["border"]["gradient"], "#D4AF37");
        assert_eq!(json["styles"]["coreValue"]["prefix"], "Core Value: ");
        assert!(json["styles"]["title"].get("prefix").is_none());
    }
}
