use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a filter places its glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Nose,
    Ears,
    Eyes,
    Top,
    Sides,
    Face,
    Floating,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Anchor::Nose => "nose",
            Anchor::Ears => "ears",
            Anchor::Eyes => "eyes",
            Anchor::Top => "top",
            Anchor::Sides => "sides",
            Anchor::Face => "face",
            Anchor::Floating => "floating",
        };
        write!(f, "{}", name)
    }
}

/// Face-tracked emoji overlay
#[derive(Debug, Clone, PartialEq)]
pub struct ArFilterDefinition {
    pub id: &'static str,
    pub name: &'static str,
    /// Glyph shown in the picker and used for anchors without an override
    pub glyph: &'static str,
    pub anchors: &'static [Anchor],
    /// Per-anchor glyph overrides
    pub anchor_glyphs: &'static [(Anchor, &'static str)],
    /// RGB accent, also the swatch color when glyphs are not rasterized
    pub accent: [u8; 3],
}

impl ArFilterDefinition {
    pub fn has_anchor(&self, anchor: Anchor) -> bool {
        self.anchors.contains(&anchor)
    }

    pub fn is_floating(&self) -> bool {
        self.has_anchor(Anchor::Floating)
    }

    pub fn glyph_for(&self, anchor: Anchor) -> &'static str {
        self.anchor_glyphs
            .iter()
            .find(|(a, _)| *a == anchor)
            .map(|(_, glyph)| *glyph)
            .unwrap_or(self.glyph)
    }
}

pub static AR_FILTERS: [ArFilterDefinition; 8] = [
    ArFilterDefinition {
        id: "dog",
        name: "Puppy",
        glyph: "🐶",
        anchors: &[Anchor::Ears, Anchor::Nose],
        anchor_glyphs: &[(Anchor::Ears, "🦴"), (Anchor::Nose, "🐽")],
        accent: [194, 134, 84],
    },
    ArFilterDefinition {
        id: "cat",
        name: "Kitty",
        glyph: "🐱",
        anchors: &[Anchor::Ears, Anchor::Nose],
        anchor_glyphs: &[(Anchor::Ears, "🔺"), (Anchor::Nose, "🐾")],
        accent: [255, 170, 200],
    },
    ArFilterDefinition {
        id: "crown",
        name: "Royalty",
        glyph: "👑",
        anchors: &[Anchor::Top],
        anchor_glyphs: &[],
        accent: [255, 200, 40],
    },
    ArFilterDefinition {
        id: "hearts",
        name: "Love",
        glyph: "❤️",
        anchors: &[Anchor::Floating],
        anchor_glyphs: &[],
        accent: [235, 60, 90],
    },
    ArFilterDefinition {
        id: "sunglasses",
        name: "Cool",
        glyph: "😎",
        anchors: &[Anchor::Eyes],
        anchor_glyphs: &[(Anchor::Eyes, "🕶️")],
        accent: [30, 30, 40],
    },
    ArFilterDefinition {
        id: "alien",
        name: "Alien",
        glyph: "👽",
        anchors: &[Anchor::Face],
        anchor_glyphs: &[],
        accent: [120, 220, 110],
    },
    ArFilterDefinition {
        id: "party",
        name: "Party",
        glyph: "🎉",
        anchors: &[Anchor::Sides, Anchor::Top],
        anchor_glyphs: &[(Anchor::Top, "🥳")],
        accent: [150, 90, 230],
    },
    ArFilterDefinition {
        id: "stars",
        name: "Stars",
        glyph: "⭐",
        anchors: &[Anchor::Eyes, Anchor::Floating],
        anchor_glyphs: &[(Anchor::Floating, "✨")],
        accent: [255, 225, 90],
    },
];

pub fn ar_filters() -> &'static [ArFilterDefinition] {
    &AR_FILTERS
}

pub fn ar_filter(id: &str) -> Option<&'static ArFilterDefinition> {
    AR_FILTERS.iter().find(|filter| filter.id == id)
}
