//! Color-filter catalog and the per-pixel transforms behind it.
//!
//! Each function uses the Filter Effects matrices and clamps to `[0, 1]`
//! before the next function runs, matching how stacked CSS filters behave.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

type Matrix = [[f32; 3]; 3];

/// One step of a filter expression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", content = "amount", rename_all = "kebab-case")]
pub enum FilterFunction {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Grayscale(f32),
    Sepia(f32),
    /// Degrees
    HueRotate(f32),
}

impl FilterFunction {
    fn matrix(&self) -> Option<Matrix> {
        match *self {
            FilterFunction::Saturate(s) => Some([
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ]),
            FilterFunction::Grayscale(amount) => {
                let s = 1.0 - amount.clamp(0.0, 1.0);
                Some([
                    [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
                    [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
                    [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
                ])
            }
            FilterFunction::Sepia(amount) => {
                let s = 1.0 - amount.clamp(0.0, 1.0);
                Some([
                    [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
                    [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
                    [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
                ])
            }
            FilterFunction::HueRotate(degrees) => {
                let (sin, cos) = degrees.to_radians().sin_cos();
                Some([
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                    ],
                    [
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                    ],
                    [
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                    ],
                ])
            }
            FilterFunction::Brightness(_) | FilterFunction::Contrast(_) => None,
        }
    }

    /// Apply to linear-ish `[0, 1]` channels
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let out = match (*self, self.matrix()) {
            (FilterFunction::Brightness(b), _) => [rgb[0] * b, rgb[1] * b, rgb[2] * b],
            (FilterFunction::Contrast(c), _) => {
                let intercept = 0.5 - 0.5 * c;
                [
                    rgb[0] * c + intercept,
                    rgb[1] * c + intercept,
                    rgb[2] * c + intercept,
                ]
            }
            (_, Some(m)) => [
                m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
                m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
                m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
            ],
            (_, None) => rgb,
        };
        [
            out[0].clamp(0.0, 1.0),
            out[1].clamp(0.0, 1.0),
            out[2].clamp(0.0, 1.0),
        ]
    }
}

impl fmt::Display for FilterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterFunction::Brightness(v) => write!(f, "brightness({})", v),
            FilterFunction::Contrast(v) => write!(f, "contrast({})", v),
            FilterFunction::Saturate(v) => write!(f, "saturate({})", v),
            FilterFunction::Grayscale(v) => write!(f, "grayscale({})", v),
            FilterFunction::Sepia(v) => write!(f, "sepia({})", v),
            FilterFunction::HueRotate(v) => write!(f, "hue-rotate({}deg)", v),
        }
    }
}

/// A named color transform from the picker
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub glyph: &'static str,
    pub functions: &'static [FilterFunction],
}

impl FilterDefinition {
    pub fn is_identity(&self) -> bool {
        self.functions.is_empty()
    }

    /// CSS-style expression, `none` for the identity filter
    pub fn expression(&self) -> String {
        if self.is_identity() {
            return "none".to_string();
        }
        self.functions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn apply_to_pixel(&self, pixel: &Rgba<u8>) -> Rgba<u8> {
        if self.is_identity() {
            return *pixel;
        }
        let mut rgb = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ];
        for function in self.functions {
            rgb = function.apply(rgb);
        }
        Rgba([
            (rgb[0] * 255.0).round() as u8,
            (rgb[1] * 255.0).round() as u8,
            (rgb[2] * 255.0).round() as u8,
            pixel[3],
        ])
    }

    pub fn apply_in_place(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        for pixel in image.pixels_mut() {
            *pixel = self.apply_to_pixel(pixel);
        }
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut output = image.clone();
        self.apply_in_place(&mut output);
        output
    }
}

pub static COLOR_FILTERS: [FilterDefinition; 7] = [
    FilterDefinition {
        id: "normal",
        name: "Normal",
        glyph: "⚪",
        functions: &[],
    },
    FilterDefinition {
        id: "warm",
        name: "Warm",
        glyph: "🌅",
        functions: &[
            FilterFunction::Sepia(0.3),
            FilterFunction::Saturate(1.4),
            FilterFunction::Brightness(1.1),
        ],
    },
    FilterDefinition {
        id: "cool",
        name: "Cool",
        glyph: "❄️",
        functions: &[FilterFunction::HueRotate(18.0), FilterFunction::Saturate(1.2)],
    },
    FilterDefinition {
        id: "vintage",
        name: "Vintage",
        glyph: "📷",
        functions: &[
            FilterFunction::Sepia(0.6),
            FilterFunction::Contrast(1.1),
            FilterFunction::Brightness(0.95),
        ],
    },
    FilterDefinition {
        id: "bw",
        name: "B&W",
        glyph: "🖤",
        functions: &[FilterFunction::Grayscale(1.0)],
    },
    FilterDefinition {
        id: "dramatic",
        name: "Dramatic",
        glyph: "🎭",
        functions: &[FilterFunction::Contrast(1.5), FilterFunction::Saturate(1.3)],
    },
    FilterDefinition {
        id: "fade",
        name: "Fade",
        glyph: "🌫️",
        functions: &[FilterFunction::Brightness(1.15), FilterFunction::Saturate(0.6)],
    },
];

pub fn color_filters() -> &'static [FilterDefinition] {
    &COLOR_FILTERS
}

pub fn color_filter(id: &str) -> Option<&'static FilterDefinition> {
    COLOR_FILTERS.iter().find(|filter| filter.id == id)
}

/// The identity filter
pub fn normal_filter() -> &'static FilterDefinition {
    &COLOR_FILTERS[0]
}
