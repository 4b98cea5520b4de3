//! Cosmetic options applied to an image once it is on the display.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Returns every accepted value.
            #[must_use]
            pub const fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            /// Returns the device token.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let lower = s.trim().to_ascii_lowercase();
                Self::all()
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == lower)
                    .ok_or_else(|| {
                        let accepted: Vec<&str> = Self::all().iter().map(Self::as_str).collect();
                        Error::InvalidInput(format!(
                            "unknown {} '{s}' (expected one of: {})",
                            $label,
                            accepted.join(", ")
                        ))
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    /// Photo filter applied by the display.
    PhotoFilter, "photo filter" {
        /// No filter.
        None => "none",
        /// Aqua.
        Aqua => "aqua",
        /// Art deco.
        ArtDeco => "artdeco",
        /// Ink.
        Ink => "ink",
        /// Wash.
        Wash => "wash",
        /// Pastel.
        Pastel => "pastel",
        /// Fauvism.
        Feuve => "feuve",
    }
}

token_enum! {
    /// Matte (passe-partout) style.
    MatteStyle, "matte style" {
        /// No matte.
        None => "none",
        /// Thin modern frame.
        ModernThin => "modernthin",
        /// Modern frame.
        Modern => "modern",
        /// Wide modern frame.
        ModernWide => "modernwide",
        /// Flexible.
        Flexible => "flexible",
        /// Shadow box.
        ShadowBox => "shadowbox",
        /// Panoramic.
        Panoramic => "panoramic",
        /// Triptych.
        Triptych => "triptych",
        /// Mix.
        Mix => "mix",
        /// Squares.
        Squares => "squares",
    }
}

token_enum! {
    /// Matte color.
    MatteColor, "matte color" {
        /// Black.
        Black => "black",
        /// Neutral.
        Neutral => "neutral",
        /// Antique.
        Antique => "antique",
        /// Warm.
        Warm => "warm",
        /// Polar.
        Polar => "polar",
        /// Sand.
        Sand => "sand",
        /// Seafoam.
        Seafoam => "seafoam",
        /// Sage.
        Sage => "sage",
        /// Burgundy (device spelling).
        Burgandy => "burgandy",
        /// Navy.
        Navy => "navy",
        /// Apricot.
        Apricot => "apricot",
        /// Byzantine.
        Byzantine => "byzantine",
        /// Lavender.
        Lavender => "lavender",
        /// Red-orange.
        RedOrange => "redorange",
        /// Sky blue.
        SkyBlue => "skyblue",
        /// Turquoise (device spelling).
        Turqoise => "turqoise",
    }
}

/// A matte as the display expects it: `none` or `<style>_<color>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatteOption {
    /// No matte.
    #[default]
    None,
    /// A styled, colored matte.
    Styled {
        /// Matte style.
        style: MatteStyle,
        /// Matte color.
        color: MatteColor,
    },
}

impl MatteOption {
    /// Builds a matte from an optional style and color.
    ///
    /// A missing or `none` style yields no matte; a style without a color
    /// defaults to neutral.
    #[must_use]
    pub const fn from_parts(style: Option<MatteStyle>, color: Option<MatteColor>) -> Self {
        match style {
            None | Some(MatteStyle::None) => Self::None,
            Some(style) => Self::Styled {
                style,
                color: match color {
                    Some(color) => color,
                    None => MatteColor::Neutral,
                },
            },
        }
    }

    /// Returns the device token.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Styled { style, color } => format!("{style}_{color}"),
        }
    }
}

impl fmt::Display for MatteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
