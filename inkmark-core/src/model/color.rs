use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two highlight colors a reader can pick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
}

impl HighlightColor {
    pub fn all() -> &'static [HighlightColor] {
        &[HighlightColor::Yellow, HighlightColor::Green]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
        }
    }

    /// Single-key shortcut used by prompt surfaces
    pub fn shortcut(&self) -> char {
        match self {
            HighlightColor::Yellow => 'y',
            HighlightColor::Green => 'g',
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised color name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown highlight color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for HighlightColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" | "y" => Ok(HighlightColor::Yellow),
            "green" | "g" => Ok(HighlightColor::Green),
            other => Err(UnknownColor(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("yellow", HighlightColor::Yellow)]
    #[case("Green", HighlightColor::Green)]
    #[case(" y ", HighlightColor::Yellow)]
    fn test_parse_color(#[case] input: &str, #[case] expected: HighlightColor) {
        assert_eq!(input.parse::<HighlightColor>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_color() {
        assert!("blue".parse::<HighlightColor>().is_err());
    }

    #[test]
    fn test_serialized_lowercase() {
        assert_eq!(serde_json::to_string(&HighlightColor::Green).unwrap(), "\"green\"");
    }
}
