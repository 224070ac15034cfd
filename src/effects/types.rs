use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the real-time video effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    #[default]
    Normal,
    Grayscale,
    CannyEdge,
    BlackAndWhite,
    Blur,
    Invert,
}

impl EffectKind {
    /// Every effect, in selector order.
    pub const ALL: [EffectKind; 6] = [
        Self::Normal,
        Self::Grayscale,
        Self::CannyEdge,
        Self::BlackAndWhite,
        Self::Blur,
        Self::Invert,
    ];

    /// Human-readable label shown in the filter selector.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Grayscale => "Grayscale",
            Self::CannyEdge => "Canny Edge",
            Self::BlackAndWhite => "Black & White",
            Self::Blur => "Blur",
            Self::Invert => "Invert",
        }
    }

    /// Snake-case string identifier used in settings and file names.
    pub fn as_id_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Grayscale => "grayscale",
            Self::CannyEdge => "canny_edge",
            Self::BlackAndWhite => "black_and_white",
            Self::Blur => "blur",
            Self::Invert => "invert",
        }
    }

    /// Stable numeric tag used for the atomic effect slot.
    pub fn tag(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Grayscale => 1,
            Self::CannyEdge => 2,
            Self::BlackAndWhite => 3,
            Self::Blur => 4,
            Self::Invert => 5,
        }
    }

    /// Decode a numeric tag. Returns `None` for values outside the enumeration.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Normal),
            1 => Some(Self::Grayscale),
            2 => Some(Self::CannyEdge),
            3 => Some(Self::BlackAndWhite),
            4 => Some(Self::Blur),
            5 => Some(Self::Invert),
            _ => None,
        }
    }

    /// Parse a selector label (e.g. "Black & White").
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.display_name() == label)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_normal() {
        assert_eq!(EffectKind::default(), EffectKind::Normal);
    }

    #[test]
    fn all_lists_six_effects_in_selector_order() {
        let labels: Vec<&str> = EffectKind::ALL.iter().map(|e| e.display_name()).collect();
        assert_eq!(
            labels,
            [
                "Normal",
                "Grayscale",
                "Canny Edge",
                "Black & White",
                "Blur",
                "Invert"
            ]
        );
    }

    #[test]
    fn tags_round_trip_for_every_effect() {
        for effect in EffectKind::ALL {
            assert_eq!(EffectKind::from_tag(effect.tag()), Some(effect));
        }
    }

    #[test]
    fn from_tag_rejects_out_of_range_values() {
        assert_eq!(EffectKind::from_tag(6), None);
        assert_eq!(EffectKind::from_tag(u8::MAX), None);
    }

    #[test]
    fn id_strings_match_serialised_form() {
        for effect in EffectKind::ALL {
            let json = serde_json::to_value(effect).unwrap();
            assert_eq!(json, effect.as_id_str());
        }
    }

    #[test]
    fn labels_parse_back() {
        assert_eq!(
            EffectKind::from_label("Black & White"),
            Some(EffectKind::BlackAndWhite)
        );
        assert_eq!(EffectKind::from_label("Canny Edge"), Some(EffectKind::CannyEdge));
        assert_eq!(EffectKind::from_label("canny edge"), None);
    }

    #[test]
    fn serialises_as_snake_case_id() {
        let json = serde_json::to_value(EffectKind::BlackAndWhite).unwrap();
        assert_eq!(json, "black_and_white");

        let parsed: EffectKind = serde_json::from_str("\"canny_edge\"").unwrap();
        assert_eq!(parsed, EffectKind::CannyEdge);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(EffectKind::Invert.to_string(), "Invert");
    }
}
