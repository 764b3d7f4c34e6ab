use super::{DEF_BACKGROUND_COLOR, DEF_FONT_FAMILY, DEF_FONT_SIZE, DEF_TEXT_COLOR};
use palette::Srgb;
use serde::{Deserialize, Deserializer, Serializer, de::Error};
use std::str::FromStr;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub family: String,
    pub size: i32,
}

impl FontSpec {
    #[must_use]
    pub fn new(family: &str, size: i32) -> Self {
        Self {
            family: family.to_string(),
            size,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new(DEF_FONT_FAMILY, DEF_FONT_SIZE)
    }
}

/// Parses `#RRGGBB` (or `#RGB`), the leading `#` being optional
pub fn parse_color(s: &str) -> Result<Srgb<u8>, palette::rgb::FromHexError> {
    Srgb::from_str(s.trim())
}

#[must_use]
pub fn format_color(color: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

pub(crate) fn deserialize_color<'de, D>(deserializer: D) -> Result<Srgb<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_color(&s).map_err(D::Error::custom)
}

pub(crate) fn serialize_color<S>(value: &Srgb<u8>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_color(*value))
}

/// Style applied to newly created notes and broadcast by the control panel.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NoteStyle {
    pub font: FontSpec,
    #[serde(
        deserialize_with = "deserialize_color",
        serialize_with = "serialize_color"
    )]
    pub background: Srgb<u8>,
    #[serde(
        deserialize_with = "deserialize_color",
        serialize_with = "serialize_color"
    )]
    pub text_color: Srgb<u8>,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            font: FontSpec::default(),
            background: DEF_BACKGROUND_COLOR,
            text_color: DEF_TEXT_COLOR,
        }
    }
}

#[test]
fn colors_round_trip_through_hex() {
    let color = parse_color("#FFFF99").expect("valid color");
    assert_eq!(color, Srgb::new(0xff, 0xff, 0x99));
    assert_eq!(format_color(color), "#FFFF99");
    assert!(parse_color("not a color").is_err());
}

#[test]
fn style_reads_partial_json() {
    let style: NoteStyle =
        serde_json::from_str(r##"{"background": "#87CEEB"}"##).expect("valid style json");
    assert_eq!(style.background, Srgb::new(0x87, 0xce, 0xeb));
    assert_eq!(style.font, FontSpec::default());
    assert_eq!(style.text_color, DEF_TEXT_COLOR);
}
