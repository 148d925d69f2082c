use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A layer number as it appears in the stream dump.
pub type LayerId = u32;

/// RGB color for a layer, written as six hex digits (`"9900e6"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LayerColor {
    pub const BLACK: LayerColor = LayerColor { r: 0, g: 0, b: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `rrggbb`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Result<Self, InvalidColor> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidColor(hex.to_string()));
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self { r, g, b }),
            _ => Err(InvalidColor(hex.to_string())),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for LayerColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for LayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color '{0}', expected six hex digits")]
pub struct InvalidColor(pub String);

impl TryFrom<String> for LayerColor {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<LayerColor> for String {
    fn from(color: LayerColor) -> Self {
        color.to_hex()
    }
}

/// Visual style of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fill: LayerColor,
    /// Fill opacity in `[0, 1]`.
    #[serde(deserialize_with = "deserialize_opacity")]
    pub fill_opacity: f32,
    pub stroke: LayerColor,
}

impl LayerStyle {
    pub fn new(fill: LayerColor, fill_opacity: f32, stroke: LayerColor) -> Self {
        Self {
            name: None,
            fill,
            fill_opacity: normalize_opacity(fill_opacity),
            stroke,
        }
    }

    /// Style used for layers missing from the table.
    pub fn fallback() -> Self {
        Self::new(LayerColor::BLACK, 0.8, LayerColor::BLACK)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Opacity may be given either as a fraction or on a 1-255 byte scale.
fn normalize_opacity(value: f32) -> f32 {
    if value > 1.0 {
        (value / 255.0).min(1.0)
    } else {
        value.max(0.0)
    }
}

fn deserialize_opacity<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f32::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 || raw > 255.0 {
        return Err(serde::de::Error::custom(format!(
            "opacity {} is outside 0.0-1.0 and 1-255",
            raw
        )));
    }
    Ok(normalize_opacity(raw))
}

/// Editable mapping from layer number to style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleTable {
    layers: BTreeMap<LayerId, LayerStyle>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer colors for the 65nm technology the converter was first used with.
    pub fn technology_default() -> Self {
        let mut table = Self::new();
        let entries: [(LayerId, &str, u32, f32, u32); 25] = [
            (3, "NW", 0x9900e6, 0.1, 0x9900e6),
            (6, "OD", 0xe71f0d, 0.5, 0xe71f0d),
            (17, "PO", 0x01fe00, 0.3, 0x01fe00),
            (18, "PO2", 0x01fe00, 0.0, 0x01fe00),
            (25, "PP", 0x01fe00, 0.0, 0x01fe00),
            (26, "NP", 0x01fe00, 0.0, 0x01fe00),
            (30, "CO", 0xffffff, 1.0, 0xffffff),
            (31, "M1", 0x0000ff, 0.3, 0x0000ff),
            (32, "M2", 0xff0000, 0.3, 0xff0000),
            (33, "M3", 0x01cc66, 0.3, 0x01cc66),
            (34, "M4", 0xffbff2, 0.3, 0xffbff2),
            (35, "M5", 0x01fe00, 0.0, 0x01fe00),
            (36, "M6", 0x01fe00, 0.0, 0x01fe00),
            (37, "M7", 0x01fe00, 0.0, 0x01fe00),
            (38, "M8", 0x01fe00, 0.0, 0x01fe00),
            (57, "VIA7", 0x01fe00, 0.0, 0x01fe00),
            (75, "PDK", 0x01fe00, 0.0, 0x01fe00),
            (77, "CTM", 0x01fe00, 0.0, 0x01fe00),
            (88, "DMEXCL", 0x01fe00, 0.0, 0x01fe00),
            (131, "M1 Pin", 0x01fe00, 0.0, 0x01fe00),
            (132, "M2 Pin", 0x01fe00, 0.0, 0x01fe00),
            (133, "M3 Pin", 0x01fe00, 0.0, 0x01fe00),
            (148, "CTMDMY", 0x01fe00, 0.0, 0x01fe00),
            (149, "PO Pin", 0x01fe00, 0.0, 0x01fe00),
            (150, "CBM", 0xbf4026, 0.0, 0xbf4026),
        ];
        for (id, name, fill, opacity, stroke) in entries {
            table.set_layer(
                id,
                LayerStyle::new(packed(fill), opacity, packed(stroke)).with_name(name),
            );
        }
        table
    }

    pub fn set_layer(&mut self, id: LayerId, style: LayerStyle) {
        self.layers.insert(id, style);
    }

    pub fn get_layer(&self, id: LayerId) -> Option<&LayerStyle> {
        self.layers.get(&id)
    }

    /// Overlay `other` on top of this table; entries in `other` win.
    pub fn merge(&mut self, other: StyleTable) {
        self.layers.extend(other.layers);
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &LayerStyle)> {
        self.layers.iter().map(|(id, style)| (*id, style))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

fn packed(rgb: u32) -> LayerColor {
    LayerColor::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// Layers that were drawn without a table entry, with the number of records
/// drawn on each.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnknownLayers {
    records: BTreeMap<LayerId, usize>,
}

impl UnknownLayers {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.records.contains_key(&layer)
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.records.keys().copied()
    }

    pub fn records_on(&self, layer: LayerId) -> usize {
        self.records.get(&layer).copied().unwrap_or(0)
    }

    pub fn total_records(&self) -> usize {
        self.records.values().sum()
    }

    fn record(&mut self, layer: LayerId) -> bool {
        let count = self.records.entry(layer).or_insert(0);
        *count += 1;
        *count == 1
    }
}

/// Resolves layer numbers to styles and remembers which ones were missing.
#[derive(Debug, Clone, Default)]
pub struct StyleResolver {
    table: StyleTable,
    unknown: UnknownLayers,
}

impl StyleResolver {
    pub fn new(table: StyleTable) -> Self {
        Self {
            table,
            unknown: UnknownLayers::default(),
        }
    }

    /// Never fails: unknown layers get [`LayerStyle::fallback`].
    pub fn resolve(&mut self, layer: LayerId) -> LayerStyle {
        match self.table.get_layer(layer) {
            Some(style) => style.clone(),
            None => {
                if self.unknown.record(layer) {
                    log::debug!("Layer {} is not in the style table; using fallback", layer);
                }
                LayerStyle::fallback()
            }
        }
    }

    pub fn unknown_layers(&self) -> &UnknownLayers {
        &self.unknown
    }

    pub fn take_unknown_layers(&mut self) -> UnknownLayers {
        std::mem::take(&mut self.unknown)
    }
}
