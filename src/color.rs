use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Value;

/// Mark colour when a view has no colour-by column.
pub const BASE_COLOR: Color32 = Color32::from_rgb(52, 152, 219);

/// Outline / fill used for selected marks.
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(231, 76, 60);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Fade a colour for marks outside a non-empty selection.
pub fn dimmed(color: Color32) -> Color32 {
    color.gamma_multiply(0.25)
}

// ---------------------------------------------------------------------------
// Color mapping: column value → Color32
// ---------------------------------------------------------------------------

/// Maps the unique values of a chosen column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from a column's unique values.
    pub fn new(unique_values: &BTreeSet<Value>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping: BTreeMap<Value, Color32> = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_size() {
        assert!(generate_palette(0).is_empty());
        let colors = generate_palette(5);
        assert_eq!(colors.len(), 5);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn test_color_map_lookup() {
        let values: BTreeSet<Value> = ["Europe", "Japan", "USA"]
            .into_iter()
            .map(Value::from)
            .collect();
        let map = ColorMap::new(&values);

        // Colours follow the sorted value order.
        let palette = generate_palette(3);
        assert_eq!(map.color_for(&Value::from("Europe")), palette[0]);
        assert_eq!(map.color_for(&Value::from("Japan")), palette[1]);
        assert_eq!(map.color_for(&Value::from("Mars")), Color32::GRAY);
    }
}
