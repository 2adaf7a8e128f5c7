use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Value;

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
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Assigns one colour per category so bar, pie and scatter charts agree.
#[derive(Debug, Clone, Default)]
pub struct CategoryColors {
    mapping: BTreeMap<Value, Color32>,
}

impl CategoryColors {
    /// Build the mapping from the categories in chart order.
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a Value>) -> Self {
        let values: Vec<&Value> = categories.into_iter().collect();
        let palette = generate_palette(values.len());
        let mapping = values
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();
        CategoryColors { mapping }
    }

    /// Look up the colour for a category; unknown values are grey.
    pub fn color_for(&self, value: &Value) -> Color32 {
        self.mapping.get(value).copied().unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_colours() {
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        for (i, a) in p.iter().enumerate() {
            for b in &p[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_category_is_grey() {
        let a = Value::String("A".into());
        let colors = CategoryColors::new([&a]);
        assert_ne!(colors.color_for(&a), Color32::GRAY);
        assert_eq!(colors.color_for(&Value::String("Z".into())), Color32::GRAY);
    }
}
