use rand::Rng;

use crate::canvas::ImageGrid;

// ============================================================================
// MASK LAYER PALETTE
// ============================================================================

/// Fixed palette for mask layers, in pick order: red, green, blue, cyan,
/// magenta, yellow, azure, pink, chartreuse.
pub const MASK_PALETTE: [[u8; 3]; 9] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [0, 255, 255],
    [255, 0, 255],
    [255, 255, 0],
    [0, 128, 255],
    [255, 0, 128],
    [128, 255, 0],
];

/// Color for the layer at `index`. Indices past the palette get a random
/// color so late layers stay distinguishable.
pub fn layer_color(index: usize) -> [u8; 3] {
    match MASK_PALETTE.get(index) {
        Some(color) => *color,
        None => {
            let mut rng = rand::thread_rng();
            [
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
            ]
        }
    }
}

/// Default grayscale windowing for an image: center at midrange, width 90%
/// of the value range.
pub fn default_window(image: &ImageGrid) -> (f32, f32) {
    let (lo, hi) = image.value_range();
    ((lo + hi) / 2.0, 0.9 * (hi - lo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup() {
        assert_eq!(layer_color(0), [255, 0, 0]);
        assert_eq!(layer_color(1), [0, 255, 0]);
        assert_eq!(layer_color(8), [128, 255, 0]);
    }

    #[test]
    fn test_exhausted_palette_still_yields_a_color() {
        // just exercise the random fallback; any triple is acceptable
        let _ = layer_color(9);
        let _ = layer_color(100);
    }

    #[test]
    fn test_default_window() {
        let image = ImageGrid::new(2, 2, vec![10.0, 20.0, 30.0, 110.0], (1.0, 1.0)).unwrap();
        let (center, width) = default_window(&image);
        assert_eq!(center, 60.0);
        assert_eq!(width, 90.0);
    }
}
