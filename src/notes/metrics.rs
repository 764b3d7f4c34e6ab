/// Rendered extent of a block of text, in the same units as window geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Text measurement supplied by the windowing toolkit.
///
/// Implementations must be monotone: for the same text and family a larger point size
/// never yields a smaller width or height. The fit solver's binary search relies on it.
pub trait TextMetrics {
    fn measure(&self, family: &str, size: i32, text: &str) -> TextExtent;
}

/// Headless approximation of a proportional font.
///
/// Every glyph advances by `advance_ratio * size`, every line is `line_height_ratio * size`
/// tall. With `wrap_width` set, lines longer than that width wrap and the reported width
/// is the wrap width itself.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EstimatedMetrics {
    pub advance_ratio: f32,
    pub line_height_ratio: f32,
    pub wrap_width: Option<f32>,
}

impl Default for EstimatedMetrics {
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            line_height_ratio: 1.2,
            wrap_width: None,
        }
    }
}

impl EstimatedMetrics {
    #[must_use]
    pub fn wrapping(wrap_width: f32) -> Self {
        Self {
            wrap_width: Some(wrap_width),
            ..Self::default()
        }
    }
}

#[allow(clippy::cast_precision_loss)]
impl TextMetrics for EstimatedMetrics {
    fn measure(&self, _family: &str, size: i32, text: &str) -> TextExtent {
        let advance = self.advance_ratio * size as f32;
        let line_height = self.line_height_ratio * size as f32;
        let mut width: f32 = 0.0;
        let mut rows: f32 = 0.0;
        for line in text.split('\n') {
            let line_width = line.chars().count() as f32 * advance;
            match self.wrap_width {
                Some(wrap) if wrap > 0.0 && line_width > wrap => {
                    width = width.max(wrap);
                    rows += (line_width / wrap).ceil();
                }
                _ => {
                    width = width.max(line_width);
                    rows += 1.0;
                }
            }
        }
        TextExtent {
            width,
            height: rows * line_height,
        }
    }
}

#[test]
fn measures_longest_line_and_line_count() {
    let metrics = EstimatedMetrics::default();
    let extent = metrics.measure("Arial", 10, "abc\nabcdef");
    assert!((extent.width - 36.0).abs() < 1e-3);
    assert!((extent.height - 24.0).abs() < 1e-3);
}

#[test]
fn wraps_long_lines() {
    let metrics = EstimatedMetrics::wrapping(100.0);
    // 50 chars * 6px = 300px => 3 rows of 12px
    let extent = metrics.measure("Arial", 10, &"x".repeat(50));
    assert!((extent.width - 100.0).abs() < 1e-3);
    assert!((extent.height - 36.0).abs() < 1e-3);
}

#[test]
fn extents_are_monotone_in_font_size() {
    let text = "The quick brown fox\njumps over the lazy dog, again and again and again.";
    for metrics in [EstimatedMetrics::default(), EstimatedMetrics::wrapping(180.0)] {
        let mut previous = metrics.measure("Arial", 8, text);
        for size in 9..=72 {
            let current = metrics.measure("Arial", size, text);
            assert!(current.width >= previous.width, "width shrank at {size}");
            assert!(current.height >= previous.height, "height shrank at {size}");
            previous = current;
        }
    }
}
