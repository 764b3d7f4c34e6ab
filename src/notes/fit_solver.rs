use super::{
    geometry::Size,
    metrics::{TextExtent, TextMetrics},
};

/// Margins, paddings and bounds used when reconciling text with its window.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FitLimits {
    pub text_margin: i32,
    pub horizontal_padding: i32,
    pub vertical_padding: i32,
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
    pub min_font_size: i32,
    pub max_font_size: i32,
}

impl Default for FitLimits {
    fn default() -> Self {
        Self {
            text_margin: 20,
            horizontal_padding: 30,
            vertical_padding: 40,
            min_width: 200,
            max_width: 800,
            min_height: 150,
            max_height: 600,
            min_font_size: 8,
            max_font_size: 72,
        }
    }
}

impl FitLimits {
    /// Space taken around the text on each axis: both margins plus the axis padding
    #[must_use]
    pub const fn text_frame(&self) -> Size {
        Size::new(
            2 * self.text_margin + self.horizontal_padding,
            2 * self.text_margin + self.vertical_padding,
        )
    }

    /// Every `min_*` is positive and not above its `max_*`, margins and paddings are not
    /// negative
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.text_margin >= 0
            && self.horizontal_padding >= 0
            && self.vertical_padding >= 0
            && 0 < self.min_width
            && self.min_width <= self.max_width
            && 0 < self.min_height
            && self.min_height <= self.max_height
            && 0 < self.min_font_size
            && self.min_font_size <= self.max_font_size
    }

    #[must_use]
    pub fn effective_available(&self, content_area: Size) -> Size {
        content_area - self.text_frame()
    }

    #[must_use]
    pub fn clamp_size(&self, size: Size) -> Size {
        Size::new(
            size.width.clamp(self.min_width, self.max_width),
            size.height.clamp(self.min_height, self.max_height),
        )
    }

    #[must_use]
    pub fn clamp_font_size(&self, size: i32) -> i32 {
        size.clamp(self.min_font_size, self.max_font_size)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    /// Area available to the text editor, i.e. window minus its chrome
    pub content_area: Size,
    pub text: &'a str,
    pub font_family: &'a str,
    pub font_size: i32,
    pub window_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOutcome {
    pub window_size: Size,
    pub content_area: Size,
    pub font_size: i32,
}

impl FitOutcome {
    #[must_use]
    pub fn is_unchanged(&self, request: &FitRequest<'_>) -> bool {
        self.window_size == request.window_size && self.font_size == request.font_size
    }
}

#[allow(clippy::cast_precision_loss)]
fn fits(extent: TextExtent, available: Size) -> bool {
    extent.width <= available.width as f32 && extent.height <= available.height as f32
}

/// Grows the window when the text overflows at its current size, then searches for the
/// largest font size in bounds that fits the resulting area.
///
/// The window's top-left corner is not part of the computation: callers keep it fixed.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fit(request: &FitRequest<'_>, limits: &FitLimits, metrics: &dyn TextMetrics) -> FitOutcome {
    let unchanged = FitOutcome {
        window_size: request.window_size,
        content_area: request.content_area,
        font_size: request.font_size,
    };
    if request.text.is_empty() {
        return unchanged;
    }

    let mut window_size = request.window_size;
    let mut content_area = request.content_area;

    let extent = metrics.measure(request.font_family, request.font_size, request.text);
    if !fits(extent, limits.effective_available(content_area)) {
        let frame = limits.text_frame();
        let wanted = Size::new(
            (extent.width + frame.width as f32) as i32,
            (extent.height + frame.height as f32) as i32,
        );
        let grown = limits.clamp_size(wanted);
        // chrome between window and content keeps its size
        content_area = content_area + (grown - window_size);
        window_size = grown;
        tracing::debug!(
            ?window_size,
            text_width = extent.width,
            text_height = extent.height,
            "text overflows, resizing note"
        );
    }

    let available = limits.effective_available(content_area);
    let mut low = limits.min_font_size;
    let mut high = limits.max_font_size;
    let mut best = limits.clamp_font_size(request.font_size);
    while low <= high {
        let mid = (low + high) / 2;
        if fits(
            metrics.measure(request.font_family, mid, request.text),
            available,
        ) {
            best = mid;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    FitOutcome {
        window_size,
        content_area,
        font_size: best,
    }
}

#[cfg(test)]
use super::metrics::EstimatedMetrics;

#[cfg(test)]
fn request<'a>(text: &'a str, font_size: i32, window: Size) -> FitRequest<'a> {
    FitRequest {
        content_area: window,
        text,
        font_family: "Arial",
        font_size,
        window_size: window,
    }
}

#[test]
fn empty_text_is_noop() {
    let outcome = fit(
        &request("", 12, Size::new(300, 200)),
        &FitLimits::default(),
        &EstimatedMetrics::default(),
    );
    assert_eq!(outcome.window_size, Size::new(300, 200));
    assert_eq!(outcome.font_size, 12);
}

#[test]
fn short_text_keeps_window_and_picks_largest_fitting_size() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::default();
    let req = request("Hello", 12, Size::new(300, 200));
    let outcome = fit(&req, &limits, &metrics);
    // ample space: no growth
    assert_eq!(outcome.window_size, Size::new(300, 200));
    // largest feasible size: fits now, one step larger does not (or at the upper bound)
    let available = limits.effective_available(outcome.content_area);
    assert!(fits(
        metrics.measure("Arial", outcome.font_size, "Hello"),
        available
    ));
    assert!(
        outcome.font_size == limits.max_font_size
            || !fits(
                metrics.measure("Arial", outcome.font_size + 1, "Hello"),
                available
            )
    );
    // applying the outcome again changes nothing
    let again = fit(
        &request("Hello", outcome.font_size, outcome.window_size),
        &limits,
        &metrics,
    );
    assert!(again.is_unchanged(&request("Hello", outcome.font_size, outcome.window_size)));
}

#[test]
fn long_paragraph_grows_window_and_stays_in_bounds() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::wrapping(730.0);
    let text = "lorem ipsum ".repeat(42);
    let text = &text[..500];
    let req = request(text, 24, Size::new(300, 200));
    let outcome = fit(&req, &limits, &metrics);

    assert!(outcome.window_size.width > 300);
    assert!(outcome.window_size.height > 200);
    assert!((limits.min_width..=limits.max_width).contains(&outcome.window_size.width));
    assert!((limits.min_height..=limits.max_height).contains(&outcome.window_size.height));
    assert!((limits.min_font_size..=limits.max_font_size).contains(&outcome.font_size));

    let available = limits.effective_available(outcome.content_area);
    assert!(fits(
        metrics.measure("Arial", outcome.font_size, text),
        available
    ));

    let second = request(text, outcome.font_size, outcome.window_size);
    assert_eq!(fit(&second, &limits, &metrics), outcome);
}

#[test]
fn growth_is_clamped_to_maximum() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::default();
    let text = "x".repeat(400);
    let outcome = fit(&request(&text, 24, Size::new(300, 200)), &limits, &metrics);
    assert_eq!(outcome.window_size.width, limits.max_width);
    // nothing fits a 400 character line: size stays where it was
    assert_eq!(outcome.font_size, 24);
}

#[test]
fn clamped_growth_shrinks_font_to_fit() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::default();
    // 864x576 at size 24, more than the largest window can hold
    let text = vec!["x".repeat(60); 20].join("\n");
    let outcome = fit(&request(&text, 24, Size::new(300, 200)), &limits, &metrics);
    assert_eq!(outcome.window_size, Size::new(800, 600));
    assert_eq!(outcome.content_area, Size::new(800, 600));
    // 730 wide available: 20 * 0.6 * 60 = 720 fits, 21 does not
    assert_eq!(outcome.font_size, 20);

    let second = request(&text, outcome.font_size, outcome.window_size);
    let again = fit(&second, &limits, &metrics);
    assert_eq!(again, outcome);
    assert!(again.is_unchanged(&second));
}

#[test]
fn unreachable_sizes_are_clamped_into_bounds() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::default();
    let text = "x".repeat(400);
    let outcome = fit(&request(&text, 200, Size::new(300, 200)), &limits, &metrics);
    assert_eq!(outcome.font_size, limits.max_font_size);
}

#[test]
fn chrome_is_preserved_on_growth() {
    let limits = FitLimits::default();
    let metrics = EstimatedMetrics::default();
    let text = "x".repeat(60);
    let req = FitRequest {
        content_area: Size::new(290, 150),
        text: &text,
        font_family: "Arial",
        font_size: 12,
        window_size: Size::new(300, 200),
    };
    let outcome = fit(&req, &limits, &metrics);
    assert_eq!(
        outcome.window_size - outcome.content_area,
        Size::new(10, 50)
    );
}

#[test]
fn search_measures_at_most_seven_sizes() {
    use std::cell::Cell;

    struct Counting {
        inner: EstimatedMetrics,
        calls: Cell<u32>,
    }

    impl TextMetrics for Counting {
        fn measure(&self, family: &str, size: i32, text: &str) -> TextExtent {
            self.calls.set(self.calls.get() + 1);
            self.inner.measure(family, size, text)
        }
    }

    let metrics = Counting {
        inner: EstimatedMetrics::default(),
        calls: Cell::new(0),
    };
    let _ = fit(
        &request("some text", 12, Size::new(300, 200)),
        &FitLimits::default(),
        &metrics,
    );
    // one growth check plus the search
    assert!(metrics.calls.get() <= 1 + 7);
}
