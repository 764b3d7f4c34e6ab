use super::{
    fit_solver::FitLimits,
    geometry::Size,
    note_style::{deserialize_color, serialize_color},
};
use palette::Srgb;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("Failed reading image {}: {}", .0.display(), .1)]
    Image(PathBuf, image::ImageError),
    #[error("Image {} has no pixels", .0.display())]
    Empty(PathBuf),
}

/// Reads the natural size of a background image without keeping its pixels.
pub trait ImageSource {
    fn try_image_size(&self, path: &Path) -> Result<Size, BackgroundError>;
}

/// Image source backed by the `image` crate: decodes only the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFiles;

impl ImageSource for ImageFiles {
    fn try_image_size(&self, path: &Path) -> Result<Size, BackgroundError> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| BackgroundError::Image(path.to_path_buf(), e))?;
        match (i32::try_from(width), i32::try_from(height)) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok(Size::new(width, height)),
            _ => Err(BackgroundError::Empty(path.to_path_buf())),
        }
    }
}

/// How a background image is laid out against its note window.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScaleMode {
    /// keep aspect ratio, largest size inside the window
    Fit,
    /// fill the window ignoring aspect ratio
    Stretch,
    /// natural image size, window takes the image size
    #[default]
    Original,
    /// window height follows the image aspect ratio at the current width
    FitWidth,
    /// window width follows the image aspect ratio at the current height
    FitHeight,
}

#[allow(clippy::cast_possible_truncation)]
fn scale(value: i32, numerator: i32, denominator: i32) -> i32 {
    (f64::from(value) * f64::from(numerator) / f64::from(denominator)) as i32
}

impl ScaleMode {
    /// Size the image is painted at, centered in the window
    #[must_use]
    pub fn render_size(self, natural: Size, window: Size) -> Size {
        match self {
            ScaleMode::Original => natural,
            ScaleMode::Stretch | ScaleMode::FitWidth | ScaleMode::FitHeight => window,
            ScaleMode::Fit => {
                let by_width = Size::new(
                    window.width,
                    scale(window.width, natural.height, natural.width),
                );
                if by_width.height <= window.height {
                    by_width
                } else {
                    Size::new(
                        scale(window.height, natural.width, natural.height),
                        window.height,
                    )
                }
            }
        }
    }

    /// Window size this mode asks for when it is selected, already clamped to note bounds
    #[must_use]
    pub fn window_size_for(self, natural: Size, window: Size, limits: &FitLimits) -> Size {
        let wanted = match self {
            ScaleMode::Fit | ScaleMode::Stretch => window,
            ScaleMode::Original => natural,
            ScaleMode::FitWidth => {
                Size::new(window.width, scale(window.width, natural.height, natural.width))
            }
            ScaleMode::FitHeight => {
                Size::new(scale(window.height, natural.width, natural.height), window.height)
            }
        };
        limits.clamp_size(wanted)
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    pub source: PathBuf,
    pub natural: Size,
    pub rendered: Size,
    pub mode: ScaleMode,
}

impl BackgroundImage {
    /// Recomputes the painted size after the window changed
    pub fn refit(&mut self, window: Size) {
        self.rendered = self.mode.render_size(self.natural, window);
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub enum Background {
    Color(
        #[serde(
            deserialize_with = "deserialize_color",
            serialize_with = "serialize_color"
        )]
        Srgb<u8>,
    ),
    Image(BackgroundImage),
}

impl Background {
    pub fn refit(&mut self, window: Size) {
        if let Background::Image(image) = self {
            image.refit(window);
        }
    }
}

#[test]
fn fit_keeps_aspect_ratio() {
    let natural = Size::new(400, 200);
    assert_eq!(
        ScaleMode::Fit.render_size(natural, Size::new(300, 300)),
        Size::new(300, 150)
    );
    assert_eq!(
        ScaleMode::Fit.render_size(natural, Size::new(600, 100)),
        Size::new(200, 100)
    );
}

#[test]
fn each_mode_asks_for_its_own_window_size() {
    let limits = FitLimits::default();
    let natural = Size::new(640, 480);
    let window = Size::new(400, 200);
    assert_eq!(ScaleMode::Fit.window_size_for(natural, window, &limits), window);
    assert_eq!(ScaleMode::Stretch.window_size_for(natural, window, &limits), window);
    assert_eq!(
        ScaleMode::Original.window_size_for(natural, window, &limits),
        Size::new(640, 480)
    );
    assert_eq!(
        ScaleMode::FitWidth.window_size_for(natural, window, &limits),
        Size::new(400, 300)
    );
    assert_eq!(
        ScaleMode::FitHeight.window_size_for(natural, window, &limits),
        Size::new(266, 200)
    );
    // huge images are clamped to note bounds
    assert_eq!(
        ScaleMode::Original.window_size_for(Size::new(4000, 3000), window, &limits),
        Size::new(800, 600)
    );
}

#[test]
fn missing_image_file_is_an_error() {
    let result = ImageFiles.try_image_size(Path::new("/definitely/not/here.png"));
    assert!(matches!(result, Err(BackgroundError::Image(..))));
}
