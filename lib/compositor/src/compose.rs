use crate::{Error, Result};
use derivative::Derivative;
use derive_setters::Setters;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image as FrImage,
};
use image::{DynamicImage, RgbaImage, imageops};
use std::path::Path;

/// Padding between the pasted figure and the bottom edge of the background.
pub const DEFAULT_BOTTOM_PADDING: u32 = 50;

/// Vertical anchoring policy of the pasted foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Full-figure composites: `y = bg_h - target_h - padding`
    Bottom { padding: u32 },

    /// Flat-lay garments: `y = (bg_h - target_h) / 2`
    Center,
}

/// Size and anchor of a foreground relative to its background.
#[derive(Debug, Clone, Copy, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct Layout {
    /// Foreground height as a fraction of the background height
    #[derivative(Default(value = "0.85"))]
    pub scale_fraction: f64,

    #[derivative(Default(value = "Anchor::Bottom { padding: DEFAULT_BOTTOM_PADDING }"))]
    pub anchor: Anchor,
}

impl Layout {
    pub fn new(scale_fraction: f64, anchor: Anchor) -> Self {
        Self {
            scale_fraction,
            anchor,
        }
    }

    pub fn bottom(scale_fraction: f64, padding: u32) -> Self {
        Self::new(scale_fraction, Anchor::Bottom { padding })
    }

    pub fn center(scale_fraction: f64) -> Self {
        Self::new(scale_fraction, Anchor::Center)
    }
}

/// Where and how large the resized foreground lands on the background.
/// The origin may be negative, or the size larger than the background:
/// overflow is clipped at paste time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Compute the placement of a `fg_size` foreground on a `bg_size` background.
///
/// Height follows `scale_fraction * bg_height`, width keeps the foreground's
/// aspect ratio and the foreground is always centered horizontally.
pub fn placement(fg_size: (u32, u32), bg_size: (u32, u32), layout: &Layout) -> Result<Placement> {
    let (fg_w, fg_h) = fg_size;
    let (bg_w, bg_h) = bg_size;

    if fg_w == 0 || fg_h == 0 {
        return Err(Error::InvalidParameter(format!(
            "foreground has no pixels: {fg_w}x{fg_h}"
        )));
    }

    if bg_w == 0 || bg_h == 0 {
        return Err(Error::InvalidParameter(format!(
            "background has no pixels: {bg_w}x{bg_h}"
        )));
    }

    if !layout.scale_fraction.is_finite() || layout.scale_fraction <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "scale fraction must be positive, got {}",
            layout.scale_fraction
        )));
    }

    let height = (layout.scale_fraction * bg_h as f64).floor();
    let width = (height * fg_w as f64 / fg_h as f64).floor();

    if height < 1.0 || width < 1.0 {
        return Err(Error::InvalidParameter(format!(
            "scale fraction {} collapses foreground to {width}x{height}",
            layout.scale_fraction
        )));
    }

    if height > u32::MAX as f64 || width > u32::MAX as f64 {
        return Err(Error::InvalidParameter(format!(
            "scale fraction {} overflows target size",
            layout.scale_fraction
        )));
    }

    let (width, height) = (width as u32, height as u32);
    let x = (bg_w as i64 - width as i64).div_euclid(2);
    let y = match layout.anchor {
        Anchor::Bottom { padding } => bg_h as i64 - height as i64 - padding as i64,
        Anchor::Center => (bg_h as i64 - height as i64).div_euclid(2),
    };

    Ok(Placement {
        x,
        y,
        width,
        height,
    })
}

/// Resize `foreground` and paste it onto a copy of `background`.
///
/// Both inputs are converted to RGBA8 first. The foreground's alpha channel
/// acts as the paste mask, so fully transparent pixels keep the background.
pub fn compose(
    foreground: &DynamicImage,
    background: &DynamicImage,
    layout: &Layout,
) -> Result<RgbaImage> {
    let foreground = foreground.to_rgba8();
    let mut canvas = background.to_rgba8();

    let place = placement(foreground.dimensions(), canvas.dimensions(), layout)?;
    log::debug!(
        "Compose {}x{} onto {}x{} at ({}, {}) as {}x{}",
        foreground.width(),
        foreground.height(),
        canvas.width(),
        canvas.height(),
        place.x,
        place.y,
        place.width,
        place.height
    );

    let resized = lanczos_resize(foreground, place.width, place.height)?;
    imageops::overlay(&mut canvas, &resized, place.x, place.y);

    Ok(canvas)
}

/// File based [`compose`]; the result is written as PNG to `output`.
pub fn compose_files(
    foreground: impl AsRef<Path>,
    background: impl AsRef<Path>,
    output: impl AsRef<Path>,
    layout: &Layout,
) -> Result<()> {
    let (foreground, background, output) =
        (foreground.as_ref(), background.as_ref(), output.as_ref());

    for source in [foreground, background] {
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
    }

    let fg = image::open(foreground)?;
    let bg = image::open(background)?;
    let composite = compose(&fg, &bg, layout)?;

    if let Some(dir) = output.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }

    composite.save_with_format(output, image::ImageFormat::Png)?;
    Ok(())
}

fn lanczos_resize(image: RgbaImage, target_width: u32, target_height: u32) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if width == target_width && height == target_height {
        return Ok(image);
    }

    let src_image = FrImage::from_vec_u8(width, height, image.into_raw(), PixelType::U8x4)?;
    let mut dst_image = FrImage::new(target_width, target_height, PixelType::U8x4);

    // Alpha is premultiplied during convolution so transparent edges don't bleed
    let options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    Resizer::new().resize(&src_image, &mut dst_image, &options)?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| Error::ImageProcessing("Failed to create resized image".to_string()))
}
