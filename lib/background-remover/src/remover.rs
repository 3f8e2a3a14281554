use crate::{Error, Model, RemoveBackground, Result};
use fast_image_resize::{PixelType, ResizeOptions, Resizer, images::Image as FrImage};
use image::{DynamicImage, GrayImage, Luma, RgbImage, RgbaImage};
use ndarray::{Array4, ArrayD};
use ort::{session::Session, value::TensorRef};
use std::path::Path;

const INPUT_NAMES: [&str; 4] = ["input", "input.1", "image", "x"];
const OUTPUT_NAMES: [&str; 4] = ["output", "mask", "foreground", "alpha"];

/// ONNX matting model wrapped as a [`RemoveBackground`] implementation.
#[derive(Debug)]
#[non_exhaustive]
pub struct BackgroundRemover {
    model: Model,
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl BackgroundRemover {
    pub fn new<P: AsRef<Path>>(model: Model, model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.is_file() {
            return Err(Error::ModelNotFound {
                path: model_path.to_path_buf(),
                url: model.download_url().to_string(),
            });
        }

        log::info!("Loading {model} from: {}", model_path.display());

        let session = Session::builder()?.commit_from_file(model_path)?;
        let input_name = Self::pick_input_name(&session);
        let output_names = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        Ok(Self {
            model,
            session,
            input_name,
            output_names,
        })
    }

    /// Load `model` from its conventional file name inside `model_dir`.
    pub fn from_dir<P: AsRef<Path>>(model: Model, model_dir: P) -> Result<Self> {
        Self::new(model, model_dir.as_ref().join(model.file_name()))
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Foreground probability per pixel: 0 = background, 255 = garment.
    pub fn mask(&mut self, image: &RgbImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        let (input_w, input_h) = self.model.input_size();

        let resized = resize_raw(
            image.as_raw().clone(),
            (width, height),
            (input_w, input_h),
            PixelType::U8x3,
        )?;
        let resized = RgbImage::from_raw(input_w, input_h, resized)
            .ok_or_else(|| Error::ImageProcessing("Failed to create model input".to_string()))?;

        let input = Self::to_tensor(&resized, self.model.normalization());
        let output = self.infer(input)?;
        let mask = Self::to_mask(&output)?;
        let (mask_w, mask_h) = mask.dimensions();

        let mask = resize_raw(
            mask.into_raw(),
            (mask_w, mask_h),
            (width, height),
            PixelType::U8,
        )?;
        GrayImage::from_raw(width, height, mask)
            .ok_or_else(|| Error::ImageProcessing("Failed to create resized mask".to_string()))
    }

    /// Multiply the image's own alpha by `mask`.
    pub fn apply_mask(image: &RgbaImage, mask: &GrayImage) -> Result<RgbaImage> {
        if image.dimensions() != mask.dimensions() {
            return Err(Error::ImageProcessing(format!(
                "mask is {:?} but image is {:?}",
                mask.dimensions(),
                image.dimensions()
            )));
        }

        let mut result = image.clone();
        for (pixel, alpha) in result.pixels_mut().zip(mask.pixels()) {
            pixel[3] = ((pixel[3] as u16 * alpha[0] as u16 + 127) / 255) as u8;
        }

        Ok(result)
    }

    /// Hard cut of a soft mask (0 = background, 255 = foreground).
    pub fn binary_mask(mask: &GrayImage, threshold: u8) -> GrayImage {
        GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
            Luma([if mask.get_pixel(x, y)[0] > threshold { 255 } else { 0 }])
        })
    }

    // NCHW, channel-wise (v / 255 - mean) / std
    fn to_tensor(image: &RgbImage, (mean, std): ([f32; 3], [f32; 3])) -> Array4<f32> {
        let (width, height) = image.dimensions();
        Array4::from_shape_fn((1, 3, height as usize, width as usize), |(_, c, y, x)| {
            let value = image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (value - mean[c]) / std[c]
        })
    }

    fn infer(&mut self, input: Array4<f32>) -> Result<ArrayD<f32>> {
        let input_tensor = TensorRef::from_array_view(input.view())?;
        let outputs = self
            .session
            .run(ort::inputs! { &self.input_name => input_tensor })?;

        let preferred = OUTPUT_NAMES
            .iter()
            .filter(|name| outputs.contains_key(**name))
            .map(|name| name.to_string());
        let candidates = preferred.chain(self.output_names.iter().cloned());

        for name in candidates {
            if let Ok(array) = outputs[name.as_str()].try_extract_array::<f32>() {
                return Ok(array.into_dyn().to_owned());
            }
        }

        Err(Error::InvalidOutput(
            "Failed to extract any output from model".to_string(),
        ))
    }

    // Predictions are min-max normalized, models disagree on their range
    fn to_mask(output: &ArrayD<f32>) -> Result<GrayImage> {
        let shape = output.shape();
        let (width, height) = match shape.len() {
            4 => (shape[3], shape[2]),
            3 => (shape[2], shape[1]),
            2 => (shape[1], shape[0]),
            _ => {
                return Err(Error::InvalidOutput(format!(
                    "Unsupported output shape: {shape:?}",
                )));
            }
        };

        let plane: Vec<f32> = output.iter().take(width * height).copied().collect();
        let (min, max) = plane
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = if max - min > f32::EPSILON { max - min } else { 1.0 };

        let mask = plane
            .iter()
            .map(|v| (((v - min) / range).clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();

        GrayImage::from_raw(width as u32, height as u32, mask)
            .ok_or_else(|| Error::InvalidOutput(format!("Mask shape mismatch: {shape:?}")))
    }

    fn pick_input_name(session: &Session) -> String {
        let inputs: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();

        INPUT_NAMES
            .iter()
            .find(|name| inputs.iter().any(|input| input == *name))
            .map(|name| name.to_string())
            .or_else(|| inputs.first().cloned())
            .unwrap_or_else(|| "input".to_string())
    }
}

impl RemoveBackground for BackgroundRemover {
    fn remove_background(&mut self, image: &DynamicImage) -> Result<RgbaImage> {
        let mask = self.mask(&image.to_rgb8())?;
        Self::apply_mask(&image.to_rgba8(), &mask)
    }
}

fn resize_raw(
    buffer: Vec<u8>,
    (width, height): (u32, u32),
    (target_width, target_height): (u32, u32),
    pixel_type: PixelType,
) -> Result<Vec<u8>> {
    if width == target_width && height == target_height {
        return Ok(buffer);
    }

    let src_image = FrImage::from_vec_u8(width, height, buffer, pixel_type)?;
    let mut dst_image = FrImage::new(target_width, target_height, pixel_type);
    Resizer::new().resize(&src_image, &mut dst_image, &ResizeOptions::new())?;

    Ok(dst_image.into_vec())
}
