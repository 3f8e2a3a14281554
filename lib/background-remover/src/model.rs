use crate::Error;
use std::{fmt, str::FromStr};

/// Matting models usable for garment cut-outs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Model {
    Modnet,
    Rmbg14,
    Rmbg14Fp16,
    Rmbg14Quantized,
    U2NET,
    #[default]
    U2NETP,
}

/// Per channel `(mean, std)` applied after scaling pixels to `[0, 1]`.
pub type Normalization = ([f32; 3], [f32; 3]);

const IMAGENET: Normalization = ([0.485, 0.456, 0.406], [0.229, 0.224, 0.225]);

impl Model {
    pub fn all_models() -> [Self; 6] {
        [
            Self::Modnet,
            Self::Rmbg14,
            Self::Rmbg14Fp16,
            Self::Rmbg14Quantized,
            Self::U2NET,
            Self::U2NETP,
        ]
    }

    pub fn input_size(&self) -> (u32, u32) {
        match self {
            Self::Modnet => (512, 512),
            Self::Rmbg14 | Self::Rmbg14Fp16 | Self::Rmbg14Quantized => (1024, 1024),
            Self::U2NET | Self::U2NETP => (320, 320),
        }
    }

    pub fn normalization(&self) -> Normalization {
        match self {
            Self::Modnet => ([0.5; 3], [0.5; 3]),
            Self::Rmbg14 | Self::Rmbg14Fp16 | Self::Rmbg14Quantized => ([0.5; 3], [1.0; 3]),
            Self::U2NET | Self::U2NETP => IMAGENET,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Modnet => "modnet_photographic_portrait_matting.onnx",
            Self::Rmbg14 => "rmbg-1.4.onnx",
            Self::Rmbg14Fp16 => "rmbg-1.4_fp16.onnx",
            Self::Rmbg14Quantized => "rmbg-1.4_quantized.onnx",
            Self::U2NET => "u2net.onnx",
            Self::U2NETP => "u2netp.onnx",
        }
    }

    pub fn download_url(&self) -> &'static str {
        match self {
            Self::Modnet => {
                "https://huggingface.co/TheEeeeLin/HivisionIDPhotos_matting/resolve/034769305faf641ad94edfac654aba13be06e816/modnet_photographic_portrait_matting.onnx"
            }
            Self::Rmbg14 => "https://huggingface.co/briaai/RMBG-1.4/resolve/main/onnx/model.onnx",
            Self::Rmbg14Fp16 => {
                "https://huggingface.co/briaai/RMBG-1.4/resolve/main/onnx/model_fp16.onnx"
            }
            Self::Rmbg14Quantized => {
                "https://huggingface.co/briaai/RMBG-1.4/resolve/main/onnx/model_quantized.onnx"
            }
            Self::U2NET => "https://huggingface.co/AlenZeng/u2netonnxmodel/resolve/main/u2net.onnx",
            Self::U2NETP => {
                "https://huggingface.co/martintomov/comfy/resolve/1b0c3477e152d8a2dea8e4e418a6dba32de56fda/rembg/u2netp.onnx"
            }
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Accepts the model file name with or without its `.onnx` suffix.
impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let stem = name.strip_suffix(".onnx").unwrap_or(name);

        Self::all_models()
            .into_iter()
            .find(|m| m.file_name().trim_end_matches(".onnx") == stem)
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}
