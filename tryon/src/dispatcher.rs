//! Turns one garment upload into one result image.
//!
//! A request ends either with the path of the written result or with a
//! [`TryOnError`] whose message is meant for the user. Nothing here panics
//! or retries, and the garment file is never deleted.

use crate::{
    Result, TryOnError,
    catalog::{Catalog, Category, ProcessingPolicy},
};
use background_remover::RemoveBackground;
use compositor::Layout;
use derive_setters::Setters;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};
use tryon_api::{ApiConfig, TryOnApi, TryOnRequest};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct DispatchSettings {
    #[derivative(Default(value = "PathBuf::from(\".\")"))]
    pub output_dir: PathBuf,

    pub unique_outputs: bool,

    /// Garment height as a fraction of the flat-lay background height
    #[derivative(Default(value = "0.6"))]
    pub flat_lay_scale: f64,
}

pub struct Dispatcher {
    catalog: Catalog,
    settings: DispatchSettings,
    api: Option<TryOnApi>,
    api_fault: Option<String>,
    remover: Option<Mutex<Box<dyn RemoveBackground>>>,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, settings: DispatchSettings) -> Self {
        Self {
            catalog,
            settings,
            api: None,
            api_fault: None,
            remover: None,
        }
    }

    /// Enable the remote-composite policy. Without a key those requests fail
    /// with [`TryOnError::MissingCredential`] before any network access. A
    /// client that cannot be built only fails remote requests, with
    /// [`TryOnError::Config`].
    pub fn with_api(mut self, config: &ApiConfig, api_key: Option<&str>) -> Self {
        self.api = None;
        self.api_fault = None;

        if let Some(key) = api_key {
            match TryOnApi::new(config, key) {
                Ok(api) => self.api = Some(api),
                Err(e) => {
                    log::warn!("Remote try-on disabled: {e}");
                    self.api_fault = Some(e.to_string());
                }
            }
        }
        self
    }

    /// Enable the flat-lay policy.
    pub fn with_remover(mut self, remover: Box<dyn RemoveBackground>) -> Self {
        self.remover = Some(Mutex::new(remover));
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Produce the try-on image of `garment` for `category`.
    ///
    /// `scene` picks a named background of the category; `None` picks one at
    /// random. An unknown scene name fails instead of falling back.
    pub async fn generate(
        &self,
        garment: &Path,
        category: Category,
        scene: Option<&str>,
    ) -> Result<PathBuf> {
        log::info!(
            "--- Processing {} with {} ---",
            category.as_ref().to_uppercase(),
            garment.display()
        );

        let policy = self
            .catalog
            .policy_for(category)
            .ok_or(TryOnError::NoAssetsForCategory(category))?;

        let scene_path = match scene {
            Some(name) => self.catalog.resolve(category, name)?,
            None => self.catalog.resolve_random(category)?,
        };
        log::info!("Config: policy={policy:?}, scene={}", scene_path.display());

        for source in [garment, scene_path.as_path()] {
            if !source.is_file() {
                return Err(TryOnError::SourceNotFound(source.to_path_buf()));
            }
        }

        let output = self.output_path(category, garment);
        match policy {
            ProcessingPolicy::RemoteComposite => {
                self.remote_composite(garment, &scene_path, &output).await?
            }
            ProcessingPolicy::FlatLay => self.flat_lay(garment, &scene_path, &output)?,
        }

        log::info!("Result saved to {}", output.display());
        Ok(output)
    }

    /// `output_<category>_<garment-stem>.png` inside the output dir.
    pub fn output_path(&self, category: Category, garment: &Path) -> PathBuf {
        let stem = garment
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let name = if self.settings.unique_outputs {
            format!("output_{category}_{stem}_{}.png", Uuid::new_v4().simple())
        } else {
            format!("output_{category}_{stem}.png")
        };

        self.settings.output_dir.join(name)
    }

    // The scene already shows the subject in situ, it is sent as the avatar
    async fn remote_composite(&self, garment: &Path, scene: &Path, output: &Path) -> Result<()> {
        if let Some(fault) = &self.api_fault {
            return Err(TryOnError::Config(fault.clone()));
        }
        let api = self.api.as_ref().ok_or(TryOnError::MissingCredential)?;
        let image = api.try_on(&TryOnRequest::new(garment, scene)).await?;

        let tmp = self.prepare_tmp(output)?;
        if let Err(e) = tokio::fs::write(&tmp, &image).await {
            _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        commit_tmp(&tmp, output)
    }

    fn flat_lay(&self, garment: &Path, scene: &Path, output: &Path) -> Result<()> {
        let remover = self.remover.as_ref().ok_or_else(|| {
            TryOnError::BackgroundRemoval("no background remover configured".to_string())
        })?;

        let garment = image::open(garment)?;
        let cutout: RgbaImage = {
            let mut remover = remover.lock().map_err(|_| {
                TryOnError::BackgroundRemoval("background remover is poisoned".to_string())
            })?;
            remover.remove_background(&garment)?
        };

        let background = image::open(scene)?;
        let composite = compositor::compose(
            &DynamicImage::ImageRgba8(cutout),
            &background,
            &Layout::center(self.settings.flat_lay_scale),
        )?;

        let tmp = self.prepare_tmp(output)?;
        if let Err(e) = composite.save_with_format(&tmp, ImageFormat::Png) {
            _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        commit_tmp(&tmp, output)
    }

    // Results are renamed into place so a reader never sees a partial file
    fn prepare_tmp(&self, output: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.settings.output_dir)?;

        let name = output
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(output.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple())))
    }
}

fn commit_tmp(tmp: &Path, output: &Path) -> Result<()> {
    if let Err(e) = std::fs::rename(tmp, output) {
        _ = std::fs::remove_file(tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryEntry;

    fn dispatcher(settings: DispatchSettings) -> Dispatcher {
        Dispatcher::new(Catalog::builtin("assets"), settings)
    }

    #[test]
    fn test_output_path_convention() {
        let d = dispatcher(DispatchSettings::default().with_output_dir(PathBuf::from("out")));
        assert_eq!(
            d.output_path(Category::Femme, Path::new("/tmp/temp_shirt.jpg")),
            PathBuf::from("out/output_femme_temp_shirt.png")
        );
        assert_eq!(
            d.output_path(Category::Bebe, Path::new("onesie.webp")),
            PathBuf::from("out/output_bebe_onesie.png")
        );
    }

    #[test]
    fn test_unique_output_path() {
        let d = dispatcher(DispatchSettings::default().with_unique_outputs(true));
        let a = d.output_path(Category::Homme, Path::new("coat.png"));
        let b = d.output_path(Category::Homme, Path::new("coat.png"));

        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("output_homme_coat_"));
        assert!(name.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_category_without_assets() {
        let catalog = Catalog::from_entries(
            "assets",
            [(
                Category::Femme,
                CategoryEntry::new(ProcessingPolicy::RemoteComposite).with_scene("A", "a.png"),
            )],
        )
        .unwrap();
        let d = Dispatcher::new(catalog, DispatchSettings::default());

        let err = d
            .generate(Path::new("shirt.jpg"), Category::Enfant, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::NoAssetsForCategory(Category::Enfant)));
        assert!(err.to_string().starts_with("No assets found for category"));
    }

    #[tokio::test]
    async fn test_unknown_scene_fails_explicitly() {
        let d = dispatcher(DispatchSettings::default());
        let err = d
            .generate(Path::new("shirt.jpg"), Category::Femme, Some("Garden"))
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::UnknownAsset { .. }));
    }

    #[tokio::test]
    async fn test_missing_scene_asset() {
        let dir = tempfile::tempdir().unwrap();
        let garment = dir.path().join("shirt.jpg");
        std::fs::write(&garment, b"jpg").unwrap();

        let d = Dispatcher::new(
            Catalog::builtin(dir.path().join("assets")),
            DispatchSettings::default().with_output_dir(dir.path().to_path_buf()),
        );
        let err = d
            .generate(&garment, Category::Homme, Some("Bedroom"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, TryOnError::SourceNotFound(ref p) if p.ends_with("man_bedroom.png"))
        );
    }
}
