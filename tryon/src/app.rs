use crate::{
    Result, TryOnError,
    catalog::{Catalog, Category, ProcessingPolicy},
    config::Config,
    dispatcher::{DispatchSettings, Dispatcher},
    secrets,
};
use background_remover::{BackgroundRemover, Model, RemoveBackground};
use image::{DynamicImage, RgbaImage};
use std::{
    fs,
    path::{Path, PathBuf},
};
use uuid::Uuid;

const STAGING_DIR: &str = ".staging";

/// Wire a [`Dispatcher`] from the loaded config.
///
/// A remover is attached only when some category uses the flat-lay policy,
/// and its model is loaded by the first flat-lay request. A model that fails
/// to load makes flat-lay requests fail with the load error.
pub fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let catalog = load_catalog(config)?;

    let settings = DispatchSettings::default()
        .with_output_dir(config.storage.output_dir.clone())
        .with_unique_outputs(config.storage.unique_outputs)
        .with_flat_lay_scale(config.flat_lay.scale_fraction);

    let api_key = secrets::resolve_api_key(&config.secrets.path);
    let mut dispatcher =
        Dispatcher::new(catalog, settings).with_api(&config.api, api_key.as_deref());

    if dispatcher.catalog().has_policy(ProcessingPolicy::FlatLay) {
        dispatcher = dispatcher.with_remover(Box::new(LazyRemover::new(
            &config.flat_lay.model,
            &config.flat_lay.model_dir,
        )));
    }

    Ok(dispatcher)
}

/// The catalog file named by the config, or the built-in scenes.
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    let assets_dir = config.storage.assets_dir.clone();
    match &config.catalog {
        Some(path) => Catalog::load(path, assets_dir),
        None => Ok(Catalog::builtin(assets_dir)),
    }
}

/// Matting model opened on first use. A failed load is remembered and
/// reported by every later call.
struct LazyRemover {
    model: String,
    model_dir: PathBuf,
    loaded: Option<std::result::Result<BackgroundRemover, String>>,
}

impl LazyRemover {
    fn new(model: &str, model_dir: &Path) -> Self {
        Self {
            model: model.to_string(),
            model_dir: model_dir.to_path_buf(),
            loaded: None,
        }
    }

    fn load(&self) -> std::result::Result<BackgroundRemover, String> {
        self.model
            .parse::<Model>()
            .and_then(|model| BackgroundRemover::from_dir(model, &self.model_dir))
            .map_err(|e| {
                log::warn!("Background remover unavailable: {e}");
                e.to_string()
            })
    }
}

impl RemoveBackground for LazyRemover {
    fn remove_background(
        &mut self,
        image: &DynamicImage,
    ) -> background_remover::Result<RgbaImage> {
        if self.loaded.is_none() {
            self.loaded = Some(self.load());
        }

        match &mut self.loaded {
            Some(Ok(remover)) => remover.remove_background(image),
            Some(Err(reason)) => Err(background_remover::Error::Generic(reason.clone())),
            None => Err(background_remover::Error::Generic(
                "background remover not loaded".to_string(),
            )),
        }
    }
}

/// A private copy of an upload, named `temp_<file name>`.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the copy, and its per-request directory if it has one.
    pub fn remove(self) {
        let result = match &self.scratch_dir {
            Some(dir) => fs::remove_dir_all(dir),
            None => fs::remove_file(&self.path),
        };

        if let Err(e) = result {
            log::warn!("Remove staged upload {} failed. {e}", self.path.display());
        }
    }
}

/// Copy an upload into `dir` as `temp_<file name>`.
///
/// With `unique` set the copy goes to `dir/.staging/<uuid>/` so concurrent
/// requests for the same file name never share a staged file.
pub fn stage_upload(src: &Path, dir: &Path, unique: bool) -> Result<StagedUpload> {
    if !src.is_file() {
        return Err(TryOnError::SourceNotFound(src.to_path_buf()));
    }

    let name = src
        .file_name()
        .ok_or_else(|| TryOnError::SourceNotFound(src.to_path_buf()))?
        .to_string_lossy();

    let scratch_dir =
        unique.then(|| dir.join(STAGING_DIR).join(Uuid::new_v4().simple().to_string()));
    let target_dir = scratch_dir.as_deref().unwrap_or(dir);

    fs::create_dir_all(target_dir)?;
    let path = target_dir.join(format!("temp_{name}"));
    fs::copy(src, &path)?;

    Ok(StagedUpload { path, scratch_dir })
}

/// Stage `garment`, run one request, then drop the staged copy whatever the
/// outcome. The caller's file is left alone.
pub async fn generate_from_upload(
    dispatcher: &Dispatcher,
    garment: &Path,
    category: Category,
    scene: Option<&str>,
) -> Result<PathBuf> {
    let settings = dispatcher.settings();
    let staged = stage_upload(garment, &settings.output_dir, settings.unique_outputs)?;
    let result = dispatcher.generate(staged.path(), category, scene).await;

    staged.remove();
    result
}
