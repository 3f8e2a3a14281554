use anyhow::{Context, Result, bail};
use compositor::BakeJob;
use log::debug;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tryon_api::ApiConfig;

pub const APP_NAME: &str = "tryon";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub is_first_run: bool,

    /// Catalog TOML replacing the built-in scene table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: Storage,

    #[serde(default)]
    pub flat_lay: FlatLay,

    #[serde(default)]
    pub secrets: Secrets,

    /// Scene images pre-baked by `tryon bake`
    #[serde(default = "bake_default", skip_serializing_if = "Vec::is_empty")]
    pub bake: Vec<BakeJob>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Storage {
    #[derivative(Default(value = "PathBuf::from(\"assets\")"))]
    pub assets_dir: PathBuf,

    #[derivative(Default(value = "PathBuf::from(\".\")"))]
    pub output_dir: PathBuf,

    /// Append a random suffix to result names so concurrent shells never
    /// overwrite each other
    pub unique_outputs: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct FlatLay {
    #[derivative(Default(value = "0.6"))]
    pub scale_fraction: f64,

    #[derivative(Default(value = "\"u2netp.onnx\".to_string()"))]
    pub model: String,

    #[derivative(Default(value = "PathBuf::from(\"models\")"))]
    pub model_dir: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Secrets {
    /// TOML file holding `RAPIDAPI_KEY`, checked before the environment
    #[derivative(Default(value = "PathBuf::from(\"secrets.toml\")"))]
    pub path: PathBuf,
}

impl Config {
    /// Load the config at `path`, or at the platform config dir when `None`.
    pub fn init(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => default_config_path()?,
        };

        if let Some(dir) = config_path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let mut config = Config {
            config_path,
            bake: bake_default(),
            ..Default::default()
        };
        config.load().with_context(|| "load config file failed")?;
        debug!("{:?}", config);
        Ok(config)
    }

    /// Loads the config file, writing defaults when it is missing. An
    /// unparsable file is kept as `<name>.bak` and replaced by defaults.
    fn load(&mut self) -> Result<()> {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => match toml::from_str::<Config>(&text) {
                Ok(mut c) => {
                    c.config_path = self.config_path.clone();
                    c.is_first_run = false;
                    *self = c;
                    Ok(())
                }
                Err(e) => {
                    log::warn!("{} is invalid, restoring defaults. {e}", self.config_path.display());
                    self.is_first_run = true;
                    _ = fs::copy(&self.config_path, backup_path(&self.config_path));
                    self.save()
                }
            },
            Err(_) => {
                self.is_first_run = true;
                self.save()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        match toml::to_string_pretty(self) {
            Ok(text) => Ok(fs::write(&self.config_path, text)
                .with_context(|| "save config failed".to_string())?),
            Err(e) => bail!(format!("convert config to toml format failed. {e:?}")),
        }
    }

    /// Bake jobs with relative paths resolved against the assets dir.
    pub fn bake_jobs(&self) -> Vec<BakeJob> {
        self.bake
            .iter()
            .map(|job| job.rooted_at(&self.storage.assets_dir))
            .collect()
    }
}

fn default_config_path() -> Result<PathBuf> {
    let Some(app_dirs) = AppDirs::new(Some(APP_NAME), true) else {
        bail!("no platform config directory available");
    };
    Ok(app_dirs.config_dir.join(format!("{APP_NAME}.toml")))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn bake_default() -> Vec<BakeJob> {
    BakeJob::defaults()
}
