//! Offline pre-composition of avatar cut-outs onto scene backgrounds.
//!
//! Each job is independent: a missing source or a decode failure is logged
//! and reported for that job only, the rest of the batch still runs.

use crate::{Layout, Result, compose::DEFAULT_BOTTOM_PADDING, compose_files};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One avatar/background pair to bake into a scene image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakeJob {
    pub avatar: PathBuf,
    pub background: PathBuf,
    pub output: PathBuf,

    #[serde(default = "scale_default")]
    pub scale: f64,
}

#[derive(Debug)]
pub struct BakeOutcome {
    pub output: PathBuf,
    pub result: Result<()>,
}

impl BakeJob {
    pub fn new(
        avatar: impl Into<PathBuf>,
        background: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        scale: f64,
    ) -> Self {
        Self {
            avatar: avatar.into(),
            background: background.into(),
            output: output.into(),
            scale,
        }
    }

    /// Resolve relative paths against `dir`.
    pub fn rooted_at(&self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            avatar: dir.join(&self.avatar),
            background: dir.join(&self.background),
            output: dir.join(&self.output),
            scale: self.scale,
        }
    }

    /// Scene images derived from the stock avatars and backgrounds. The
    /// child scenes reuse the woman avatar at a smaller scale.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("woman.png", "bedroom.png", "woman_bedroom.png", 0.85),
            Self::new("pregnant.png", "livingroom.png", "pregnant_living_room.png", 0.85),
            Self::new("pregnant.png", "bedroom.png", "pregnant_bedroom.png", 0.85),
            Self::new("woman.png", "livingroom.png", "child_living_room.png", 0.65),
            Self::new("woman.png", "bedroom.png", "child_bedroom.png", 0.65),
        ]
    }

    pub fn run(&self) -> Result<()> {
        compose_files(
            &self.avatar,
            &self.background,
            &self.output,
            &Layout::bottom(self.scale, DEFAULT_BOTTOM_PADDING),
        )
    }
}

impl BakeOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run every job in order and collect one outcome per job.
pub fn bake(jobs: &[BakeJob]) -> Vec<BakeOutcome> {
    jobs.iter()
        .map(|job| {
            let result = job.run();
            match &result {
                Ok(_) => log::info!("Created {}", job.output.display()),
                Err(e) => log::warn!("Error creating {}: {e}", job.output.display()),
            }

            BakeOutcome {
                output: job.output.clone(),
                result,
            }
        })
        .collect()
}

fn scale_default() -> f64 {
    0.85
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_bake_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(10, 20, Rgba([255, 0, 0, 255]))
            .save(dir.path().join("woman.png"))
            .unwrap();
        RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]))
            .save(dir.path().join("bedroom.png"))
            .unwrap();

        let jobs: Vec<BakeJob> = BakeJob::defaults()
            .iter()
            .map(|job| job.rooted_at(dir.path()))
            .collect();
        let outcomes = bake(&jobs);

        assert_eq!(outcomes.len(), 5);

        let created: Vec<_> = outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.output.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(created, vec!["woman_bedroom.png", "child_bedroom.png"]);

        for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
            assert!(matches!(outcome.result, Err(Error::SourceNotFound(_))));
            assert!(!outcome.output.exists());
        }

        assert!(dir.path().join("woman_bedroom.png").exists());
        assert!(dir.path().join("child_bedroom.png").exists());
    }

    #[test]
    fn test_bake_job_scale_default() {
        let job: BakeJob = toml::from_str(
            r#"
            avatar = "a.png"
            background = "b.png"
            output = "c.png"
            "#,
        )
        .unwrap();

        assert_eq!(job.scale, 0.85);
        assert_eq!(job.output, PathBuf::from("c.png"));
    }
}
