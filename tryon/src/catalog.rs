//! Scene assets per demographic category, with the processing policy each
//! category is served with.
//!
//! A [`Catalog`] is built once at startup and never mutated afterwards.
//! Asset files are only checked when a request actually uses them.

use crate::{Result, TryOnError};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Femme,
    Homme,
    Enceinte,
    Enfant,
    Bebe,
}

impl Category {
    /// Parse a category tag such as `femme` or `Bebe`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        tag.trim()
            .parse()
            .map_err(|_| TryOnError::UnknownCategory(tag.to_string()))
    }

    /// Audience label shown by the shell.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Femme => "Femme",
            Self::Homme => "Homme",
            Self::Enceinte => "Enceinte (Pregnant)",
            Self::Enfant => "Enfant",
            Self::Bebe => "Bébé",
        }
    }
}

/// How a category's garments are turned into a result image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingPolicy {
    /// Garment and in-situ scene go to the remote synthesis API
    #[default]
    RemoteComposite,

    /// Garment is cut out locally and laid flat on the scene
    FlatLay,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryEntry {
    #[serde(default)]
    pub policy: ProcessingPolicy,

    /// Scene name -> asset path, in declaration order
    pub scenes: IndexMap<String, PathBuf>,
}

impl CategoryEntry {
    pub fn new(policy: ProcessingPolicy) -> Self {
        Self {
            policy,
            scenes: IndexMap::new(),
        }
    }

    pub fn with_scene(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.scenes.insert(name.into(), path.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    assets_dir: PathBuf,
    entries: IndexMap<Category, CategoryEntry>,
}

impl Catalog {
    /// Build a catalog; every category appears once and declares at least
    /// one scene.
    pub fn from_entries(
        assets_dir: impl Into<PathBuf>,
        entries: impl IntoIterator<Item = (Category, CategoryEntry)>,
    ) -> Result<Self> {
        let mut table = IndexMap::new();
        for (category, entry) in entries {
            if entry.scenes.is_empty() {
                return Err(TryOnError::EmptyCategory(category));
            }
            if table.insert(category, entry).is_some() {
                return Err(TryOnError::Config(format!(
                    "category {category} is declared more than once"
                )));
            }
        }

        Ok(Self {
            assets_dir: assets_dir.into(),
            entries: table,
        })
    }

    /// The stock scenes shipped with the application.
    pub fn builtin(assets_dir: impl Into<PathBuf>) -> Self {
        use ProcessingPolicy::{FlatLay, RemoteComposite};

        let rooms = |living_room: &str, bedroom: &str| {
            CategoryEntry::new(RemoteComposite)
                .with_scene("Living Room", living_room)
                .with_scene("Bedroom", bedroom)
        };

        Self {
            assets_dir: assets_dir.into(),
            entries: IndexMap::from([
                (
                    Category::Femme,
                    rooms("woman_living_room.png", "woman_bedroom.png"),
                ),
                (
                    Category::Homme,
                    rooms("man_living_room.png", "man_bedroom.png"),
                ),
                (
                    Category::Enceinte,
                    rooms("pregnant_living_room.png", "pregnant_bedroom.png"),
                ),
                (
                    Category::Enfant,
                    rooms("child_living_room.png", "child_bedroom.png"),
                ),
                (
                    Category::Bebe,
                    CategoryEntry::new(FlatLay)
                        .with_scene("Carpet", "baby_carpet.png")
                        .with_scene("Bed Cover", "baby_bedcover.png"),
                ),
            ]),
        }
    }

    /// Parse a catalog table keyed by category tag:
    ///
    /// ```toml
    /// [bebe]
    /// policy = "flat-lay"
    /// scenes = { "Carpet" = "baby_carpet.png" }
    /// ```
    pub fn from_toml_str(text: &str, assets_dir: impl Into<PathBuf>) -> Result<Self> {
        let table: IndexMap<String, CategoryEntry> =
            toml::from_str(text).map_err(|e| TryOnError::Config(e.to_string()))?;

        let entries = table
            .into_iter()
            .map(|(tag, entry)| Ok((Category::from_tag(&tag)?, entry)))
            .collect::<Result<Vec<_>>>()?;

        Self::from_entries(assets_dir, entries)
    }

    pub fn load(path: impl AsRef<Path>, assets_dir: impl Into<PathBuf>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TryOnError::Config(format!("read {} failed. {e}", path.display())))?;
        Self::from_toml_str(&text, assets_dir)
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.keys().copied()
    }

    pub fn policy_for(&self, category: Category) -> Option<ProcessingPolicy> {
        self.entries.get(&category).map(|e| e.policy)
    }

    pub fn has_policy(&self, policy: ProcessingPolicy) -> bool {
        self.entries.values().any(|e| e.policy == policy)
    }

    /// Scene names of `category`, empty when the category is not configured.
    pub fn scenes_for(&self, category: Category) -> Vec<&str> {
        self.entries
            .get(&category)
            .map(|e| e.scenes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn resolve(&self, category: Category, scene: &str) -> Result<PathBuf> {
        self.entries
            .get(&category)
            .and_then(|e| e.scenes.get(scene))
            .map(|path| self.assets_dir.join(path))
            .ok_or_else(|| TryOnError::UnknownAsset {
                category,
                scene: scene.to_string(),
            })
    }

    /// Uniformly random scene asset of `category`.
    pub fn resolve_random(&self, category: Category) -> Result<PathBuf> {
        self.resolve_random_with(category, &mut rand::rng())
    }

    pub fn resolve_random_with<R: Rng + ?Sized>(
        &self,
        category: Category,
        rng: &mut R,
    ) -> Result<PathBuf> {
        let scenes = match self.entries.get(&category) {
            Some(entry) if !entry.scenes.is_empty() => &entry.scenes,
            _ => return Err(TryOnError::NoAssetsForCategory(category)),
        };

        let index = rng.random_range(0..scenes.len());
        let (name, path) = scenes
            .get_index(index)
            .ok_or(TryOnError::NoAssetsForCategory(category))?;

        log::debug!("Picked scene '{name}' for {category}");
        Ok(self.assets_dir.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    fn two_scene_catalog() -> Catalog {
        Catalog::from_entries(
            "assets",
            [(
                Category::Femme,
                CategoryEntry::new(ProcessingPolicy::RemoteComposite)
                    .with_scene("A", "path_a.png")
                    .with_scene("B", "path_b.png"),
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_category_tags() {
        assert_eq!(Category::from_tag("femme").unwrap(), Category::Femme);
        assert_eq!(Category::from_tag(" Bebe ").unwrap(), Category::Bebe);
        assert_eq!(Category::Enceinte.to_string(), "enceinte");
        assert!(matches!(
            Category::from_tag("robot"),
            Err(TryOnError::UnknownCategory(tag)) if tag == "robot"
        ));
    }

    #[test]
    fn test_builtin_covers_every_category() {
        let catalog = Catalog::builtin("assets");

        for category in Category::iter() {
            let scenes = catalog.scenes_for(category);
            assert_eq!(scenes.len(), 2, "{category}");

            for scene in scenes {
                let path = catalog.resolve(category, scene).unwrap();
                assert!(path.starts_with("assets"));
            }
        }

        assert_eq!(
            catalog.scenes_for(Category::Bebe),
            vec!["Carpet", "Bed Cover"]
        );
        assert_eq!(
            catalog.policy_for(Category::Bebe),
            Some(ProcessingPolicy::FlatLay)
        );
        assert_eq!(
            catalog.policy_for(Category::Homme),
            Some(ProcessingPolicy::RemoteComposite)
        );
        assert!(catalog.has_policy(ProcessingPolicy::FlatLay));
    }

    #[test]
    fn test_resolve_known_scene() {
        let catalog = Catalog::builtin("/srv/assets");
        assert_eq!(
            catalog.resolve(Category::Femme, "Bedroom").unwrap(),
            PathBuf::from("/srv/assets/woman_bedroom.png")
        );
    }

    #[test]
    fn test_resolve_unknown_asset() {
        let catalog = two_scene_catalog();

        assert!(matches!(
            catalog.resolve(Category::Homme, "A"),
            Err(TryOnError::UnknownAsset { category: Category::Homme, .. })
        ));
        assert!(matches!(
            catalog.resolve(Category::Femme, "Garden"),
            Err(TryOnError::UnknownAsset { ref scene, .. }) if scene == "Garden"
        ));
    }

    #[test]
    fn test_scenes_for_unknown_category_is_empty() {
        let catalog = two_scene_catalog();
        assert!(catalog.scenes_for(Category::Enfant).is_empty());
        assert_eq!(catalog.scenes_for(Category::Femme), vec!["A", "B"]);
        assert_eq!(catalog.policy_for(Category::Enfant), None);
    }

    #[test]
    fn test_resolve_random_hits_every_scene() {
        let catalog = two_scene_catalog();

        let picked: HashSet<PathBuf> = (0..200)
            .map(|_| catalog.resolve_random(Category::Femme).unwrap())
            .collect();

        let expected: HashSet<PathBuf> = [
            PathBuf::from("assets/path_a.png"),
            PathBuf::from("assets/path_b.png"),
        ]
        .into_iter()
        .collect();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_resolve_random_without_scenes() {
        let catalog = two_scene_catalog();
        assert!(matches!(
            catalog.resolve_random(Category::Bebe),
            Err(TryOnError::NoAssetsForCategory(Category::Bebe))
        ));
    }

    #[test]
    fn test_empty_category_rejected() {
        let err = Catalog::from_entries(
            "assets",
            [(Category::Enfant, CategoryEntry::new(ProcessingPolicy::FlatLay))],
        )
        .unwrap_err();
        assert!(matches!(err, TryOnError::EmptyCategory(Category::Enfant)));
    }

    #[test]
    fn test_from_toml_str() {
        let catalog = Catalog::from_toml_str(
            r#"
            [homme]
            scenes = { "Office" = "man_office.png", "Garden" = "man_garden.png" }

            [bebe]
            policy = "flat-lay"
            scenes = { "Playmat" = "baby_playmat.png" }
            "#,
            "assets",
        )
        .unwrap();

        let categories: HashSet<Category> = catalog.categories().collect();
        assert_eq!(categories, HashSet::from([Category::Homme, Category::Bebe]));

        let mut scenes = catalog.scenes_for(Category::Homme);
        scenes.sort();
        assert_eq!(scenes, vec!["Garden", "Office"]);
        assert_eq!(
            catalog.policy_for(Category::Homme),
            Some(ProcessingPolicy::RemoteComposite)
        );
        assert_eq!(
            catalog.resolve(Category::Bebe, "Playmat").unwrap(),
            PathBuf::from("assets/baby_playmat.png")
        );
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let err = Catalog::from_toml_str(
            r#"
            [femme]
            scenes = { "Office" = "woman_office.png" }

            [Femme]
            scenes = { "Garden" = "woman_garden.png" }
            "#,
            "assets",
        )
        .unwrap_err();
        assert!(matches!(err, TryOnError::Config(ref msg) if msg.contains("femme")));

        let entry = CategoryEntry::new(ProcessingPolicy::RemoteComposite).with_scene("A", "a.png");
        assert!(matches!(
            Catalog::from_entries(
                "assets",
                [(Category::Homme, entry.clone()), (Category::Homme, entry)]
            ),
            Err(TryOnError::Config(_))
        ));
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_category() {
        let err = Catalog::from_toml_str(
            r#"
            [robot]
            scenes = { "Lab" = "lab.png" }
            "#,
            "assets",
        )
        .unwrap_err();
        assert!(matches!(err, TryOnError::UnknownCategory(_)));
    }
}
