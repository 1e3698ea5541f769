// ── Status categories ──
//
// The four independently classified device subsystems, plus a small
// fixed-shape container for carrying one value per category.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A device subsystem with its own status code table.
///
/// Parsing is case-insensitive; anything outside the closed set is an
/// error rather than a silent fallback.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Camera,
    Hdmi,
    Ac,
    Dc,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Camera, Self::Hdmi, Self::Ac, Self::Dc];
}

/// One `T` per [`Category`], addressable by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerCategory<T> {
    pub camera: T,
    pub hdmi: T,
    pub ac: T,
    pub dc: T,
}

impl<T> PerCategory<T> {
    /// Build by calling `f` once per category.
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            camera: f(Category::Camera),
            hdmi: f(Category::Hdmi),
            ac: f(Category::Ac),
            dc: f(Category::Dc),
        }
    }

    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Camera => &self.camera,
            Category::Hdmi => &self.hdmi,
            Category::Ac => &self.ac,
            Category::Dc => &self.dc,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Camera => &mut self.camera,
            Category::Hdmi => &mut self.hdmi,
            Category::Ac => &mut self.ac,
            Category::Dc => &mut self.dc,
        }
    }

    /// `(category, &value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}
