//! File configuration and scene generation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use lumen_bvh::BuildSettings;
use lumen_geom::{shapes::Sphere, Hitable, MaterialRef};
use lumen_math::Point3;
use serde::{Deserialize, Serialize};

/// Contents of a `lumen.toml` file. Every table and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hierarchy construction parameters.
    pub build: BuildSettings,
    /// Generated test scene.
    pub scene: SceneConfig,
}

/// A grid of equal spheres: `grid x grid` per layer, `layers` deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Spheres along X and Y.
    pub grid: usize,
    /// Number of layers along Z.
    pub layers: usize,
    /// Distance between neighbouring centers.
    pub spacing: f64,
    /// Sphere radius.
    pub radius: f64,
    /// Z coordinate of the first layer.
    pub depth: f64,
    /// Hierarchy fan-out, 4 or 8.
    pub fan_out: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid: 100,
            layers: 1,
            spacing: 0.5,
            radius: 0.2,
            depth: -50.0,
            fan_out: 8,
        }
    }
}

impl Config {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the library does not check itself.
    pub fn validate(&self) -> Result<()> {
        self.build.validate()?;
        let scene = &self.scene;
        if scene.fan_out != 4 && scene.fan_out != 8 {
            bail!("fan_out must be 4 or 8, got {}", scene.fan_out);
        }
        if scene.grid == 0 || scene.layers == 0 {
            bail!("scene must contain at least one sphere");
        }
        if scene.radius <= 0.0 || scene.spacing <= 0.0 {
            bail!("radius and spacing must be positive");
        }
        Ok(())
    }
}

impl SceneConfig {
    /// Number of spheres the scene generates.
    pub fn sphere_count(&self) -> usize {
        self.grid * self.grid * self.layers
    }

    /// Generate the spheres, row-major within each layer.
    pub fn spheres(&self) -> Vec<Arc<dyn Hitable>> {
        let per_layer = self.grid * self.grid;
        (0..self.sphere_count())
            .map(|i| {
                let center = Point3::new(
                    (i % self.grid) as f64 * self.spacing,
                    ((i / self.grid) % self.grid) as f64 * self.spacing,
                    self.depth + (i / per_layer) as f64 * self.spacing,
                );
                Arc::new(Sphere::new(center, self.radius, MaterialRef::new(i as u32)))
                    as Arc<dyn Hitable>
            })
            .collect()
    }
}
