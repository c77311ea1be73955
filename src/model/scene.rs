//! Data-driven scene description.
//!
//! Every decorative object is one manifest entry: where its asset lives,
//! how it is placed and how it is shaded. The renderer turns entries into
//! proxy geometry; nothing here affects locomotion.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{self, Result, WalkthroughError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Rotation about +Y in radians.
    #[serde(default)]
    pub rotation_y: f32,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Transform {
    pub fn matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_scale_rotation_translation(
            glam::Vec3::from(self.scale),
            glam::Quat::from_rotation_y(self.rotation_y),
            glam::Vec3::from(self.position),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Flat colour, linear RGB.
    #[serde(default = "default_color")]
    pub color: [f32; 3],
    /// Optional texture; its average colour tints the proxy when it loads.
    #[serde(default)]
    pub texture: Option<String>,
}

fn default_color() -> [f32; 3] {
    [0.7, 0.7, 0.7]
}

impl Default for Material {
    fn default() -> Self {
        Self { color: default_color(), texture: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// Mesh asset path. Meshes are not parsed; the object renders as a proxy.
    pub asset: String,
    pub transform: Transform,
    #[serde(default)]
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Position of the light; it shines toward the origin.
    pub position: [f32; 3],
    pub intensity: f32,
    pub ambient: f32,
}

impl DirectionalLight {
    /// Unit vector pointing from the scene toward the light.
    pub fn direction(&self) -> glam::Vec3 {
        glam::Vec3::from(self.position).normalize_or_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ground {
    pub height: f32,
    /// Half width of the square ground plane.
    pub extent: f32,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneManifest {
    pub background: [f32; 3],
    pub light: DirectionalLight,
    #[serde(default)]
    pub ground: Option<Ground>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

fn object(name: &str, asset: &str, position: [f32; 3], scale: f32, rotation_y: f32, color: [f32; 3]) -> SceneObject {
    SceneObject {
        name: name.to_string(),
        asset: asset.to_string(),
        transform: Transform { position, scale: [scale; 3], rotation_y },
        material: Material { color, texture: None },
    }
}

impl Default for SceneManifest {
    fn default() -> Self {
        let mut windmill = object("windmill", "models/windmillModel.json", [-90.0, 15.0, 0.0], 9.0, 0.0, [0.62, 0.52, 0.4]);
        windmill.material.texture = Some("textures/windmill_001_base_COL.jpg".to_string());

        let mut lake = object("lake", "models/lakeModel.json", [100.0, -40.0, -110.0], 1.0, 0.0, [0.2, 0.4, 0.65]);
        lake.transform.scale = [1.1, 1.5, 1.5];

        Self {
            background: [0.094, 0.094, 0.094],
            light: DirectionalLight { position: [-20.0, 20.0, 20.0], intensity: 1.0, ambient: 0.3 },
            ground: Some(Ground { height: -40.0, extent: 400.0, color: [0.25, 0.32, 0.2] }),
            objects: vec![
                windmill,
                object("book", "models/bookModel.json", [-70.0, -40.0, 20.0], 5.0, 0.0, [0.55, 0.3, 0.2]),
                lake,
                object("pier", "models/muelleModel.json", [130.0, -45.0, -160.0], 1.6, 7.0 * std::f32::consts::PI / 6.0, [0.45, 0.33, 0.22]),
                object("demon", "models/demonModel.json", [120.0, -16.5, -55.0], 1.5, 5.0 * std::f32::consts::PI / 4.0, [0.5, 0.12, 0.12]),
            ],
        }
    }
}

impl SceneManifest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)?;
        for obj in &manifest.objects {
            let t = &obj.transform;
            let finite = t.position.iter().chain(t.scale.iter()).all(|v| v.is_finite());
            if !finite || !t.rotation_y.is_finite() {
                return Err(WalkthroughError::InvalidConfig(format!(
                    "scene object '{}' has a non-finite transform",
                    obj.name
                )));
            }
        }
        Ok(manifest)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = error::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Load `path` if given; any failure falls back to the built-in scene.
    pub fn load_or_default(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(manifest) => {
                tracing::info!(%path, objects = manifest.objects.len(), "loaded scene manifest");
                manifest
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "scene manifest unavailable, using built-in scene");
                Self::default()
            }
        }
    }
}
