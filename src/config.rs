//! JSON scene description.
//!
//! Every field has a default, so `{}` is a valid scene: a lit, spinning cube
//! in front of the camera.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{Color, WHITE};
use crate::error::RenderError;
use crate::math::Vec3;
use crate::pipeline::PipelineConfig;
use crate::scene::camera::{Camera, DEFAULT_FAR_Z, DEFAULT_NEAR_Z};
use crate::scene::light::{Light, LightKind, SceneResources};
use crate::scene::mesh;
use crate::scene::object::Object;
use crate::scene::{Scene, SceneObject};

fn vec3(v: [f32; 3]) -> Vec3 {
    return Vec3::new(v[0], v[1], v[2]);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub near_z: f32,
    pub far_z: f32,
    /// Horizontal field of view.
    pub fov_degrees: f32,
    /// Pixel aspect correction applied to projected y.
    pub aspect: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        return CameraConfig {
            position: [0.0, 0.0, -5.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            near_z: DEFAULT_NEAR_Z,
            far_z: DEFAULT_FAR_Z,
            fov_degrees: 90.0,
            aspect: 1.0,
        };
    }
}

impl CameraConfig {
    pub fn build(&self, width: u32, height: u32) -> Result<Camera, RenderError> {
        if !(self.near_z > 0.0 && self.far_z > self.near_z) {
            return Err(RenderError::Config(format!(
                "camera depth range {}..{} must be positive and increasing",
                self.near_z, self.far_z
            )));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(RenderError::Config(format!("field of view {} out of range", self.fov_degrees)));
        }
        let mut camera = Camera::new(width, height, self.fov_degrees).with_depth_range(self.near_z, self.far_z);
        camera.aspect = self.aspect;
        camera.look(vec3(self.position), vec3(self.target), vec3(self.up));
        return Ok(camera);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub kind: LightKind,
    pub on: bool,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub position: [f32; 3],
    /// Direction the light travels in, need not be unit length.
    pub direction: [f32; 3],
    pub kc: f32,
    pub kl: f32,
    pub kq: f32,
    pub spot_inner: f32,
    pub spot_outer: f32,
    /// Negative values are rejected when the file is parsed.
    pub power: u32,
}

impl Default for LightConfig {
    fn default() -> Self {
        return LightConfig {
            kind: LightKind::Ambient,
            on: true,
            ambient: WHITE,
            diffuse: WHITE,
            specular: Color::new(0, 0, 0),
            position: [0.0, 0.0, 0.0],
            direction: [0.0, 0.0, 1.0],
            kc: 1.0,
            kl: 0.0,
            kq: 0.0,
            spot_inner: 0.0,
            spot_outer: 0.0,
            power: 1,
        };
    }
}

impl LightConfig {
    pub fn build(&self) -> Light {
        let mut light = match self.kind {
            LightKind::Ambient => Light::ambient(self.ambient),
            LightKind::Infinite => Light::infinite(self.diffuse, vec3(self.direction)),
            LightKind::Point => Light::point(self.diffuse, vec3(self.position), self.kc, self.kl, self.kq),
            LightKind::SpotlightSimple | LightKind::SpotlightComplex => {
                Light::spotlight(self.kind, self.diffuse, vec3(self.position), vec3(self.direction))
                    .with_attenuation(self.kc, self.kl, self.kq)
                    .with_cone(self.spot_inner, self.spot_outer, self.power)
            }
        };
        light.on = self.on;
        light.specular = self.specular;
        return light;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    pub name: Option<String>,
    /// `.mesh` or `.obj` file, relative to the scene file. A cube when absent.
    pub mesh: Option<PathBuf>,
    /// Cube color. Meshes carry their own colors.
    pub color: Color,
    pub scale: f32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// Radians per second about x, y and z.
    pub spin: [f32; 3],
    pub mirror_two_sided: bool,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        return ObjectConfig {
            name: None,
            mesh: None,
            color: Color::new(200, 100, 50),
            scale: 1.0,
            position: [0.0, 0.0, 0.0],
            velocity: [0.0, 0.0, 0.0],
            spin: [0.0, 0.0, 0.0],
            mirror_two_sided: false,
        };
    }
}

impl ObjectConfig {
    pub fn build(&self, base_dir: &Path) -> Result<Object, RenderError> {
        if !(self.scale > 0.0) {
            return Err(RenderError::Config(format!("object scale {} must be positive", self.scale)));
        }
        let mut object = match &self.mesh {
            Some(path) => mesh::load_mesh(&base_dir.join(path), self.scale)?,
            None => Object::cube("cube", self.scale, self.color)?,
        };
        if let Some(name) = &self.name {
            object.name = name.clone();
        }
        if self.mirror_two_sided {
            object.mirror_two_sided()?;
        }
        object.set_position(vec3(self.position));
        object.velocity = vec3(self.velocity);
        object.spin = vec3(self.spin);
        return Ok(object);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub lights: Vec<LightConfig>,
    pub objects: Vec<ObjectConfig>,
    pub pipeline: PipelineConfig,
    pub background: Color,
    /// Directory mesh paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for SceneConfig {
    fn default() -> Self {
        return SceneConfig {
            camera: CameraConfig::default(),
            lights: vec![
                LightConfig { ambient: Color::new(64, 64, 64), ..Default::default() },
                LightConfig {
                    kind: LightKind::Infinite,
                    diffuse: Color::new(200, 200, 200),
                    direction: [0.5, -0.5, 1.0],
                    ..Default::default()
                },
            ],
            objects: vec![ObjectConfig { spin: [0.4, 0.8, 0.0], ..Default::default() }],
            pipeline: PipelineConfig::default(),
            background: Color::new(0, 0, 0),
            base_dir: PathBuf::from("."),
        };
    }
}

impl SceneConfig {
    pub fn from_json(text: &str) -> Result<SceneConfig, RenderError> {
        return Ok(serde_json::from_str(text)?);
    }

    /// Builds the scene for a `width` x `height` viewport.
    pub fn build(&self, width: u32, height: u32) -> Result<Scene, RenderError> {
        if self.pipeline.max_facets == 0 {
            return Err(RenderError::Config("pipeline.max_facets must be positive".to_string()));
        }
        let camera = self.camera.build(width, height)?;
        let mut resources = SceneResources::new(self.pipeline.max_lights);
        for light in &self.lights {
            resources.add_light(light.build())?;
        }
        let mut scene = Scene::new(camera, resources);
        scene.background = self.background;
        for object in &self.objects {
            scene.add_object(SceneObject::Polygon3D(object.build(&self.base_dir)?));
        }
        log::info!(
            "scene ready: {} objects, {} lights, {}x{} viewport",
            scene.objects.len(),
            scene.resources.lights().len(),
            width,
            height
        );
        return Ok(scene);
    }
}

/// Reads a scene file. Mesh paths inside it are relative to its directory.
pub fn load_scene_config(path: &Path) -> Result<SceneConfig, RenderError> {
    let text = fs::read_to_string(path).map_err(|source| RenderError::Io { path: path.to_path_buf(), source })?;
    let mut config = SceneConfig::from_json(&text)?;
    config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    log::info!("loaded scene config '{}'", path.display());
    return Ok(config);
}
