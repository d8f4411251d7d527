use serde::{Deserialize, Serialize};

use crate::color::{Color, BLACK};
use crate::error::RenderError;
use crate::math::{self, Vec3};

pub const MAX_LIGHTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Ambient,
    /// Directional light at infinity.
    Infinite,
    Point,
    /// Directional light attenuated by distance to its position.
    SpotlightSimple,
    /// Cone light with a power falloff away from its axis.
    SpotlightComplex,
}

/// Light source. Positions and directions are in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub on: bool,
    pub kind: LightKind,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub position: Vec3,
    /// Unit direction the light travels in.
    pub direction: Vec3,
    pub kc: f32,
    pub kl: f32,
    pub kq: f32,
    /// Full cone angles in degrees. Inside the inner cone a complex spotlight
    /// is at full strength, past the outer cone it is off. An outer angle of 0
    /// disables the cutoff.
    pub spot_inner: f32,
    pub spot_outer: f32,
    /// Falloff exponent between the inner and outer cone. 0 gives a hard edge.
    pub power: u32,
}

impl Light {
    fn base(kind: LightKind) -> Light {
        return Light {
            on: true,
            kind,
            ambient: BLACK,
            diffuse: BLACK,
            specular: BLACK,
            position: Vec3::zeros(),
            direction: Vec3::z(),
            kc: 1.0,
            kl: 0.0,
            kq: 0.0,
            spot_inner: 0.0,
            spot_outer: 0.0,
            power: 1,
        };
    }

    pub fn ambient(color: Color) -> Light {
        let mut light = Light::base(LightKind::Ambient);
        light.ambient = color;
        return light;
    }

    pub fn infinite(color: Color, direction: Vec3) -> Light {
        let mut light = Light::base(LightKind::Infinite);
        light.diffuse = color;
        light.direction = math::normalize(direction);
        return light;
    }

    pub fn point(color: Color, position: Vec3, kc: f32, kl: f32, kq: f32) -> Light {
        let mut light = Light::base(LightKind::Point);
        light.diffuse = color;
        light.position = position;
        light.kc = kc;
        light.kl = kl;
        light.kq = kq;
        return light;
    }

    pub fn spotlight(kind: LightKind, color: Color, position: Vec3, direction: Vec3) -> Light {
        let mut light = Light::base(kind);
        light.diffuse = color;
        light.position = position;
        light.direction = math::normalize(direction);
        return light;
    }

    pub fn with_attenuation(mut self, kc: f32, kl: f32, kq: f32) -> Self {
        self.kc = kc;
        self.kl = kl;
        self.kq = kq;
        self
    }

    pub fn with_cone(mut self, inner_degrees: f32, outer_degrees: f32, power: u32) -> Self {
        self.spot_inner = inner_degrees;
        self.spot_outer = outer_degrees;
        self.power = power;
        self
    }

    /// `kc + kl*d + kq*d^2`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        return self.kc + self.kl * distance + self.kq * distance * distance;
    }
}

/// Caller-owned lights and shading state handed to the lighting stage by reference.
#[derive(Debug, Clone)]
pub struct SceneResources {
    lights: Vec<Light>,
    max_lights: usize,
}

impl SceneResources {
    pub fn new(max_lights: usize) -> SceneResources {
        return SceneResources { lights: Vec::new(), max_lights };
    }

    /// Adds a light and returns its index.
    pub fn add_light(&mut self, light: Light) -> Result<usize, RenderError> {
        if self.lights.len() >= self.max_lights {
            log::error!("cannot add {:?} light, all {} slots used", light.kind, self.max_lights);
            return Err(RenderError::CapacityExceeded { what: "light", capacity: self.max_lights });
        }
        self.lights.push(light);
        return Ok(self.lights.len() - 1);
    }

    pub fn lights(&self) -> &[Light] {
        return &self.lights;
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        return self.lights.get_mut(index);
    }

    pub fn active_lights(&self) -> impl Iterator<Item = &Light> {
        return self.lights.iter().filter(|l| l.on);
    }
}

impl Default for SceneResources {
    fn default() -> Self {
        return SceneResources::new(MAX_LIGHTS);
    }
}
