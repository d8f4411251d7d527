use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::RenderError;
use crate::math::{self, Vec3};
use crate::scene::object::{Object, ShadeMode};

/// Frame-scoped copy of a polygon in camera space.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub vertices: [Vec3; 4],
    pub vertex_count: usize,
    pub normal: Vec3,
    pub color: Color,
    pub shades: [Color; 4],
    pub shading: ShadeMode,
    pub two_sided: bool,
    /// Cleared when clipping rejects the facet entirely.
    pub active: bool,
    /// Owning object id and polygon index, for diagnostics.
    pub source: (usize, usize),
}

impl Facet {
    pub fn triangle(vertices: [Vec3; 3], color: Color) -> Facet {
        let mut facet = Facet {
            vertices: [vertices[0], vertices[1], vertices[2], Vec3::zeros()],
            vertex_count: 3,
            normal: Vec3::zeros(),
            color,
            shades: [color; 4],
            shading: ShadeMode::Constant,
            two_sided: false,
            active: true,
            source: (0, 0),
        };
        facet.compute_normal();
        return facet;
    }

    pub fn points(&self) -> &[Vec3] {
        return &self.vertices[..self.vertex_count];
    }

    pub fn compute_normal(&mut self) {
        self.normal = math::surface_normal(&self.vertices[0], &self.vertices[1], &self.vertices[2]);
    }

    pub fn average_z(&self) -> f32 {
        return self.points().iter().map(|p| p.z).sum::<f32>() / self.vertex_count as f32;
    }

    pub fn near_z(&self) -> f32 {
        return self.points().iter().map(|p| p.z).fold(f32::INFINITY, f32::min);
    }

    pub fn far_z(&self) -> f32 {
        return self.points().iter().map(|p| p.z).fold(f32::NEG_INFINITY, f32::max);
    }
}

/// Draw order of the render list. Sorting only reorders the index view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    None,
    /// Front to back by average depth.
    AverageZ,
    /// Front to back by nearest vertex.
    NearZ,
    /// Front to back by farthest vertex.
    FarZ,
}

/// Append-only facet arena reused every frame, plus a reseatable index view into it.
#[derive(Debug)]
pub struct FramePolyList {
    storage: Vec<Facet>,
    order: Vec<usize>,
    count: usize,
    capacity: usize,
}

impl FramePolyList {
    pub fn new(capacity: usize) -> Self {
        return Self {
            storage: Vec::new(),
            order: Vec::new(),
            count: 0,
            capacity,
        };
    }

    /// Starts a new frame. Storage is kept and overwritten.
    pub fn reset(&mut self) {
        self.count = 0;
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        return self.count;
    }

    pub fn is_empty(&self) -> bool {
        return self.count == 0;
    }

    pub fn capacity(&self) -> usize {
        return self.capacity;
    }

    /// Appends a facet and returns its storage slot.
    pub fn push(&mut self, facet: Facet) -> Result<usize, RenderError> {
        if self.count >= self.capacity {
            log::error!("frame polygon list full at {} facets", self.capacity);
            return Err(RenderError::CapacityExceeded { what: "frame polygon", capacity: self.capacity });
        }
        let slot = self.count;
        if slot < self.storage.len() {
            self.storage[slot] = facet;
        } else {
            self.storage.push(facet);
        }
        self.order.push(slot);
        self.count += 1;
        return Ok(slot);
    }

    pub fn get(&self, slot: usize) -> Option<&Facet> {
        return self.storage[..self.count].get(slot);
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Facet> {
        return self.storage[..self.count].get_mut(slot);
    }

    /// Copies every renderable polygon of `object` into the list as a facet.
    /// Returns the number of facets added.
    pub fn insert_object(&mut self, object: &Object) -> Result<usize, RenderError> {
        let mut added = 0;
        for (index, polygon) in object.polygons.iter().enumerate() {
            if !polygon.is_renderable() {
                continue;
            }
            let mut vertices = [Vec3::zeros(); 4];
            for (slot, &i) in polygon.vertices().iter().enumerate() {
                vertices[slot] = object.camera[i];
            }
            let mut facet = Facet {
                vertices,
                vertex_count: polygon.vertex_count,
                normal: Vec3::zeros(),
                color: polygon.color,
                shades: polygon.shades,
                shading: polygon.shading,
                two_sided: polygon.two_sided,
                active: true,
                source: (object.id, index),
            };
            facet.compute_normal();
            self.push(facet)?;
            added += 1;
        }
        return Ok(added);
    }

    /// Active facets in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        return self.order.iter().map(|&slot| &self.storage[slot]).filter(|f| f.active);
    }

    pub fn sort(&mut self, mode: SortMode) {
        let storage = &self.storage;
        let key = |slot: &usize| -> f32 {
            let facet = &storage[*slot];
            match mode {
                SortMode::None => 0.0,
                SortMode::AverageZ => facet.average_z(),
                SortMode::NearZ => facet.near_z(),
                SortMode::FarZ => facet.far_z(),
            }
        };
        if mode != SortMode::None {
            self.order.sort_by(|a, b| key(a).total_cmp(&key(b)));
        }
    }
}
