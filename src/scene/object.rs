use crate::color::{Color, WHITE};
use crate::error::RenderError;
use crate::math::{self, Mat4, Vec3};

/// How a polygon's final color is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadeMode {
    /// Base color is used as is (emissive).
    #[default]
    Constant,
    /// One lit color per polygon.
    Flat,
    /// Lit per vertex, interpolated by the rasterizer.
    Gouraud,
}

/// Which vertex pool was last brought up to date this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransformStage {
    Local,
    World,
    Camera,
}

/// A face referencing 3 or 4 vertices of its owning [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub indices: [usize; 4],
    pub vertex_count: usize,
    /// Unnormalized face normal in local space.
    pub normal: Vec3,
    pub color: Color,
    /// Lit color per vertex. Flat and constant shading only read slot 0.
    pub shades: [Color; 4],
    pub shading: ShadeMode,
    pub active: bool,
    pub visible: bool,
    pub clipped: bool,
    pub two_sided: bool,
}

impl Polygon {
    pub fn new(indices: &[usize], color: Color) -> Result<Polygon, RenderError> {
        if indices.len() != 3 && indices.len() != 4 {
            return Err(RenderError::InvalidPolygon(format!(
                "{} vertices, expected 3 or 4",
                indices.len()
            )));
        }
        let mut slots = [0; 4];
        slots[..indices.len()].copy_from_slice(indices);
        return Ok(Polygon {
            indices: slots,
            vertex_count: indices.len(),
            normal: Vec3::zeros(),
            color,
            shades: [color; 4],
            shading: ShadeMode::Constant,
            active: true,
            visible: true,
            clipped: false,
            two_sided: false,
        });
    }

    pub fn with_shading(mut self, shading: ShadeMode) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_two_sided(mut self, two_sided: bool) -> Self {
        self.two_sided = two_sided;
        self
    }

    /// Vertex indices actually in use.
    pub fn vertices(&self) -> &[usize] {
        return &self.indices[..self.vertex_count];
    }

    /// Whether later stages should still process this polygon.
    pub fn is_renderable(&self) -> bool {
        return self.active && self.visible && !self.clipped;
    }

    /// Clears per-frame visibility state.
    pub fn reset_flags(&mut self) {
        self.visible = self.active;
        self.clipped = false;
    }
}

/// Polygonal object with parallel local/world/camera vertex pools.
#[derive(Debug, Clone)]
pub struct Object {
    pub id: usize,
    pub name: String,
    pub active: bool,
    pub local: Vec<Vec3>,
    pub world: Vec<Vec3>,
    pub camera: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
    /// Max distance from the local origin to any vertex.
    pub bounding_radius: f32,
    pub world_position: Vec3,
    /// Units per second, applied by [`Object::update`].
    pub velocity: Vec3,
    /// Radians per second about x, y and z.
    pub spin: Vec3,
    stage: TransformStage,
    /// Pipeline frame whose camera the camera pool was built for.
    camera_frame: u64,
    max_vertices: usize,
    max_polygons: usize,
}

impl Object {
    /// Empty object whose pools can hold at most the given number of elements.
    /// The pools grow on insert, so the limits may come straight from a file header.
    pub fn new(name: &str, max_vertices: usize, max_polygons: usize) -> Object {
        return Object {
            id: 0,
            name: name.to_string(),
            active: true,
            local: Vec::new(),
            world: Vec::new(),
            camera: Vec::new(),
            polygons: Vec::new(),
            bounding_radius: 0.0,
            world_position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            spin: Vec3::zeros(),
            stage: TransformStage::Local,
            camera_frame: 0,
            max_vertices,
            max_polygons,
        };
    }

    pub fn max_vertices(&self) -> usize {
        return self.max_vertices;
    }

    pub fn max_polygons(&self) -> usize {
        return self.max_polygons;
    }

    pub fn stage(&self) -> TransformStage {
        return self.stage;
    }

    pub(crate) fn set_stage(&mut self, stage: TransformStage) {
        self.stage = stage;
    }

    pub(crate) fn set_camera_frame(&mut self, frame: u64) {
        self.camera_frame = frame;
    }

    /// Whether the camera pool was built during `frame`.
    pub fn is_current(&self, frame: u64) -> bool {
        return self.stage == TransformStage::Camera && self.camera_frame == frame;
    }

    /// Marks world and camera pools as out of date.
    pub fn invalidate(&mut self) {
        self.stage = TransformStage::Local;
    }

    pub fn add_vertex(&mut self, v: Vec3) -> Result<usize, RenderError> {
        if self.local.len() >= self.max_vertices {
            log::error!("object '{}' is out of vertex slots", self.name);
            return Err(RenderError::CapacityExceeded {
                what: "object vertex",
                capacity: self.max_vertices,
            });
        }
        self.local.push(v);
        self.world.push(v);
        self.camera.push(v);
        self.invalidate();
        return Ok(self.local.len() - 1);
    }

    pub fn add_polygon(&mut self, polygon: Polygon) -> Result<usize, RenderError> {
        if let Some(&bad) = polygon.vertices().iter().find(|&&i| i >= self.local.len()) {
            return Err(RenderError::InvalidPolygon(format!(
                "vertex index {bad} out of range for '{}' with {} vertices",
                self.name,
                self.local.len()
            )));
        }
        if self.polygons.len() >= self.max_polygons {
            log::error!("object '{}' is out of polygon slots", self.name);
            return Err(RenderError::CapacityExceeded {
                what: "object polygon",
                capacity: self.max_polygons,
            });
        }
        let mut polygon = polygon;
        polygon.normal = self.face_normal(&polygon);
        self.polygons.push(polygon);
        return Ok(self.polygons.len() - 1);
    }

    fn face_normal(&self, polygon: &Polygon) -> Vec3 {
        let v = polygon.vertices();
        return math::surface_normal(&self.local[v[0]], &self.local[v[1]], &self.local[v[2]]);
    }

    /// Recomputes every polygon normal from the local pool.
    pub fn compute_normals(&mut self) {
        for i in 0..self.polygons.len() {
            self.polygons[i].normal = self.face_normal(&self.polygons[i]);
        }
    }

    /// Recomputes and stores the bounding radius.
    pub fn compute_bounding_radius(&mut self) -> f32 {
        self.bounding_radius = self
            .local
            .iter()
            .map(math::length)
            .fold(0.0, f32::max);
        return self.bounding_radius;
    }

    /// Applies a linear transform (rotation, scale) to the local pool.
    pub fn transform_local(&mut self, m: &Mat4) {
        for v in self.local.iter_mut() {
            *v = math::transform_direction(v, m);
        }
        self.compute_normals();
        self.compute_bounding_radius();
        self.invalidate();
    }

    pub fn rotate(&mut self, angles: &Vec3) {
        self.transform_local(&math::rotation_xyz(angles));
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.world_position = position;
        self.invalidate();
    }

    /// Advances position by velocity and orientation by spin.
    pub fn update(&mut self, dt: f32) {
        if self.velocity != Vec3::zeros() {
            self.set_position(self.world_position + self.velocity * dt);
        }
        if self.spin != Vec3::zeros() {
            self.rotate(&(self.spin * dt));
        }
    }

    /// Appends a reversed-winding copy of every two-sided polygon.
    ///
    /// Both halves become one-sided so each side gets its own normal for
    /// lighting and backface removal. Returns the number of polygons added.
    pub fn mirror_two_sided(&mut self) -> Result<usize, RenderError> {
        let two_sided: Vec<usize> = (0..self.polygons.len())
            .filter(|&i| self.polygons[i].two_sided)
            .collect();
        if self.polygons.len() + two_sided.len() > self.max_polygons {
            log::error!(
                "mirroring {} two-sided polygons of '{}' needs more polygon slots",
                two_sided.len(),
                self.name
            );
            return Err(RenderError::CapacityExceeded {
                what: "object polygon",
                capacity: self.max_polygons,
            });
        }

        for &i in two_sided.iter() {
            let original = &mut self.polygons[i];
            original.two_sided = false;
            let mut mirrored = original.clone();
            let n = mirrored.vertex_count;
            mirrored.indices[..n].reverse();
            mirrored.shades[..n].reverse();
            mirrored.normal = -original.normal;
            self.polygons.push(mirrored);
        }
        return Ok(two_sided.len());
    }

    /// Axis-aligned unit cube (half extent `size`) with outward clockwise quads.
    pub fn cube(name: &str, size: f32, color: Color) -> Result<Object, RenderError> {
        let mut object = Object::new(name, 8, 12);
        for (x, y, z) in [
            (-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0),
            (-1.0, -1.0, 1.0),  (1.0, -1.0, 1.0),  (1.0, 1.0, 1.0),  (-1.0, 1.0, 1.0),
        ] {
            object.add_vertex(Vec3::new(x, y, z) * size)?;
        }
        for face in [
            [0, 3, 2, 1], // -z
            [4, 5, 6, 7], // +z
            [4, 7, 3, 0], // -x
            [1, 2, 6, 5], // +x
            [3, 7, 6, 2], // +y
            [0, 1, 5, 4], // -y
        ] {
            object.add_polygon(Polygon::new(&face, color)?.with_shading(ShadeMode::Flat))?;
        }
        object.compute_bounding_radius();
        return Ok(object);
    }
}

/// White flat-shaded polygon, the shape most loaders start from.
pub fn default_polygon(indices: &[usize]) -> Result<Polygon, RenderError> {
    return Ok(Polygon::new(indices, WHITE)?.with_shading(ShadeMode::Flat));
}
