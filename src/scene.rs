pub mod camera;
pub mod light;
pub mod mesh;
pub mod object;

use nalgebra::Vector2;
use threadpool::ThreadPool;

use crate::color::{Color, BLACK};
use crate::error::RenderError;
use crate::pipeline::{self, FrameStats, Pipeline};
use crate::raster::line::{self, OVERLAY_DEPTH};
use crate::raster::{FrameBuffer, ZBuffer};

use camera::Camera;
use light::SceneResources;
use object::Object;

pub type Vec2 = Vector2<f32>;

/// Single screen-space pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Point2D {
    pub position: Vec2,
    /// Pixels per second.
    pub velocity: Vec2,
    pub color: Color,
}

/// Screen-space outline, drawn with lines on top of the 3D scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2D {
    /// Vertices relative to `position`, unrotated.
    pub vertices: Vec<Vec2>,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Rotation in radians.
    pub angle: f32,
    pub angular_velocity: f32,
    pub color: Color,
}

impl Polygon2D {
    pub fn new(vertices: Vec<Vec2>, position: Vec2, color: Color) -> Polygon2D {
        return Polygon2D {
            vertices,
            position,
            velocity: Vec2::zeros(),
            angle: 0.0,
            angular_velocity: 0.0,
            color,
        };
    }

    /// Rotated and translated vertices, rounded to pixels.
    pub fn screen_points(&self) -> Vec<(i32, i32)> {
        let (sin, cos) = self.angle.sin_cos();
        return self
            .vertices
            .iter()
            .map(|v| {
                let x = v.x * cos - v.y * sin + self.position.x;
                let y = v.x * sin + v.y * cos + self.position.y;
                (x.round() as i32, y.round() as i32)
            })
            .collect();
    }
}

/// Everything a scene object may draw into during one frame.
pub struct DrawContext<'a> {
    pub pipeline: &'a mut Pipeline,
    pub camera: &'a Camera,
    pub resources: &'a SceneResources,
    pub pixels: &'a mut FrameBuffer,
    pub zbuffer: &'a mut ZBuffer,
}

/// The kinds of things a scene holds.
#[derive(Debug, Clone)]
pub enum SceneObject {
    Point(Point2D),
    Polygon2D(Polygon2D),
    Polygon3D(Object),
}

impl SceneObject {
    /// Advances motion by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        match self {
            SceneObject::Point(point) => {
                point.position += point.velocity * dt;
            }
            SceneObject::Polygon2D(polygon) => {
                polygon.position += polygon.velocity * dt;
                polygon.angle += polygon.angular_velocity * dt;
            }
            SceneObject::Polygon3D(object) => object.update(dt),
        }
    }

    /// 2D kinds draw straight into the buffers as overlays. 3D objects go
    /// through the pipeline and reach the buffers when the frame finishes.
    /// Returns whether anything was drawn or queued.
    pub fn draw(&mut self, ctx: &mut DrawContext) -> Result<bool, RenderError> {
        match self {
            SceneObject::Point(point) => Ok(line::draw_point(
                point.position.x.round() as i32,
                point.position.y.round() as i32,
                OVERLAY_DEPTH,
                point.color,
                ctx.pixels,
                ctx.zbuffer,
            )),
            SceneObject::Polygon2D(polygon) => {
                let points = polygon.screen_points();
                if points.len() < 2 {
                    return Ok(false);
                }
                let written = line::draw_outline(&points, OVERLAY_DEPTH, polygon.color, ctx.pixels, ctx.zbuffer);
                Ok(written > 0)
            }
            SceneObject::Polygon3D(object) => ctx.pipeline.submit(object, ctx.camera, ctx.resources),
        }
    }
}

pub struct Scene {
    pub camera: Camera,
    pub resources: SceneResources,
    pub objects: Vec<SceneObject>,
    pub background: Color,
}

impl Scene {
    pub fn new(camera: Camera, resources: SceneResources) -> Scene {
        return Scene { camera, resources, objects: Vec::new(), background: BLACK };
    }

    /// Adds an object and returns its index. 3D objects get that index as their id.
    pub fn add_object(&mut self, object: SceneObject) -> usize {
        let index = self.objects.len();
        let mut object = object;
        if let SceneObject::Polygon3D(o) = &mut object {
            o.id = index;
        }
        self.objects.push(object);
        return index;
    }

    pub fn update(&mut self, dt: f32) {
        for object in self.objects.iter_mut() {
            object.update(dt);
        }
    }

    fn clear(&self, pipeline: &mut Pipeline, pixels: &mut FrameBuffer, zbuffer: &mut ZBuffer) {
        pixels.clear(self.background);
        zbuffer.clear();
        pipeline.begin_frame();
    }

    /// Draws one frame on the calling thread.
    pub fn render(&mut self, pipeline: &mut Pipeline, pixels: &mut FrameBuffer, zbuffer: &mut ZBuffer) -> Result<FrameStats, RenderError> {
        self.clear(pipeline, pixels, zbuffer);
        let mut ctx = DrawContext {
            pipeline: &mut *pipeline,
            camera: &self.camera,
            resources: &self.resources,
            pixels: &mut *pixels,
            zbuffer: &mut *zbuffer,
        };
        for object in self.objects.iter_mut() {
            object.draw(&mut ctx)?;
        }
        return pipeline.finish(&self.camera, pixels, zbuffer);
    }

    /// Same frame as [`Scene::render`], with the transform and cull of 3D objects
    /// spread over `pool`. Everything after that runs in scene order on this thread.
    pub fn render_parallel(
        &mut self,
        pool: &ThreadPool,
        pipeline: &mut Pipeline,
        pixels: &mut FrameBuffer,
        zbuffer: &mut ZBuffer,
    ) -> Result<FrameStats, RenderError> {
        self.clear(pipeline, pixels, zbuffer);

        // Jobs get copies. The scene keeps its objects if a job panics.
        let mut slots = Vec::new();
        let mut jobs = Vec::new();
        for (slot, object) in self.objects.iter().enumerate() {
            if let SceneObject::Polygon3D(o) = object {
                if o.active {
                    slots.push(slot);
                    jobs.push(o.clone());
                }
            }
        }

        let prepared = pipeline::prepare_parallel(pool, jobs, &self.camera, pipeline.config().cull_mode, pipeline.frame())?;
        let mut culls = Vec::with_capacity(prepared.len());
        for (job, object, result) in prepared {
            let slot = slots[job];
            if let SceneObject::Polygon3D(o) = &mut self.objects[slot] {
                *o = object;
            }
            culls.push((slot, result));
        }

        let mut culls = culls.into_iter().peekable();
        let mut ctx = DrawContext {
            pipeline: &mut *pipeline,
            camera: &self.camera,
            resources: &self.resources,
            pixels: &mut *pixels,
            zbuffer: &mut *zbuffer,
        };
        for (slot, object) in self.objects.iter_mut().enumerate() {
            match object {
                SceneObject::Polygon3D(o) => {
                    if let Some((_, result)) = culls.next_if(|(s, _)| *s == slot) {
                        ctx.pipeline.emit(o, ctx.camera, ctx.resources, result?)?;
                    }
                }
                other => {
                    other.draw(&mut ctx)?;
                }
            }
        }
        return pipeline.finish(&self.camera, pixels, zbuffer);
    }
}
