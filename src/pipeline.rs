//! Per-frame geometry pipeline.
//!
//! Objects go through transform, cull, backface removal, the near/far test and
//! lighting one at a time, and their surviving polygons are copied into the
//! frame polygon list. Once every object is in, the list is clipped against the
//! near plane, optionally sorted, projected and rasterized.

pub mod clip;
pub mod cull;
pub mod lighting;
pub mod polylist;
pub mod transform;

use std::sync::{mpsc, Arc};

use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::color::BLACK;
use crate::error::RenderError;
use crate::raster::{self, FillMode, FrameBuffer, RasterVertex, ZBuffer};
use crate::scene::camera::Camera;
use crate::scene::light::{SceneResources, MAX_LIGHTS};
use crate::scene::object::{Object, ShadeMode};

pub use cull::{CullResult, FrustumMode};
pub use polylist::{Facet, FramePolyList, SortMode};

pub const DEFAULT_MAX_FACETS: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Planes used by the object bounding sphere test.
    pub cull_mode: FrustumMode,
    /// Planes used by the per-polygon outside test.
    pub clip_mode: FrustumMode,
    pub remove_backfaces: bool,
    pub sort_mode: SortMode,
    /// Frame polygon list capacity, including facets added by clipping.
    pub max_facets: usize,
    pub max_lights: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        return PipelineConfig {
            cull_mode: FrustumMode::Full,
            clip_mode: FrustumMode::Full,
            remove_backfaces: true,
            sort_mode: SortMode::None,
            max_facets: DEFAULT_MAX_FACETS,
            max_lights: MAX_LIGHTS,
        };
    }
}

/// Counters collected over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub objects_submitted: usize,
    pub objects_culled: usize,
    pub polygons_backfaced: usize,
    pub polygons_clipped: usize,
    pub polygons_lit: usize,
    pub facets_inserted: usize,
    pub facets_split: usize,
    pub facets_rejected: usize,
    pub facets_drawn: usize,
    pub triangles_rasterized: usize,
    pub pixels_written: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
    poly_list: FramePolyList,
    stats: FrameStats,
    frame: u64,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Pipeline {
        return Pipeline {
            config,
            poly_list: FramePolyList::new(config.max_facets),
            stats: FrameStats::default(),
            frame: 0,
        };
    }

    pub fn config(&self) -> &PipelineConfig {
        return &self.config;
    }

    pub fn poly_list(&self) -> &FramePolyList {
        return &self.poly_list;
    }

    pub fn stats(&self) -> FrameStats {
        return self.stats;
    }

    /// Number of the frame in progress. Camera pools built for any other frame are stale.
    pub fn frame(&self) -> u64 {
        return self.frame;
    }

    /// Empties the frame polygon list, zeroes the counters and starts a new frame.
    pub fn begin_frame(&mut self) {
        self.poly_list.reset();
        self.stats = FrameStats::default();
        self.frame = self.frame.wrapping_add(1);
    }

    /// Transform and cull for one object during `frame`. Touches nothing but
    /// the object, so it can run on any thread.
    pub fn prepare_object(object: &mut Object, camera: &Camera, mode: FrustumMode, frame: u64) -> Result<CullResult, RenderError> {
        transform::local_to_world(object);
        let result = cull::cull_object(object, camera, camera.view_matrix(), mode);
        if result == CullResult::Keep {
            transform::world_to_camera(object, camera.view_matrix())?;
            object.set_camera_frame(frame);
        }
        return Ok(result);
    }

    /// Runs every per-object stage and appends the surviving polygons to the frame list.
    /// Returns whether the object contributed to the frame.
    pub fn submit(&mut self, object: &mut Object, camera: &Camera, resources: &SceneResources) -> Result<bool, RenderError> {
        if !object.active {
            return Ok(false);
        }
        let cull = Pipeline::prepare_object(object, camera, self.config.cull_mode, self.frame)?;
        return self.emit(object, camera, resources, cull);
    }

    /// Per-object stages after [`Pipeline::prepare_object`]: backface removal,
    /// the near/far test, lighting and the frame list append. The object must
    /// have been prepared during the current frame.
    pub fn emit(
        &mut self,
        object: &mut Object,
        camera: &Camera,
        resources: &SceneResources,
        cull: CullResult,
    ) -> Result<bool, RenderError> {
        self.stats.objects_submitted += 1;
        if cull == CullResult::Cull {
            self.stats.objects_culled += 1;
            return Ok(false);
        }
        if !object.is_current(self.frame) {
            return Err(RenderError::StaleGeometry { object: object.name.clone() });
        }

        cull::reset_polygons(object);
        if self.config.remove_backfaces {
            self.stats.polygons_backfaced += cull::remove_backfaces(object);
        }
        self.stats.polygons_clipped += cull::clip_object(object, camera, self.config.clip_mode);
        self.stats.polygons_lit += lighting::light_object(object, resources);
        self.stats.facets_inserted += self.poly_list.insert_object(object)?;
        return Ok(true);
    }

    /// Clips, sorts, projects and rasterizes the frame polygon list.
    pub fn finish(&mut self, camera: &Camera, pixels: &mut FrameBuffer, zbuffer: &mut ZBuffer) -> Result<FrameStats, RenderError> {
        let clip_stats = clip::clip_polygons(&mut self.poly_list, camera.near_z)?;
        self.stats.facets_split += clip_stats.facets_added();
        self.stats.facets_rejected += clip_stats.rejected;
        self.poly_list.sort(self.config.sort_mode);

        for facet in self.poly_list.iter() {
            let mut points = [RasterVertex::new(0.0, 0.0, 0.0, BLACK); 4];
            let mut projected = 0;
            for (i, p) in facet.points().iter().enumerate() {
                match camera.project(p) {
                    Some((x, y)) => {
                        points[i] = RasterVertex::new(x, y, p.z, facet.shades[i]);
                        projected += 1;
                    }
                    None => break,
                }
            }
            if projected != facet.vertex_count {
                log::warn!("facet {:?} reached projection behind the eye, skipped", facet.source);
                continue;
            }

            let mode = match facet.shading {
                ShadeMode::Gouraud => FillMode::Gouraud,
                ShadeMode::Constant | ShadeMode::Flat => FillMode::Flat(facet.shades[0]),
            };
            let coverage = raster::draw_polygon(&points[..projected], mode, pixels, zbuffer);
            self.stats.pixels_written += coverage.pixels;
            self.stats.triangles_rasterized += coverage.triangles;
            self.stats.facets_drawn += 1;
        }

        log::debug!(
            "frame: {} objects ({} culled), {} backfaced, {} clipped, {} facets drawn, {} split, {} triangles",
            self.stats.objects_submitted,
            self.stats.objects_culled,
            self.stats.polygons_backfaced,
            self.stats.polygons_clipped,
            self.stats.facets_drawn,
            self.stats.facets_split,
            self.stats.triangles_rasterized,
        );
        return Ok(self.stats);
    }
}

/// Transform and cull of one object, tagged with its position in the input.
pub type Prepared = (usize, Object, Result<CullResult, RenderError>);

/// Runs [`Pipeline::prepare_object`] for every object on `pool` during `frame`.
///
/// Objects move into the jobs and come back over a channel. The result is
/// sorted by input position whatever order the jobs finish in. A job that
/// panics takes its object with it, which is reported as
/// [`RenderError::JobsLost`].
pub fn prepare_parallel(
    pool: &ThreadPool,
    objects: Vec<Object>,
    camera: &Camera,
    mode: FrustumMode,
    frame: u64,
) -> Result<Vec<Prepared>, RenderError> {
    let camera = camera.clone();
    return run_jobs(pool, objects, move |object| Pipeline::prepare_object(object, &camera, mode, frame));
}

fn run_jobs<F>(pool: &ThreadPool, objects: Vec<Object>, job: F) -> Result<Vec<Prepared>, RenderError>
where
    F: Fn(&mut Object) -> Result<CullResult, RenderError> + Send + Sync + 'static,
{
    let total = objects.len();
    let job = Arc::new(job);
    let (tx, rx) = mpsc::channel();
    for (index, mut object) in objects.into_iter().enumerate() {
        let tx = tx.clone();
        let job = Arc::clone(&job);
        pool.execute(move || {
            let result = job(&mut object);
            // Receiver only goes away if the caller is gone.
            let _ = tx.send((index, object, result));
        });
    }
    drop(tx);

    let mut prepared: Vec<Prepared> = rx.iter().collect();
    if prepared.len() != total {
        let lost = total - prepared.len();
        log::error!("{} of {} objects were lost by panicking transform jobs", lost, total);
        return Err(RenderError::JobsLost { lost, total });
    }
    prepared.sort_by_key(|(index, _, _)| *index);
    return Ok(prepared);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, WHITE};
    use crate::math::Vec3;
    use crate::scene::light::Light;
    use crate::scene::object::TransformStage;

    const W: u32 = 400;
    const H: u32 = 400;

    fn camera() -> Camera {
        let mut camera = Camera::new(W, H, 90.0);
        camera.look(Vec3::new(0.0, 0.0, -5.0), Vec3::zeros(), Vec3::y());
        return camera;
    }

    fn lit() -> SceneResources {
        let mut resources = SceneResources::default();
        resources.add_light(Light::ambient(WHITE)).unwrap();
        return resources;
    }

    fn buffers() -> (FrameBuffer, ZBuffer) {
        return (FrameBuffer::new(W, H), ZBuffer::new(W, H));
    }

    #[test]
    fn cube_renders_only_its_front_face() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let mut cube = Object::cube("cube", 1.0, Color::new(200, 100, 50)).unwrap();
        let camera = camera();
        let (mut fb, mut z) = buffers();

        pipeline.begin_frame();
        assert!(pipeline.submit(&mut cube, &camera, &lit()).unwrap());
        assert_eq!(pipeline.poly_list().len(), 1);
        let stats = pipeline.finish(&camera, &mut fb, &mut z).unwrap();

        assert_eq!(stats.polygons_backfaced, 5);
        assert_eq!(stats.facets_drawn, 1);
        assert_eq!(stats.triangles_rasterized, 2);
        // Front face at depth 4 spans 100 pixels around the center.
        assert_eq!(stats.pixels_written, 100 * 100);
        assert_eq!(z.get(200, 200), Some(4.0));
    }

    #[test]
    fn culled_objects_add_nothing() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        cube.set_position(Vec3::new(0.0, 0.0, 5000.0));
        pipeline.begin_frame();
        assert!(!pipeline.submit(&mut cube, &camera(), &lit()).unwrap());
        assert_eq!(pipeline.stats().objects_culled, 1);
        assert!(pipeline.poly_list().is_empty());

        cube.active = false;
        assert!(!pipeline.submit(&mut cube, &camera(), &lit()).unwrap());
        assert_eq!(pipeline.stats().objects_submitted, 1);
    }

    #[test]
    fn emit_refuses_untransformed_objects() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        let result = pipeline.emit(&mut cube, &camera(), &lit(), CullResult::Keep);
        assert!(matches!(result, Err(RenderError::StaleGeometry { .. })));
    }

    #[test]
    fn facet_capacity_overflow_is_reported() {
        let config = PipelineConfig { max_facets: 2, remove_backfaces: false, ..Default::default() };
        let mut pipeline = Pipeline::new(config);
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        pipeline.begin_frame();
        let result = pipeline.submit(&mut cube, &camera(), &lit());
        assert!(matches!(result, Err(RenderError::CapacityExceeded { what: "frame polygon", .. })));
    }

    #[test]
    fn begin_frame_resets_list_and_stats() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        let (mut fb, mut z) = buffers();
        pipeline.begin_frame();
        pipeline.submit(&mut cube, &camera(), &lit()).unwrap();
        pipeline.finish(&camera(), &mut fb, &mut z).unwrap();
        pipeline.begin_frame();
        assert!(pipeline.poly_list().is_empty());
        assert_eq!(pipeline.stats(), FrameStats::default());
    }

    #[test]
    fn parallel_preparation_keeps_object_order() {
        let pool = ThreadPool::new(3);
        let objects: Vec<Object> = (0..8)
            .map(|i| {
                let mut cube = Object::cube(&format!("cube{i}"), 1.0, WHITE).unwrap();
                cube.id = i;
                cube.set_position(Vec3::new(0.0, 0.0, if i % 2 == 0 { 0.0 } else { 5000.0 }));
                cube
            })
            .collect();
        let prepared = prepare_parallel(&pool, objects, &camera(), FrustumMode::Full, 1).unwrap();
        assert_eq!(prepared.len(), 8);
        for (i, (index, object, result)) in prepared.iter().enumerate() {
            assert_eq!(*index, i);
            assert_eq!(object.id, i);
            let expected = if i % 2 == 0 { CullResult::Keep } else { CullResult::Cull };
            assert_eq!(*result.as_ref().unwrap(), expected);
        }
        assert_eq!(prepared[0].1.stage(), TransformStage::Camera);
        assert!(prepared[0].1.is_current(1));
        assert_eq!(prepared[1].1.stage(), TransformStage::World);
    }

    #[test]
    fn panicking_jobs_are_reported() {
        let pool = ThreadPool::new(2);
        let objects: Vec<Object> = (0..4)
            .map(|i| Object::cube(&format!("cube{i}"), 1.0, WHITE).unwrap())
            .collect();
        let result = run_jobs(&pool, objects, |object| {
            if object.name == "cube2" {
                panic!("transform job failed");
            }
            return Ok(CullResult::Keep);
        });
        assert!(matches!(result, Err(RenderError::JobsLost { lost: 1, total: 4 })));
    }

    #[test]
    fn camera_pools_expire_with_the_frame() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        let mut camera = camera();
        pipeline.begin_frame();
        assert!(pipeline.submit(&mut cube, &camera, &lit()).unwrap());

        // Same pools, new frame and a camera that now sits on the other side.
        camera.look(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        pipeline.begin_frame();
        let result = pipeline.emit(&mut cube, &camera, &lit(), CullResult::Keep);
        assert!(matches!(result, Err(RenderError::StaleGeometry { .. })));
        assert!(pipeline.poly_list().is_empty());

        let cull = Pipeline::prepare_object(&mut cube, &camera, FrustumMode::Full, pipeline.frame()).unwrap();
        assert!(pipeline.emit(&mut cube, &camera, &lit(), cull).unwrap());
    }
}
