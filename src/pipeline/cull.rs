//! Object-level frustum culling, backface removal and the per-polygon near/far test.

use serde::{Deserialize, Serialize};

use crate::math::{self, Mat4, Vec3};
use crate::scene::camera::Camera;
use crate::scene::object::Object;

/// Which frustum planes a test considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrustumMode {
    /// Near and far planes only.
    Z,
    /// All six planes.
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullResult {
    Keep,
    Cull,
}

/// Tests the object's bounding sphere against the view frustum.
///
/// A sphere exactly tangent to a plane counts as inside and is kept.
pub fn cull_object(object: &Object, camera: &Camera, view: &Mat4, mode: FrustumMode) -> CullResult {
    let center = math::transform_point(&object.world_position, view);
    let radius = object.bounding_radius;

    if center.z - radius > camera.far_z || center.z + radius < camera.near_z {
        return CullResult::Cull;
    }
    if mode == FrustumMode::Z {
        return CullResult::Keep;
    }

    // Compare the sphere's extents against the frustum width at its own depth.
    let (half_w, half_h) = camera.frustum_half_extents(center.z);
    if center.x - radius > half_w || center.x + radius < -half_w {
        return CullResult::Cull;
    }
    if center.y - radius > half_h || center.y + radius < -half_h {
        return CullResult::Cull;
    }
    return CullResult::Keep;
}

/// Resets per-frame flags on every polygon.
pub fn reset_polygons(object: &mut Object) {
    for polygon in object.polygons.iter_mut() {
        polygon.reset_flags();
    }
}

/// Whether a one-sided face is oriented towards `viewpoint`.
pub fn faces_viewpoint(v0: &Vec3, v1: &Vec3, v2: &Vec3, viewpoint: &Vec3) -> bool {
    let normal = math::surface_normal(v0, v1, v2);
    let sight = viewpoint - v0;
    return normal.dot(&sight) > 0.0;
}

/// Hides one-sided polygons facing away from the eye. Works on the camera pool,
/// where the eye is the origin. Returns how many polygons were hidden.
pub fn remove_backfaces(object: &mut Object) -> usize {
    let eye = Vec3::zeros();
    let mut removed = 0;
    for polygon in object.polygons.iter_mut() {
        if !polygon.is_renderable() || polygon.two_sided {
            continue;
        }
        let v = polygon.vertices();
        let cam = &object.camera;
        if !faces_viewpoint(&cam[v[0]], &cam[v[1]], &cam[v[2]], &eye) {
            polygon.visible = false;
            removed += 1;
        }
    }
    return removed;
}

/// Marks polygons lying completely outside the frustum as clipped.
/// Returns how many polygons were clipped.
pub fn clip_object(object: &mut Object, camera: &Camera, mode: FrustumMode) -> usize {
    let mut clipped = 0;
    for polygon in object.polygons.iter_mut() {
        if !polygon.is_renderable() {
            continue;
        }
        let points: Vec<Vec3> = polygon.vertices().iter().map(|&i| object.camera[i]).collect();

        let mut outside = points.iter().all(|p| p.z > camera.far_z)
            || points.iter().all(|p| p.z < camera.near_z);

        if !outside && mode == FrustumMode::Full {
            // Each vertex is compared with the frustum width at its own depth.
            let extents: Vec<(f32, f32)> = points.iter().map(|p| camera.frustum_half_extents(p.z)).collect();
            outside = points.iter().zip(&extents).all(|(p, (hw, _))| p.x > *hw)
                || points.iter().zip(&extents).all(|(p, (hw, _))| p.x < -*hw)
                || points.iter().zip(&extents).all(|(p, (_, hh))| p.y > *hh)
                || points.iter().zip(&extents).all(|(p, (_, hh))| p.y < -*hh);
        }

        if outside {
            polygon.clipped = true;
            clipped += 1;
        }
    }
    return clipped;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;
    use crate::pipeline::transform::local_to_camera;
    use crate::scene::object::Polygon;

    fn camera() -> Camera {
        return Camera::new(400, 400, 90.0).with_depth_range(1.0, 100.0);
    }

    fn cube_at(position: Vec3) -> Object {
        let mut cube = Object::cube("cube", 1.0, WHITE).unwrap();
        cube.set_position(position);
        return cube;
    }

    #[test]
    fn sphere_beyond_far_plane_is_culled() {
        let cam = camera();
        let cube = cube_at(Vec3::new(0.0, 0.0, 150.0));
        assert_eq!(cull_object(&cube, &cam, cam.view_matrix(), FrustumMode::Z), CullResult::Cull);
    }

    #[test]
    fn sphere_straddling_depth_range_is_kept() {
        let cam = camera();
        let near = cube_at(Vec3::new(0.0, 0.0, 1.0));
        let far = cube_at(Vec3::new(0.0, 0.0, 100.5));
        assert_eq!(cull_object(&near, &cam, cam.view_matrix(), FrustumMode::Full), CullResult::Keep);
        assert_eq!(cull_object(&far, &cam, cam.view_matrix(), FrustumMode::Full), CullResult::Keep);
    }

    #[test]
    fn tangent_sphere_is_kept() {
        let cam = camera();
        let mut cube = cube_at(Vec3::new(0.0, 0.0, 102.0));
        cube.bounding_radius = 2.0;
        assert_eq!(cull_object(&cube, &cam, cam.view_matrix(), FrustumMode::Z), CullResult::Keep);
        cube.set_position(Vec3::new(0.0, 0.0, 102.5));
        assert_eq!(cull_object(&cube, &cam, cam.view_matrix(), FrustumMode::Z), CullResult::Cull);
    }

    #[test]
    fn sideways_objects_only_culled_in_full_mode() {
        let cam = camera();
        // At z = 10 the half width is 10.
        let cube = cube_at(Vec3::new(30.0, 0.0, 10.0));
        assert_eq!(cull_object(&cube, &cam, cam.view_matrix(), FrustumMode::Z), CullResult::Keep);
        assert_eq!(cull_object(&cube, &cam, cam.view_matrix(), FrustumMode::Full), CullResult::Cull);
        let above = cube_at(Vec3::new(0.0, -30.0, 10.0));
        assert_eq!(cull_object(&above, &cam, cam.view_matrix(), FrustumMode::Full), CullResult::Cull);
    }

    fn single_triangle(points: [Vec3; 3], two_sided: bool) -> Object {
        let mut object = Object::new("tri", 3, 1);
        for p in points {
            object.add_vertex(p).unwrap();
        }
        let polygon = Polygon::new(&[0, 1, 2], WHITE).unwrap().with_two_sided(two_sided);
        object.add_polygon(polygon).unwrap();
        return object;
    }

    #[test]
    fn backface_removal_follows_orientation() {
        let facing = [Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 1.0, 5.0), Vec3::new(1.0, 0.0, 5.0)];
        let away = [facing[0], facing[2], facing[1]];

        let mut object = single_triangle(facing, false);
        local_to_camera(&mut object, &Mat4::identity()).unwrap();
        assert_eq!(remove_backfaces(&mut object), 0);
        assert!(object.polygons[0].visible);

        let mut object = single_triangle(away, false);
        local_to_camera(&mut object, &Mat4::identity()).unwrap();
        assert_eq!(remove_backfaces(&mut object), 1);
        assert!(!object.polygons[0].visible);

        let mut object = single_triangle(away, true);
        local_to_camera(&mut object, &Mat4::identity()).unwrap();
        assert_eq!(remove_backfaces(&mut object), 0);
        assert!(object.polygons[0].visible);
    }

    #[test]
    fn cube_seen_head_on_shows_one_face() {
        let mut cam = camera();
        cam.look(Vec3::new(0.0, 0.0, -5.0), Vec3::zeros(), Vec3::y());
        let mut cube = cube_at(Vec3::zeros());
        local_to_camera(&mut cube, cam.view_matrix()).unwrap();
        assert_eq!(remove_backfaces(&mut cube), 5);
        assert!(cube.polygons[0].visible);
    }

    #[test]
    fn polygons_behind_near_plane_are_clipped() {
        let cam = camera();
        let behind = [Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 1.0, 0.5), Vec3::new(1.0, 0.0, 0.5)];
        let mut object = single_triangle(behind, false);
        local_to_camera(&mut object, cam.view_matrix()).unwrap();
        assert_eq!(clip_object(&mut object, &cam, FrustumMode::Z), 1);
        assert!(object.polygons[0].clipped);
        assert!(!object.polygons[0].is_renderable());

        reset_polygons(&mut object);
        assert!(!object.polygons[0].clipped);
    }

    #[test]
    fn straddling_polygons_survive_the_clip_test() {
        let cam = camera();
        let straddle = [Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 1.0, 2.0), Vec3::new(1.0, 0.0, 3.0)];
        let mut object = single_triangle(straddle, false);
        local_to_camera(&mut object, cam.view_matrix()).unwrap();
        assert_eq!(clip_object(&mut object, &cam, FrustumMode::Full), 0);
    }

    #[test]
    fn full_mode_rejects_polygons_off_to_one_side() {
        let cam = camera();
        let off = [Vec3::new(20.0, 0.0, 5.0), Vec3::new(20.0, 1.0, 5.0), Vec3::new(21.0, 0.0, 5.0)];
        let mut object = single_triangle(off, false);
        local_to_camera(&mut object, cam.view_matrix()).unwrap();
        assert_eq!(clip_object(&mut object, &cam, FrustumMode::Z), 0);
        assert_eq!(clip_object(&mut object, &cam, FrustumMode::Full), 1);
    }
}
