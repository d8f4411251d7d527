use crate::math::{self, Mat4, Vec3, EPSILON};

pub const DEFAULT_NEAR_Z: f32 = 1.0;
pub const DEFAULT_FAR_Z: f32 = 1000.0;

/// Pinhole camera: placement, depth range and the perspective mapping onto the viewport.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub near_z: f32,
    pub far_z: f32,
    /// Distance to the view plane in pixels.
    pub viewing_distance: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Pixel aspect correction applied to projected y.
    pub aspect: f32,
    view: Mat4,
}

impl Camera {
    /// Camera at the origin looking down +z, viewing distance derived from the horizontal field of view.
    pub fn new(width: u32, height: u32, fov_degrees: f32) -> Camera {
        let half_fov = (fov_degrees.clamp(1.0, 179.0) * 0.5).to_radians();
        let viewing_distance = (width as f32 * 0.5) / half_fov.tan();
        let mut camera = Camera {
            position: Vec3::zeros(),
            target: Vec3::z(),
            up: Vec3::y(),
            near_z: DEFAULT_NEAR_Z,
            far_z: DEFAULT_FAR_Z,
            viewing_distance,
            viewport_width: width as f32,
            viewport_height: height as f32,
            aspect: 1.0,
            view: Mat4::identity(),
        };
        camera.update_view();
        return camera;
    }

    pub fn with_viewing_distance(mut self, viewing_distance: f32) -> Self {
        self.viewing_distance = viewing_distance;
        self
    }

    pub fn with_depth_range(mut self, near_z: f32, far_z: f32) -> Self {
        self.near_z = near_z;
        self.far_z = far_z;
        self
    }

    /// Places the camera and rebuilds its view matrix.
    pub fn look(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.position = position;
        self.target = target;
        self.up = up;
        self.update_view();
    }

    /// Recomputes the world-to-camera matrix after `position`/`target`/`up` changed.
    pub fn update_view(&mut self) {
        self.view = math::look_at(&self.position, &self.target, &self.up);
    }

    /// World-to-camera matrix.
    pub fn view_matrix(&self) -> &Mat4 {
        return &self.view;
    }

    /// Camera-to-world matrix.
    pub fn camera_matrix(&self) -> Mat4 {
        return math::point_at(&self.position, &self.target, &self.up);
    }

    /// Half width and half height of the view volume at camera depth `z`.
    pub fn frustum_half_extents(&self, z: f32) -> (f32, f32) {
        let half_w = 0.5 * self.viewport_width * z / self.viewing_distance;
        let half_h = 0.5 * self.viewport_height * z / (self.viewing_distance * self.aspect);
        return (half_w, half_h);
    }

    /// Perspective divide of a camera-space point onto the viewport.
    ///
    /// `None` for points at or behind the eye, so no non-finite coordinate
    /// ever reaches the rasterizer.
    pub fn project(&self, p: &Vec3) -> Option<(f32, f32)> {
        if p.z < EPSILON {
            return None;
        }
        let x = 0.5 * self.viewport_width + p.x * self.viewing_distance / p.z;
        let y = 0.5 * self.viewport_height + self.aspect * p.y * self.viewing_distance / p.z;
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        return Some((x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_degree_fov_puts_view_plane_at_half_width() {
        let camera = Camera::new(400, 300, 90.0);
        assert!((camera.viewing_distance - 200.0).abs() < 1e-3);
    }

    #[test]
    fn projection_centers_the_forward_axis() {
        let camera = Camera::new(400, 400, 90.0);
        let (x, y) = camera.project(&Vec3::new(0.0, 0.0, 10.0)).unwrap();
        assert_eq!((x, y), (200.0, 200.0));
        let (x, _) = camera.project(&Vec3::new(1.0, 0.0, 4.0)).unwrap();
        assert!((x - 250.0).abs() < 1e-3);
    }

    #[test]
    fn projection_rejects_points_behind_the_eye() {
        let camera = Camera::new(400, 400, 90.0);
        assert!(camera.project(&Vec3::new(1.0, 1.0, 0.0)).is_none());
        assert!(camera.project(&Vec3::new(1.0, 1.0, -3.0)).is_none());
    }

    #[test]
    fn frustum_edges_project_to_viewport_edges() {
        let camera = Camera::new(640, 480, 75.0);
        let z = 12.0;
        let (hw, hh) = camera.frustum_half_extents(z);
        let (x, y) = camera.project(&Vec3::new(hw, hh, z)).unwrap();
        assert!((x - 640.0).abs() < 1e-2);
        assert!((y - 480.0).abs() < 1e-2);
    }

    #[test]
    fn view_matrix_follows_look() {
        let mut camera = Camera::new(100, 100, 90.0);
        camera.look(Vec3::new(0.0, 0.0, -5.0), Vec3::zeros(), Vec3::y());
        let p = math::transform_point(&Vec3::zeros(), camera.view_matrix());
        assert!((p.z - 5.0).abs() < 1e-5);
        let round_trip = camera.camera_matrix() * camera.view_matrix();
        assert!((round_trip - Mat4::identity()).abs().max() < 1e-5);
    }
}
