use crate::error::RenderError;
use crate::math::{self, Mat4};
use crate::scene::object::{Object, TransformStage};

/// `world[i] = local[i] + world_position`.
pub fn local_to_world(object: &mut Object) {
    let position = object.world_position;
    for (world, local) in object.world.iter_mut().zip(object.local.iter()) {
        *world = local + position;
    }
    object.set_stage(TransformStage::World);
}

/// `camera[i] = world[i] * view`.
///
/// Fails when the world pool was not refreshed since the last change to the object.
pub fn world_to_camera(object: &mut Object, view: &Mat4) -> Result<(), RenderError> {
    if object.stage() < TransformStage::World {
        return Err(RenderError::StaleGeometry { object: object.name.clone() });
    }
    for (camera, world) in object.camera.iter_mut().zip(object.world.iter()) {
        *camera = math::transform_point(world, view);
    }
    object.set_stage(TransformStage::Camera);
    return Ok(());
}

/// Both transforms in order.
pub fn local_to_camera(object: &mut Object, view: &Mat4) -> Result<(), RenderError> {
    local_to_world(object);
    return world_to_camera(object, view);
}

/// Max length over the local vertices. Only needs rerunning when local geometry changes.
pub fn compute_bounding_radius(object: &mut Object) -> f32 {
    return object.compute_bounding_radius();
}
