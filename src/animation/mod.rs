mod batch;
mod camera;

pub use batch::{Animator, CameraRequest};
pub use camera::Camera;
