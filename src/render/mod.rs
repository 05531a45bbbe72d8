//! Per-domain managers that turn scene data into live engine objects.
//!
//! Every manager shares the session's [`Strand`](crate::strand::Strand) and
//! only touches the engine from units submitted to it.

mod camera_manager;
mod ground_manager;
pub mod ibl;
mod indirect_light_manager;
mod light_manager;
pub mod manipulator;
mod shape_manager;
mod skybox_manager;

pub use camera_manager::{
    CameraManager, GestureStep, ACTION_BEGIN_OR_UPDATE, ACTION_END, DEFAULT_OBJECT_POSITION,
};
pub use ground_manager::GroundManager;
pub use ibl::{decode_hdr, HdrLoader, IblPrefilter};
pub use indirect_light_manager::{IndirectLightManager, IndirectLightSlot};
pub use light_manager::LightManager;
pub use manipulator::{Manipulator, ManipulatorBuilder, ManipulatorConfig};
pub use shape_manager::ShapeManager;
pub use skybox_manager::SkyboxManager;
