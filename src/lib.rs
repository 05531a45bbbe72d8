//! Scene synchronization and camera control for an embedded Filament view.
//!
//! A host hands over a JSON-like configuration blob once; the
//! [`SceneController`](app::SceneController) parses it into a
//! [`Scene`](scene::Scene) and drives the per-domain managers, which mutate
//! the engine only through the single engine strand.

pub mod app;
pub mod assets;
pub mod color;
pub mod engine;
pub mod error;
pub mod render;
pub mod scene;
pub mod state;
pub mod strand;
pub mod value;

pub use app::SceneController;
pub use error::{ErrorKind, Outcome, SceneError};
