// Engine module - terrain slab, paint canvas and the pieces that drive them
// Rendering lives in main.rs; everything here is GPU-agnostic apart from
// vertex layouts and the egui panel.

pub mod camera;
pub mod canvas;
pub mod grid;
pub mod input;
pub mod mesh;
pub mod ocean;
pub mod overlay;
pub mod picking;
pub mod sculpt;
pub mod surface;

// Re-export commonly used items
pub use camera::OrbitCamera;
pub use canvas::Brush;
pub use input::{InputState, PAINT_KEY};
pub use mesh::{MeshError, SurfaceMesh};
pub use overlay::{PanelStats, SculptPanel};
pub use sculpt::SculptSession;
pub use surface::UploadTracker;
