// Sculpt session: ties the paint canvas to the live slab mesh.
//
//   PaintInput → paint(canvas) → canvas changed? → mesh.apply_height_field()

use glam::{Vec2, Vec3};

use super::canvas::{Brush, HeightCanvas, PaintInput, paint};
use super::mesh::{GRID_STEP, MeshError, SurfaceMesh, build_mesh, create_vertices};

pub struct SculptSession {
    mesh:        SurfaceMesh,
    canvas:      HeightCanvas,
    pub brush:   Brush,
    half_extent: f32,
}

impl SculptSession {
    /// Build the terrain slab and a blank canvas matching its top plane.
    pub fn new(half_extent: f32, brush: Brush) -> Result<Self, MeshError> {
        let (vertices, axis_length) = create_vertices(half_extent)?;
        let mesh = build_mesh(&vertices)?;
        Ok(Self {
            mesh,
            canvas: HeightCanvas::new(axis_length),
            brush,
            half_extent,
        })
    }

    pub fn mesh(&self) -> &SurfaceMesh { &self.mesh }
    pub fn canvas(&self) -> &HeightCanvas { &self.canvas }
    pub fn half_extent(&self) -> f32 { self.half_extent }

    /// Paint with the session brush and push the result into the mesh.
    /// Returns true if the mesh heights were rewritten.
    pub fn apply(&mut self, input: PaintInput) -> bool {
        if !paint(&mut self.canvas, &self.brush, input) {
            return false;
        }
        self.sync_heights();
        true
    }

    /// Wipe the canvas and flatten the top face.
    pub fn clear(&mut self) {
        self.canvas.clear();
        self.sync_heights();
    }

    /// Map a world-space point on the slab to canvas pixel coordinates.
    /// Column follows X, row follows Z; a vertex lands on its pixel's centre.
    pub fn world_to_canvas(&self, point: Vec3) -> Vec2 {
        Vec2::new(point.x + self.half_extent, point.z + self.half_extent) / GRID_STEP + Vec2::splat(0.5)
    }

    fn sync_heights(&mut self) {
        let written = self.mesh.apply_height_field(self.canvas.intensity_field());
        log::trace!("height field applied to {written} vertices (version {})", self.mesh.version());
    }
}
