// Translucent ocean slab around the terrain.
// Geometry is a coarse slab from the same builder as the terrain; the wave
// motion happens in shader_ocean.wgsl, driven by the uniforms below.

use super::mesh::{MeshError, SlabParams, SurfaceMesh, build_mesh, create_slab_vertices};

/// Cells per ocean side.
pub const OCEAN_SEGMENTS: usize = 15;
/// Slightly wider than the default terrain so the walls stay hidden under water.
pub const OCEAN_HALF_EXTENT: f32 = 1.0025;
pub const OCEAN_TOP_Y: f32 = 0.296;
pub const OCEAN_BOTTOM_Y: f32 = -0.204;

/// Resting height of the wave crests.
pub const WAVE_BASE: f32 = 0.346;
pub const WAVE_AMPLITUDE: f32 = 0.05;
/// World → noise space scale for the per-vertex wave phase.
pub const WAVE_NOISE_SCALE: f32 = 1.0 / 0.02005;

/// Ocean colour #3CE1FA with 0.6 opacity.
pub const OCEAN_COLOR: [f32; 4] = [0x3C as f32 / 255.0, 0xE1 as f32 / 255.0, 0xFA as f32 / 255.0, 0.6];

pub fn ocean_params() -> SlabParams {
    SlabParams {
        half_extent: OCEAN_HALF_EXTENT,
        step:        2.0 * OCEAN_HALF_EXTENT / OCEAN_SEGMENTS as f32,
        top_y:       OCEAN_TOP_Y,
        bottom_y:    OCEAN_BOTTOM_Y,
    }
}

/// Build the static ocean slab. Positions never change on the CPU side.
pub fn build_ocean() -> Result<SurfaceMesh, MeshError> {
    let (vertices, _) = create_slab_vertices(&ocean_params())?;
    build_mesh(&vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocean_grid_has_sixteen_vertices_per_axis() {
        let ocean = build_ocean().unwrap();
        assert_eq!(ocean.axis_length(), OCEAN_SEGMENTS + 1);
        assert_eq!(ocean.vertex_count(), 2 * 16 * 16);
    }
}
