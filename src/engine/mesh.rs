// Slab mesh generation: vertex planes, topology and GPU-ready buffers.
//
// Pipeline:
//   create_vertices() → Vec<Vertex> → build_mesh() → SurfaceMesh → GPU
//                                      └ build_topology(axis_length)
//
// Vertex layout (axis_length = n):
//   [0, n²)     top plane,    row-major, row 0 at z = -half_extent
//   [n², 2n²)   bottom plane, same order

use glam::Vec3;
use thiserror::Error;

use super::grid::Grid;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Lateral distance between neighbouring vertices, in world units.
pub const GRID_STEP: f32 = 0.05;
/// Height of the top plane before any sculpting.
pub const TOP_Y: f32 = 0.0;
/// Height of the bottom plane.
pub const BOTTOM_Y: f32 = -0.2;

const POSITION_COMPONENTS: usize = 3;
const NORMAL_COMPONENTS: usize = 3;
const UV_COMPONENTS: usize = 2;

// ============================================================================
// ERRORS
// ============================================================================

/// Construction failures. All of them are fatal: a mesh with bad indices
/// must never reach the renderer.
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("half extent must be finite and positive, got {0}")]
    InvalidExtent(f32),

    #[error("axis length {0} is degenerate, at least 2 vertices per axis are required")]
    DegenerateGrid(usize),

    #[error("vertex count {0} does not split into two square planes")]
    VertexCount(usize),

    #[error("{vertices} vertices cannot be addressed with 32-bit indices")]
    IndexOverflow { vertices: usize },

    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange { triangle: usize, index: u32, vertex_count: usize },
}

// ============================================================================
// VERTEX
// ============================================================================

/// One slab vertex. Only `position[1]` changes after construction.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub uv:       [f32; 2],
}

/// Vertex buffer layouts for the three separate attribute streams:
///   @location(0) position: vec3<f32>   (slot 0, rewritten while sculpting)
///   @location(1) normal:   vec3<f32>   (slot 1)
///   @location(2) uv:       vec2<f32>   (slot 2)
pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

pub fn normal_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

pub fn uv_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        }],
    }
}

// ============================================================================
// VERTEX PLANES
// ============================================================================

/// Shape of a slab: a square top plane over a square bottom plane.
#[derive(Debug, Clone, Copy)]
pub struct SlabParams {
    pub half_extent: f32,
    pub step:        f32,
    pub top_y:       f32,
    pub bottom_y:    f32,
}

impl SlabParams {
    /// The sculptable terrain slab.
    pub fn terrain(half_extent: f32) -> Self {
        Self { half_extent, step: GRID_STEP, top_y: TOP_Y, bottom_y: BOTTOM_Y }
    }

    /// Vertices per axis: floor(2 × half_extent / step) + 1.
    /// Evaluated in f64 with a small tolerance so 2.0 / 0.05f32 lands on 40, not 39.
    pub fn axis_length(&self) -> Result<usize, MeshError> {
        if !self.half_extent.is_finite() || self.half_extent <= 0.0 {
            return Err(MeshError::InvalidExtent(self.half_extent));
        }
        let cells = (2.0 * self.half_extent as f64) / self.step as f64;
        let axis_length = (cells + 1e-4).floor() as usize + 1;
        if axis_length < 2 {
            return Err(MeshError::DegenerateGrid(axis_length));
        }
        Ok(axis_length)
    }
}

/// Generate top and bottom planes of the terrain slab.
/// Returns the flat vertex list and the number of vertices per axis.
pub fn create_vertices(half_extent: f32) -> Result<(Vec<Vertex>, usize), MeshError> {
    create_slab_vertices(&SlabParams::terrain(half_extent))
}

/// Generate both planes of an arbitrary slab.
///
/// Rows walk Z from `-half_extent` upward (the outer loop counts `iZ` down from
/// `+half_extent` and places the row at `z = -iZ`), columns walk X upward.
/// Topology indices depend on this exact order.
///
/// Bottom normals are `+Y` like the top ones; the slab is drawn double-sided.
pub fn create_slab_vertices(params: &SlabParams) -> Result<(Vec<Vertex>, usize), MeshError> {
    let axis_length = params.axis_length()?;
    let last = (axis_length - 1) as f32;
    let mut vertices = Vec::with_capacity(2 * axis_length * axis_length);

    for y in [params.top_y, params.bottom_y] {
        for row in 0..axis_length {
            let i_z = params.half_extent - row as f32 * params.step;
            for col in 0..axis_length {
                let i_x = -params.half_extent + col as f32 * params.step;
                vertices.push(Vertex {
                    position: [i_x, y, -i_z],
                    normal:   Vec3::Y.to_array(),
                    uv:       [col as f32 / last, row as f32 / last],
                });
            }
        }
    }

    Ok((vertices, axis_length))
}

/// Derive vertices-per-axis from a two-plane vertex count.
pub fn axis_length_of(vertex_count: usize) -> Result<usize, MeshError> {
    if vertex_count % 2 != 0 {
        return Err(MeshError::VertexCount(vertex_count));
    }
    let plane = vertex_count / 2;
    let axis_length = (plane as f64).sqrt().round() as usize;
    if axis_length * axis_length != plane {
        return Err(MeshError::VertexCount(vertex_count));
    }
    if axis_length < 2 {
        return Err(MeshError::DegenerateGrid(axis_length));
    }
    Ok(axis_length)
}

// ============================================================================
// TOPOLOGY
// ============================================================================

/// Triangles emitted by `build_topology` for a given axis length:
/// top and bottom faces, then four walls.
pub fn triangle_count(axis_length: usize) -> usize {
    let cells = axis_length.saturating_sub(1);
    4 * cells * cells + 8 * cells
}

/// Number of leading triangles in the index list that belong to the top face.
pub fn top_triangle_count(axis_length: usize) -> usize {
    let cells = axis_length.saturating_sub(1);
    2 * cells * cells
}

#[derive(Debug, Clone, Copy)]
enum Wall {
    /// Row 0, faces -Z.
    Far,
    /// Last row, faces +Z.
    Near,
    /// Column 0, faces -X.
    Left,
    /// Last column, faces +X.
    Right,
}

/// Build the closed slab triangle list from the grid size alone.
///
/// Order: top face, bottom face, far/near/left/right walls.
/// Every triangle is wound counter-clockwise seen from outside the slab.
pub fn build_topology(axis_length: usize) -> Result<Vec<[u32; 3]>, MeshError> {
    if axis_length < 2 {
        return Err(MeshError::DegenerateGrid(axis_length));
    }
    let plane = axis_length
        .checked_mul(axis_length)
        .ok_or(MeshError::IndexOverflow { vertices: usize::MAX })?;
    let vertices = plane
        .checked_mul(2)
        .ok_or(MeshError::IndexOverflow { vertices: usize::MAX })?;
    if vertices > u32::MAX as usize {
        return Err(MeshError::IndexOverflow { vertices });
    }

    let top = Grid::from_fn(axis_length, |row, col| (row * axis_length + col) as u32);
    let bottom = Grid::from_fn(axis_length, |row, col| (plane + row * axis_length + col) as u32);

    let mut triangles = Vec::with_capacity(triangle_count(axis_length));

    // Top face: quad (a b / c d), a = (row, col).
    for row in 0..axis_length - 1 {
        for col in 0..axis_length - 1 {
            let a = top[(row, col)];
            let b = top[(row, col + 1)];
            let c = top[(row + 1, col)];
            let d = top[(row + 1, col + 1)];
            triangles.push([a, c, b]);
            triangles.push([b, c, d]);
        }
    }

    // Bottom face: same quads, opposite winding.
    for row in 0..axis_length - 1 {
        for col in 0..axis_length - 1 {
            let a = bottom[(row, col)];
            let b = bottom[(row, col + 1)];
            let c = bottom[(row + 1, col)];
            let d = bottom[(row + 1, col + 1)];
            triangles.push([a, b, c]);
            triangles.push([b, d, c]);
        }
    }

    for wall in [Wall::Far, Wall::Near, Wall::Left, Wall::Right] {
        stitch_wall(&mut triangles, &top, &bottom, wall);
    }

    debug_assert_eq!(triangles.len(), triangle_count(axis_length));
    Ok(triangles)
}

/// Connect one boundary of the top grid to the same boundary of the bottom grid.
/// Each boundary segment (t0, t1) with bottom twins (b0, b1) becomes two triangles.
fn stitch_wall(triangles: &mut Vec<[u32; 3]>, top: &Grid<u32>, bottom: &Grid<u32>, wall: Wall) {
    let last = top.side() - 1;
    let (top_edge, bottom_edge): (Vec<u32>, Vec<u32>) = match wall {
        Wall::Far   => (top.first_row().to_vec(), bottom.first_row().to_vec()),
        Wall::Near  => (top.last_row().to_vec(), bottom.last_row().to_vec()),
        Wall::Left  => (top.column(0).copied().collect(), bottom.column(0).copied().collect()),
        Wall::Right => (top.column(last).copied().collect(), bottom.column(last).copied().collect()),
    };

    for (t, b) in top_edge.windows(2).zip(bottom_edge.windows(2)) {
        let (t0, t1, b0, b1) = (t[0], t[1], b[0], b[1]);
        match wall {
            Wall::Far | Wall::Right => {
                triangles.push([t0, t1, b0]);
                triangles.push([t1, b1, b0]);
            }
            Wall::Near | Wall::Left => {
                triangles.push([t0, b0, t1]);
                triangles.push([t1, b0, b1]);
            }
        }
    }
}

// ============================================================================
// SURFACE MESH
// ============================================================================

/// GPU-ready slab with separate flat attribute buffers.
///
/// Positions are the only mutable data. Every write goes through
/// `apply_height_field` (see `surface.rs`), which bumps `version`; the renderer
/// compares versions to decide whether to re-upload.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    positions:   Vec<f32>,
    normals:     Vec<f32>,
    uvs:         Vec<f32>,
    indices:     Vec<u32>,
    axis_length: usize,
    version:     u64,
}

/// Pack vertices into flat buffers and attach the slab topology.
pub fn build_mesh(vertices: &[Vertex]) -> Result<SurfaceMesh, MeshError> {
    let axis_length = axis_length_of(vertices.len())?;

    let mut positions = Vec::with_capacity(vertices.len() * POSITION_COMPONENTS);
    let mut normals = Vec::with_capacity(vertices.len() * NORMAL_COMPONENTS);
    let mut uvs = Vec::with_capacity(vertices.len() * UV_COMPONENTS);
    for vertex in vertices {
        positions.extend_from_slice(&vertex.position);
        normals.extend_from_slice(&vertex.normal);
        uvs.extend_from_slice(&vertex.uv);
    }

    let triangles = build_topology(axis_length)?;
    for (triangle, corners) in triangles.iter().enumerate() {
        if let Some(&index) = corners.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange { triangle, index, vertex_count: vertices.len() });
        }
    }
    let indices: Vec<u32> = triangles.into_iter().flatten().collect();

    log::info!(
        "built slab mesh: axis {} | {} vertices | {} triangles",
        axis_length,
        vertices.len(),
        indices.len() / 3
    );

    Ok(SurfaceMesh { positions, normals, uvs, indices, axis_length, version: 0 })
}

impl SurfaceMesh {
    pub fn positions(&self) -> &[f32] { &self.positions }
    pub fn normals(&self) -> &[f32] { &self.normals }
    pub fn uvs(&self) -> &[f32] { &self.uvs }
    pub fn indices(&self) -> &[u32] { &self.indices }

    pub fn axis_length(&self) -> usize { self.axis_length }
    pub fn vertex_count(&self) -> usize { self.positions.len() / POSITION_COMPONENTS }
    pub fn index_count(&self) -> usize { self.indices.len() }
    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    /// Index triples of the top face only. Top triangles lead the index list.
    pub fn top_indices(&self) -> &[u32] {
        &self.indices[..top_triangle_count(self.axis_length) * 3]
    }

    /// Position of vertex `i`.
    pub fn position(&self, i: usize) -> Vec3 {
        let p = &self.positions[i * POSITION_COMPONENTS..(i + 1) * POSITION_COMPONENTS];
        Vec3::new(p[0], p[1], p[2])
    }

    /// Current content version. Starts at 0; bumped by every height edit.
    pub fn version(&self) -> u64 { self.version }

    /// Mark positions as changed so the renderer re-uploads them.
    pub fn notify_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub(super) fn positions_mut(&mut self) -> &mut [f32] { &mut self.positions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn unit_extent_has_41_vertices_per_axis() {
        let (vertices, axis_length) = create_vertices(1.0).unwrap();
        assert_eq!(axis_length, 41);
        assert_eq!(vertices.len(), 3362);
    }

    #[test]
    fn vertex_count_matches_axis_formula() {
        for half_extent in [0.025_f32, 0.05, 0.1, 0.33, 0.5, 0.77, 1.0, 1.5] {
            let (vertices, axis_length) = create_vertices(half_extent).unwrap();
            let expected = ((2.0 * half_extent as f64 / 0.05) + 1e-6).floor() as usize + 1;
            assert_eq!(axis_length, expected, "half_extent {half_extent}");
            assert!(axis_length >= 2);
            assert_eq!(vertices.len(), 2 * axis_length * axis_length);
        }
    }

    #[test]
    fn invalid_extents_are_rejected() {
        assert_eq!(create_vertices(0.0), Err(MeshError::InvalidExtent(0.0)));
        assert!(matches!(create_vertices(-1.0), Err(MeshError::InvalidExtent(_))));
        assert!(matches!(create_vertices(f32::NAN), Err(MeshError::InvalidExtent(_))));
        assert_eq!(create_vertices(0.01), Err(MeshError::DegenerateGrid(1)));
    }

    #[test]
    fn planes_are_row_major_with_descending_iz() {
        let (vertices, n) = create_vertices(1.0).unwrap();
        let first = vertices[0];
        assert_eq!(first.position, [-1.0, 0.0, -1.0]);
        // Second vertex steps along X.
        assert!((vertices[1].position[0] - (-0.95)).abs() < 1e-6);
        assert_eq!(vertices[1].position[2], -1.0);
        // Next row steps along Z.
        assert!((vertices[n].position[2] - (-0.95)).abs() < 1e-6);
        assert_eq!(vertices[n].position[0], -1.0);

        let last_top = vertices[n * n - 1].position;
        assert!((last_top[0] - 1.0).abs() < 1e-5);
        assert!((last_top[2] - 1.0).abs() < 1e-5);

        let first_bottom = vertices[n * n];
        assert_eq!(first_bottom.position, [-1.0, BOTTOM_Y, -1.0]);
        // Bottom normals are not flipped.
        assert_eq!(first_bottom.normal, [0.0, 1.0, 0.0]);
        assert!(vertices[..n * n].iter().all(|v| v.position[1] == 0.0));
        assert!(vertices[n * n..].iter().all(|v| v.position[1] == BOTTOM_Y));
    }

    #[test]
    fn topology_rejects_degenerate_axis() {
        assert_eq!(build_topology(0), Err(MeshError::DegenerateGrid(0)));
        assert_eq!(build_topology(1), Err(MeshError::DegenerateGrid(1)));
        assert!(matches!(build_topology(70_000), Err(MeshError::IndexOverflow { .. })));
    }

    #[test]
    fn topology_indices_in_range_and_distinct() {
        for n in [2usize, 3, 5, 41] {
            let triangles = build_topology(n).unwrap();
            assert_eq!(triangles.len(), triangle_count(n));
            let limit = (2 * n * n) as u32;
            for [a, b, c] in &triangles {
                assert!(*a < limit && *b < limit && *c < limit);
                assert!(a != b && b != c && a != c);
            }
        }
    }

    #[test]
    fn every_top_boundary_segment_has_one_wall_triangle_pair() {
        let n = 6;
        let triangles = build_topology(n).unwrap();
        let walls = &triangles[2 * top_triangle_count(n)..];
        assert_eq!(walls.len(), 8 * (n - 1));

        let top = Grid::from_fn(n, |row, col| (row * n + col) as u32);
        let mut segments: Vec<(u32, u32)> = Vec::new();
        for col in 0..n - 1 {
            segments.push((top[(0, col)], top[(0, col + 1)]));
            segments.push((top[(n - 1, col)], top[(n - 1, col + 1)]));
        }
        for row in 0..n - 1 {
            segments.push((top[(row, 0)], top[(row + 1, 0)]));
            segments.push((top[(row, n - 1)], top[(row + 1, n - 1)]));
        }
        assert_eq!(segments.len(), 4 * (n - 1));

        let plane = (n * n) as u32;
        for (t0, t1) in segments {
            let (b0, b1) = (t0 + plane, t1 + plane);
            let with_segment: Vec<usize> = walls
                .iter()
                .enumerate()
                .filter(|(_, tri)| tri.contains(&t0) && tri.contains(&t1))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(with_segment.len(), 1, "segment ({t0}, {t1})");

            // Its partner triangle covers the rest of the wall quad.
            let first = with_segment[0];
            let partner = walls[first ^ 1];
            let quad: HashSet<u32> = walls[first].iter().chain(partner.iter()).copied().collect();
            assert_eq!(quad, HashSet::from([t0, t1, b0, b1]));
        }
    }

    #[test]
    fn slab_is_closed_and_consistently_wound() {
        for n in [2usize, 3, 7] {
            let triangles = build_topology(n).unwrap();
            let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
            for [a, b, c] in &triangles {
                for edge in [(*a, *b), (*b, *c), (*c, *a)] {
                    *directed.entry(edge).or_default() += 1;
                }
            }
            for (&(from, to), &count) in &directed {
                assert_eq!(count, 1, "edge {from}->{to} used {count} times (n = {n})");
                assert_eq!(directed.get(&(to, from)), Some(&1), "edge {from}->{to} has no twin (n = {n})");
            }
        }
    }

    #[test]
    fn faces_point_outward() {
        let (vertices, n) = create_vertices(0.1).unwrap();
        let mesh = build_mesh(&vertices).unwrap();
        let centre = Vec3::new(0.0, BOTTOM_Y / 2.0, 0.0);
        for tri in mesh.indices().chunks(3) {
            let a = mesh.position(tri[0] as usize);
            let b = mesh.position(tri[1] as usize);
            let c = mesh.position(tri[2] as usize);
            let normal = (b - a).cross(c - a);
            let outward = (a + b + c) / 3.0 - centre;
            assert!(normal.dot(outward) > 0.0, "triangle {tri:?} faces inward (n = {n})");
        }
    }

    #[test]
    fn build_mesh_packs_buffers_in_vertex_order() {
        let (vertices, n) = create_vertices(1.0).unwrap();
        let mesh = build_mesh(&vertices).unwrap();
        assert_eq!(mesh.axis_length(), n);
        assert_eq!(mesh.positions().len(), vertices.len() * 3);
        assert_eq!(mesh.normals().len(), vertices.len() * 3);
        assert_eq!(mesh.uvs().len(), vertices.len() * 2);
        assert_eq!(mesh.triangle_count(), triangle_count(n));
        assert_eq!(mesh.top_indices().len(), top_triangle_count(n) * 3);
        assert_eq!(&mesh.positions()[3 * 42..3 * 43], &vertices[42].position);
        assert_eq!(&mesh.uvs()[2 * 42..2 * 43], &vertices[42].uv);
        assert_eq!(mesh.version(), 0);
    }

    #[test]
    fn build_mesh_rejects_malformed_vertex_counts() {
        let (vertices, _) = create_vertices(0.1).unwrap();
        assert!(matches!(build_mesh(&vertices[1..]), Err(MeshError::VertexCount(_))));
        assert!(matches!(build_mesh(&vertices[2..]), Err(MeshError::VertexCount(_))));
        assert!(matches!(build_mesh(&vertices[..2]), Err(MeshError::DegenerateGrid(1))));
    }

    #[test]
    fn notify_dirty_bumps_version() {
        let (vertices, _) = create_vertices(0.1).unwrap();
        let mut mesh = build_mesh(&vertices).unwrap();
        mesh.notify_dirty();
        mesh.notify_dirty();
        assert_eq!(mesh.version(), 2);
    }
}
