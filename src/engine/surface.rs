// Live height updates for the sculpted slab, plus the renderer-side upload check.
//
// Flow per frame:
//   HeightCanvas::intensity_field() → SurfaceMesh::apply_height_field() (version += 1)
//   → UploadTracker::pending() → queue.write_buffer(positions)

use super::mesh::SurfaceMesh;

/// Intensity value that maps to a height of 1.0.
pub const MAX_INTENSITY: f32 = 255.0;

/// Overwrite the Y component of every top-plane vertex with `intensity[i] / 255`.
///
/// Only `positions[3i + 1]` for `i < axis_length²` is written. Stops early when
/// `intensity` or `positions` is shorter than a full top plane; vertices past
/// that point keep their previous height. Returns the number of vertices written.
pub fn apply_height_field(positions: &mut [f32], intensity: &[u8], axis_length: usize) -> usize {
    let plane = axis_length * axis_length;
    let count = plane.min(intensity.len()).min(positions.len() / 3);
    if count < plane {
        log::debug!(
            "partial height field: {} of {} top vertices ({} samples, {} floats)",
            count,
            plane,
            intensity.len(),
            positions.len()
        );
    }

    for (xyz, &sample) in positions.chunks_exact_mut(3).zip(intensity).take(count) {
        xyz[1] = sample as f32 / MAX_INTENSITY;
    }
    count
}

impl SurfaceMesh {
    /// Rewrite top-plane heights from an intensity field and mark the
    /// positions dirty before returning.
    pub fn apply_height_field(&mut self, intensity: &[u8]) -> usize {
        let axis_length = self.axis_length();
        let written = apply_height_field(self.positions_mut(), intensity, axis_length);
        self.notify_dirty();
        written
    }
}

/// Last position version the GPU has seen.
///
/// The renderer calls `pending` once per frame; any number of edits between
/// two frames collapse into one upload.
#[derive(Debug, Default)]
pub struct UploadTracker {
    uploaded: Option<u64>,
    uploads:  u64,
}

impl UploadTracker {
    /// Tracker for a buffer that was created from the mesh's current contents.
    pub fn synced_with(mesh: &SurfaceMesh) -> Self {
        Self { uploaded: Some(mesh.version()), uploads: 0 }
    }

    /// Positions to upload, or `None` if the GPU copy is current.
    pub fn pending<'a>(&mut self, mesh: &'a SurfaceMesh) -> Option<&'a [f32]> {
        if self.uploaded == Some(mesh.version()) {
            return None;
        }
        self.uploaded = Some(mesh.version());
        self.uploads += 1;
        Some(mesh.positions())
    }

    /// Uploads handed out since creation.
    pub fn uploads(&self) -> u64 { self.uploads }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::{build_mesh, create_vertices};

    fn small_mesh() -> SurfaceMesh {
        let (vertices, _) = create_vertices(0.1).unwrap();
        build_mesh(&vertices).unwrap()
    }

    #[test]
    fn three_by_three_field_normalises_to_unit_heights() {
        let mut positions: Vec<f32> = (0..18 * 3).map(|i| i as f32).collect();
        let field = [0u8, 128, 255, 0, 128, 255, 0, 128, 255];

        let written = apply_height_field(&mut positions, &field, 3);

        assert_eq!(written, 9);
        let expected = [0.0, 0.502, 1.0, 0.0, 0.502, 1.0, 0.0, 0.502, 1.0];
        for (i, want) in expected.iter().enumerate() {
            assert!((positions[3 * i + 1] - want).abs() < 1e-3, "vertex {i}: {}", positions[3 * i + 1]);
        }
    }

    #[test]
    fn only_top_plane_y_components_change() {
        let before: Vec<f32> = (0..18 * 3).map(|i| i as f32 * 0.25).collect();
        let mut after = before.clone();
        apply_height_field(&mut after, &[200u8; 9], 3);

        for (i, (b, a)) in before.iter().zip(&after).enumerate() {
            let vertex = i / 3;
            let is_top_y = i % 3 == 1 && vertex < 9;
            if is_top_y {
                assert_eq!(*a, 200.0 / 255.0);
            } else {
                assert_eq!(a.to_bits(), b.to_bits(), "float {i} changed");
            }
        }
    }

    #[test]
    fn applying_the_same_field_twice_is_idempotent() {
        let mut mesh = small_mesh();
        let plane = mesh.axis_length() * mesh.axis_length();
        let field: Vec<u8> = (0..plane).map(|i| (i * 7 % 256) as u8).collect();

        mesh.apply_height_field(&field);
        let first = mesh.positions().to_vec();
        mesh.apply_height_field(&field);
        assert_eq!(mesh.positions(), first.as_slice());
    }

    #[test]
    fn short_field_updates_only_available_samples() {
        let mut positions = vec![0.5f32; 18 * 3];
        let written = apply_height_field(&mut positions, &[255u8, 255], 3);

        assert_eq!(written, 2);
        assert_eq!(positions[1], 1.0);
        assert_eq!(positions[4], 1.0);
        assert_eq!(positions[7], 0.5);
    }

    #[test]
    fn short_buffer_never_panics() {
        let mut positions = vec![0.0f32; 4 * 3];
        let written = apply_height_field(&mut positions, &[255u8; 9], 3);
        assert_eq!(written, 4);
    }

    #[test]
    fn mesh_update_marks_dirty_even_for_empty_field() {
        let mut mesh = small_mesh();
        assert_eq!(mesh.apply_height_field(&[]), 0);
        assert_eq!(mesh.version(), 1);
    }

    #[test]
    fn tracker_uploads_once_per_version() {
        let mut mesh = small_mesh();
        let mut tracker = UploadTracker::synced_with(&mesh);
        assert!(tracker.pending(&mesh).is_none());

        let plane = mesh.axis_length() * mesh.axis_length();
        mesh.apply_height_field(&vec![10u8; plane]);
        mesh.apply_height_field(&vec![20u8; plane]);

        let uploaded = tracker.pending(&mesh).map(|p| p.to_vec());
        assert_eq!(uploaded.as_deref(), Some(mesh.positions()));
        assert!(tracker.pending(&mesh).is_none());
        assert_eq!(tracker.uploads(), 1);
    }

    #[test]
    fn fresh_tracker_uploads_initial_contents() {
        let mesh = small_mesh();
        let mut tracker = UploadTracker::default();
        assert!(tracker.pending(&mesh).is_some());
        assert!(tracker.pending(&mesh).is_none());
    }
}
