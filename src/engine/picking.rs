// Ray picking against the sculpted top face.

use glam::Vec3;

use super::camera::Ray;
use super::mesh::SurfaceMesh;

/// Nearest point where `ray` hits the top face of `mesh`, if any.
/// Walls and bottom are ignored: only the top face maps onto the paint canvas.
pub fn pick_surface(mesh: &SurfaceMesh, ray: &Ray) -> Option<Vec3> {
    let mut closest: Option<f32> = None;

    for tri in mesh.top_indices().chunks_exact(3) {
        let v0 = mesh.position(tri[0] as usize);
        let v1 = mesh.position(tri[1] as usize);
        let v2 = mesh.position(tri[2] as usize);

        if let Some(t) = ray_triangle_intersection(ray.origin, ray.direction, v0, v1, v2) {
            if closest.is_none_or(|best| t < best) {
                closest = Some(t);
            }
        }
    }

    closest.map(|t| ray.origin + ray.direction * t)
}

/// Möller–Trumbore ray-triangle intersection. Returns the ray parameter `t`.
/// Both windings count as hits.
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<f32> {
    const EPSILON: f32 = 1e-8;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray_dir.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray_origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray_dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::{build_mesh, create_vertices};

    #[test]
    fn vertical_ray_hits_flat_top() {
        let (vertices, _) = create_vertices(1.0).unwrap();
        let mesh = build_mesh(&vertices).unwrap();
        let ray = Ray { origin: Vec3::new(0.51, 5.0, 0.26), direction: Vec3::NEG_Y };

        let hit = pick_surface(&mesh, &ray).unwrap();
        assert!((hit - Vec3::new(0.51, 0.0, 0.26)).length() < 1e-4, "hit {hit}");
    }

    #[test]
    fn ray_beside_the_slab_misses() {
        let (vertices, _) = create_vertices(1.0).unwrap();
        let mesh = build_mesh(&vertices).unwrap();
        let ray = Ray { origin: Vec3::new(3.0, 5.0, 0.0), direction: Vec3::NEG_Y };
        assert!(pick_surface(&mesh, &ray).is_none());
    }

    #[test]
    fn raised_vertex_is_hit_first() {
        let (vertices, n) = create_vertices(1.0).unwrap();
        let mut mesh = build_mesh(&vertices).unwrap();
        let mut field = vec![0u8; n * n];
        let centre = (n / 2) * n + n / 2;
        field[centre] = 255;
        mesh.apply_height_field(&field);

        // Just off the peak so the ray does not graze shared edges.
        let ray = Ray { origin: Vec3::new(0.001, 5.0, 0.002), direction: Vec3::NEG_Y };
        let hit = pick_surface(&mesh, &ray).unwrap();
        assert!(hit.y > 0.9 && hit.y < 1.0 + 1e-4, "hit {hit}");
    }

    #[test]
    fn ray_pointing_away_misses() {
        let t = ray_triangle_intersection(
            Vec3::new(0.1, 1.0, 0.1),
            Vec3::Y,
            Vec3::ZERO,
            Vec3::X,
            Vec3::Z,
        );
        assert!(t.is_none());
    }
}
