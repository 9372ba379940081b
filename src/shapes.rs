//! Procedural meshes. All triangles wind counter-clockwise when seen from
//! outside, i.e. `cross(b - a, c - a)` points away from the solid.

use crate::math::{Vec2, Vec3};
use crate::mesh::{MeshData, Vertex};

/// Number of latitude segments for sphere geometry
pub const SPHERE_LAT_SEGMENTS: usize = 16;
/// Number of longitude segments for sphere geometry
pub const SPHERE_LON_SEGMENTS: usize = 24;

/// Face normal and the two in-plane axes with `u x v = normal`.
const BOX_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y, Vec3::Z),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::Z, Vec3::X),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::Y, Vec3::X),
];

const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 0.0),
];

fn face_corners(normal: Vec3, u: Vec3, v: Vec3, half: Vec3) -> [Vec3; 4] {
    let c = normal * half;
    let u = u * half;
    let v = v * half;
    [c - u - v, c + u - v, c + u + v, c - u + v]
}

/// Axis-aligned box centred on the origin with flat per-face normals
/// (24 vertices).
pub fn box_mesh(name: &str, half_extents: Vec3) -> MeshData {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in BOX_FACES {
        let base = vertices.len() as u32;
        for (p, uv) in face_corners(normal, u, v, half_extents).into_iter().zip(QUAD_UVS) {
            vertices.push(Vertex::new(p, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    MeshData::new(name, vertices, indices)
}

/// Unit cube (side 1) sharing its 8 corner vertices between faces.
///
/// Normals point along the corner diagonals.
pub fn shared_cube(name: &str) -> MeshData {
    let half = Vec3::splat(0.5);
    let corner_index = |p: Vec3| (p.x > 0.0) as u32 | ((p.y > 0.0) as u32) << 1 | ((p.z > 0.0) as u32) << 2;

    let vertices = (0..8u32)
        .map(|i| {
            let sign = Vec3::new(
                if i & 1 != 0 { 1.0 } else { -1.0 },
                if i & 2 != 0 { 1.0 } else { -1.0 },
                if i & 4 != 0 { 1.0 } else { -1.0 },
            );
            let uv = Vec2::new((i & 1) as f32, ((i >> 1) & 1) as f32);
            Vertex::new(sign * half, sign.normalize(), uv)
        })
        .collect();

    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in BOX_FACES {
        let q = face_corners(normal, u, v, half).map(corner_index);
        indices.extend_from_slice(&[q[0], q[1], q[2], q[0], q[2], q[3]]);
    }
    MeshData::new(name, vertices, indices)
}

/// UV sphere centred on the origin.
///
/// Poles are single points and the longitude seam repeats positions
/// bit-exactly, so the surface is closed when welded by position.
pub fn uv_sphere(name: &str, radius: f32, lat_segments: usize, lon_segments: usize) -> MeshData {
    let lat = lat_segments.max(2);
    let lon = lon_segments.max(3);
    let row = lon + 1;

    let mut vertices = Vec::with_capacity((lat + 1) * row);
    for i in 0..=lat {
        let theta = (i as f32 / lat as f32) * std::f32::consts::PI;
        for j in 0..=lon {
            let phi = ((j % lon) as f32 / lon as f32) * std::f32::consts::TAU;
            let dir = if i == 0 {
                Vec3::Y
            } else if i == lat {
                Vec3::NEG_Y
            } else {
                let sin_theta = theta.sin();
                Vec3::new(sin_theta * phi.cos(), theta.cos(), sin_theta * phi.sin())
            };
            let uv = Vec2::new(j as f32 / lon as f32, i as f32 / lat as f32);
            vertices.push(Vertex::new(dir * radius, dir, uv));
        }
    }

    let mut indices = Vec::with_capacity(lat * lon * 6);
    for i in 0..lat {
        for j in 0..lon {
            let a = (i * row + j) as u32;
            let b = a + 1;
            let c = ((i + 1) * row + j) as u32;
            let d = c + 1;
            // Skip the collapsed triangle at each pole.
            if i != 0 {
                indices.extend_from_slice(&[a, b, c]);
            }
            if i != lat - 1 {
                indices.extend_from_slice(&[b, d, c]);
            }
        }
    }
    MeshData::new(name, vertices, indices)
}

/// Flat grid on the XZ plane centred on the origin, facing +Y, with
/// `columns` by `rows` cells. Row 0 is the +Z edge.
pub fn grid(name: &str, width: f32, depth: f32, columns: usize, rows: usize) -> MeshData {
    let (columns, rows) = (columns.max(1), rows.max(1));
    let (w, l) = (columns + 1, rows + 1);
    let dx = width / columns as f32;
    let dz = depth / rows as f32;

    let mut vertices = Vec::with_capacity(w * l);
    for i in 0..l {
        for j in 0..w {
            let p = Vec3::new(-0.5 * width + j as f32 * dx, 0.0, 0.5 * depth - i as f32 * dz);
            let uv = Vec2::new(j as f32 / columns as f32, i as f32 / rows as f32);
            vertices.push(Vertex::new(p, Vec3::Y, uv));
        }
    }

    let mut indices = Vec::with_capacity(columns * rows * 6);
    for i in 0..rows {
        for j in 0..columns {
            let a = (i * w + j) as u32;
            let c = ((i + 1) * w + j) as u32;
            indices.extend_from_slice(&[a, a + 1, c, c, a + 1, c + 1]);
        }
    }
    MeshData::new(name, vertices, indices)
}
