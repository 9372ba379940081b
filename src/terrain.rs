//! Height-map terrain and ground queries.
//!
//! Height-map space has `x` along pixel columns and `z` along pixel rows.
//! The terrain mesh lays rows out towards -Z in world space, so row 0 is the
//! far (+Z) edge of the terrain.

use crate::error::AssetError;
use crate::math::{Vec2, Vec3};
use crate::mesh::{MeshData, Vertex};
use serde::{Deserialize, Serialize};

/// Radius of the box filter applied by [`HeightMap::build_mesh`].
pub const SMOOTHING_RADIUS: usize = 3;

/// Anything the player can stand on.
pub trait Ground {
    /// Surface height at world position `(x, z)`.
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Infinite plane at y = 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatGround;

impl Ground for FlatGround {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        0.0
    }
}

/// How [`HeightMap::height_at`] interpolates inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightSampling {
    /// Plain bilinear blend of the four corners.
    Bilinear,
    /// Replace one corner so the blend follows the mesh triangle under the
    /// point. Cells on odd rows are split along the other diagonal.
    #[default]
    OppositeCorner,
}

/// Grid of heights, already multiplied by the vertical scale.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    width: usize,
    length: usize,
    heights: Vec<f32>,
    sampling: HeightSampling,
}

impl HeightMap {
    /// Build from heights in row-major order (`x + z * width`).
    pub fn from_heights(width: usize, length: usize, heights: Vec<f32>) -> Result<Self, AssetError> {
        if width < 2 || length < 2 {
            return Err(AssetError::HeightMapTooSmall { width, length });
        }
        if heights.len() != width * length {
            return Err(AssetError::HeightMapSize {
                expected: width * length,
                actual: heights.len(),
            });
        }
        Ok(Self {
            width,
            length,
            heights,
            sampling: HeightSampling::default(),
        })
    }

    /// Decode raw little-endian 16-bit samples and scale them by `y_scale`.
    pub fn from_r16(width: usize, length: usize, y_scale: f32, bytes: &[u8]) -> Result<Self, AssetError> {
        let expected = width * length * 2;
        if bytes.len() != expected {
            return Err(AssetError::HeightMapSize {
                expected,
                actual: bytes.len(),
            });
        }
        let heights = bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as f32 * y_scale)
            .collect();
        let map = Self::from_heights(width, length, heights)?;
        log::info!("Loaded {width}x{length} height map (scale {y_scale})");
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn sampling(&self) -> HeightSampling {
        self.sampling
    }

    pub fn set_sampling(&mut self, sampling: HeightSampling) {
        self.sampling = sampling;
    }

    /// Height of a pixel, or `None` outside the grid.
    pub fn sample(&self, x: usize, z: usize) -> Option<f32> {
        if x >= self.width || z >= self.length {
            return None;
        }
        Some(self.heights[x + z * self.width])
    }

    #[inline]
    fn pixel(&self, x: usize, z: usize) -> f32 {
        self.heights[x.min(self.width - 1) + z.min(self.length - 1) * self.width]
    }

    /// Interpolated height at fractional pixel coordinates. Zero outside
    /// the grid.
    pub fn height_at(&self, fx: f32, fz: f32) -> f32 {
        if !(fx >= 0.0 && fz >= 0.0 && fx < self.width as f32 && fz < self.length as f32) {
            return 0.0;
        }
        let x = fx as usize;
        let z = fz as usize;
        let px = fx - x as f32;
        let pz = fz - z as f32;

        let mut bottom_left = self.pixel(x, z);
        let mut bottom_right = self.pixel(x + 1, z);
        let mut top_left = self.pixel(x, z + 1);
        let mut top_right = self.pixel(x + 1, z + 1);

        if self.sampling == HeightSampling::OppositeCorner {
            if z % 2 != 0 {
                if pz >= px {
                    bottom_right = bottom_left + (top_right - top_left);
                } else {
                    top_left = top_right + (bottom_left - bottom_right);
                }
            } else if pz < 1.0 - px {
                top_right = top_left + (bottom_right - bottom_left);
            } else {
                bottom_left = top_left + (bottom_right - top_right);
            }
        }

        let top = top_left * (1.0 - px) + top_right * px;
        let bottom = bottom_left * (1.0 - px) + bottom_right * px;
        bottom * (1.0 - pz) + top * pz
    }

    /// Surface normal at pixel `(x, z)` in height-map space, for a grid
    /// spacing of `dx` by `dz`. Straight up outside the grid.
    ///
    /// Uses the next pixel along each axis, or the previous one on the last
    /// column and row.
    pub fn normal_at(&self, x: i64, z: i64, dx: f32, dz: f32) -> Vec3 {
        if x < 0 || z < 0 || x >= self.width as i64 || z >= self.length as i64 {
            return Vec3::Y;
        }
        let (x, z) = (x as usize, z as usize);
        let nx = if x + 1 < self.width { x + 1 } else { x - 1 };
        let nz = if z + 1 < self.length { z + 1 } else { z - 1 };

        let y1 = self.pixel(x, z);
        let y2 = self.pixel(nx, z);
        let y3 = self.pixel(x, nz);

        let along_z = Vec3::new(0.0, y3 - y1, dz);
        let along_x = Vec3::new(dx, y2 - y1, 0.0);
        along_z.cross(along_x).try_normalize().unwrap_or(Vec3::Y)
    }

    /// Grid mesh covering `width` by `length` world units, centred on the
    /// origin, one vertex per pixel.
    ///
    /// With `smooth`, heights and normals of interior vertices are replaced
    /// by the mean over a [`SMOOTHING_RADIUS`] box.
    pub fn build_mesh(&self, name: &str, width: f32, length: f32, smooth: bool) -> MeshData {
        let (w, l) = (self.width, self.length);
        let dx = width / (w - 1) as f32;
        let dz = length / (l - 1) as f32;
        let du = 1.0 / (w - 1) as f32;
        let dv = 1.0 / (l - 1) as f32;

        let mut vertices = Vec::with_capacity(w * l);
        for i in 0..l {
            let z = 0.5 * length - i as f32 * dz;
            for j in 0..w {
                let x = -0.5 * width + j as f32 * dx;
                let y = self.height_at(j as f32, i as f32);
                let n = self.normal_at(j as i64, i as i64, dx, dz);
                vertices.push(Vertex::new(
                    Vec3::new(x, y, z),
                    Vec3::new(n.x, n.y, -n.z),
                    Vec2::new(j as f32 * du, i as f32 * dv),
                ));
            }
        }

        if smooth {
            smooth_grid(&mut vertices, w, l);
        }

        let mut indices = Vec::with_capacity((w - 1) * (l - 1) * 6);
        for i in 0..l - 1 {
            for j in 0..w - 1 {
                let a = (i * w + j) as u32;
                let b = a + 1;
                let c = ((i + 1) * w + j) as u32;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, c, c, b, d]);
            }
        }
        MeshData::new(name, vertices, indices)
    }
}

/// Box filter over the interior of a `w` by `l` vertex grid.
fn smooth_grid(vertices: &mut [Vertex], w: usize, l: usize) {
    let r = SMOOTHING_RADIUS;
    if w < 2 * r + 1 || l < 2 * r + 1 {
        return;
    }
    let source = vertices.to_vec();
    for i in 2..l - 2 {
        for j in 2..w - 2 {
            let mut height = 0.0;
            let mut normal = Vec3::ZERO;
            let mut count = 0usize;
            for y in i.saturating_sub(r)..=i + r {
                if y < r || y > l - 1 - r {
                    continue;
                }
                for x in j.saturating_sub(r)..=j + r {
                    if x < r || x > w - 1 - r {
                        continue;
                    }
                    let v = &source[x + y * w];
                    height += v.position[1];
                    normal += v.norm();
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }
            let v = &mut vertices[i * w + j];
            v.position[1] = height / count as f32;
            v.normal = normal.try_normalize().unwrap_or(Vec3::Y).to_array();
        }
    }
}

/// A height map placed in the world: the terrain mesh built with the same
/// `width` and `length`, translated by `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGround {
    pub map: HeightMap,
    pub width: f32,
    pub length: f32,
    pub origin: Vec3,
}

impl TerrainGround {
    pub fn new(map: HeightMap, width: f32, length: f32, origin: Vec3) -> Self {
        Self {
            map,
            width,
            length,
            origin,
        }
    }

    /// World XZ to fractional pixel coordinates.
    pub fn to_map(&self, x: f32, z: f32) -> (f32, f32) {
        let dx = self.width / (self.map.width() - 1) as f32;
        let dz = self.length / (self.map.length() - 1) as f32;
        let fx = (x - self.origin.x + 0.5 * self.width) / dx;
        let fz = (self.origin.z + 0.5 * self.length - z) / dz;
        (fx, fz)
    }

    pub fn mesh(&self, name: &str, smooth: bool) -> MeshData {
        self.map.build_mesh(name, self.width, self.length, smooth)
    }
}

impl Ground for TerrainGround {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let (fx, fz) = self.to_map(x, z);
        self.map.height_at(fx, fz) + self.origin.y
    }
}
