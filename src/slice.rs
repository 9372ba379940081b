//! Split a closed triangle mesh by a plane into two capped halves.
//!
//! Vertices are classified by the sign of their plane distance; vertices
//! exactly on the plane go to both halves. Every crossing edge is cut by
//! interpolating from its positive endpoint towards its negative one, so the
//! two triangles sharing an edge produce bit-identical cut vertices. The
//! hole left on each half is closed with a fan around the centroid of the
//! cut edges.
//!
//! Edges the plane merely touches are not cut: two same-side triangles
//! meeting on the plane, or a side triangle next to a face lying in the
//! plane, leave nothing to cap. A half made only of in-plane faces has no
//! volume and is dropped when the other half has some.
//!
//! The fan is only correct when the cut boundary of a half is a single
//! simple loop. Several disjoint loops (a torus cut through its hole, for
//! example) still produce triangles, but the cap bridges between loops.

use crate::error::SliceError;
use crate::math::{Plane, Vec2, Vec3};
use crate::mesh::{MeshData, Vertex};
use std::collections::HashMap;

const POSITIVE: usize = 0;
const NEGATIVE: usize = 1;
const ABSENT: u32 = u32::MAX;

/// Both halves of a slice.
///
/// A half without triangles means the mesh did not reach that side.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    /// Part on the side the plane normal points to
    pub positive: MeshData,
    pub negative: MeshData,
}

impl SliceResult {
    pub fn positive_is_empty(&self) -> bool {
        self.positive.is_empty()
    }

    pub fn negative_is_empty(&self) -> bool {
        self.negative.is_empty()
    }

    /// Whether the plane actually split the mesh in two.
    pub fn is_split(&self) -> bool {
        !self.positive_is_empty() && !self.negative_is_empty()
    }

    /// Non-empty halves, positive first.
    pub fn into_halves(self) -> impl Iterator<Item = MeshData> {
        [self.positive, self.negative]
            .into_iter()
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Positive,
    Negative,
    On,
}

impl Side {
    /// Half an off-plane vertex belongs to.
    fn half(self) -> usize {
        match self {
            Side::Positive => POSITIVE,
            Side::Negative | Side::On => NEGATIVE,
        }
    }
}

#[derive(Debug, Default)]
struct Half {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    /// Boundary edges on the plane, wound the way the cap must traverse them.
    cut_edges: Vec<[u32; 2]>,
    /// Edges of triangles lying in the plane, in their own winding.
    closed_edges: Vec<[u32; 2]>,
    /// Number of triangles lying in the plane
    flat_triangles: usize,
}

impl Half {
    fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    fn position_key(&self, v: u32) -> [u32; 3] {
        self.vertices[v as usize].position.map(|f| (f + 0.0).to_bits())
    }

    /// Undirected position key of an edge and the direction it runs in.
    fn edge_key(&self, [a, b]: [u32; 2]) -> (([u32; 3], [u32; 3]), i32) {
        let (ka, kb) = (self.position_key(a), self.position_key(b));
        if ka <= kb {
            ((ka, kb), 1)
        } else {
            ((kb, ka), -1)
        }
    }

    /// Drop cut edges the surface already closes.
    ///
    /// A cut edge is cancelled by the same edge wound the other way (two
    /// triangles of this half meet on the plane) or by an in-plane triangle
    /// running along it. Edges are matched by position, so unwelded meshes
    /// cancel too.
    fn cancel_closed_edges(&mut self) {
        let mut net: HashMap<([u32; 3], [u32; 3]), i32> = HashMap::new();
        for &edge in &self.cut_edges {
            let (key, dir) = self.edge_key(edge);
            *net.entry(key).or_insert(0) += dir;
        }
        for &edge in &self.closed_edges {
            let (key, dir) = self.edge_key(edge);
            *net.entry(key).or_insert(0) -= dir;
        }

        let open: Vec<[u32; 2]> = self
            .cut_edges
            .iter()
            .copied()
            .filter(|&edge| {
                let (key, dir) = self.edge_key(edge);
                match net.get_mut(&key) {
                    Some(n) if *n * dir > 0 => {
                        *n -= dir;
                        true
                    }
                    _ => false,
                }
            })
            .collect();
        self.cut_edges = open;
    }

    /// Has triangles, all of them in the plane.
    fn is_flat(&self) -> bool {
        !self.indices.is_empty() && self.flat_triangles * 3 == self.indices.len()
    }
}

struct Slicer<'a> {
    source: &'a [Vertex],
    side: Vec<Side>,
    distance: Vec<f32>,
    /// Source vertex -> index in each half, or `ABSENT`.
    remap: Vec<[u32; 2]>,
    halves: [Half; 2],
    /// Cut vertex bits -> index in each half.
    cut_vertices: HashMap<[u32; 8], [u32; 2]>,
}

impl<'a> Slicer<'a> {
    fn new(plane: Plane, source: &'a [Vertex]) -> Self {
        let mut slicer = Self {
            source,
            side: Vec::with_capacity(source.len()),
            distance: Vec::with_capacity(source.len()),
            remap: Vec::with_capacity(source.len()),
            halves: [Half::default(), Half::default()],
            cut_vertices: HashMap::new(),
        };

        for v in source {
            let dp = plane.signed_distance(v.pos());
            let side = if dp > 0.0 {
                Side::Positive
            } else if dp < 0.0 {
                Side::Negative
            } else {
                Side::On
            };
            let mut slots = [ABSENT; 2];
            for half in [POSITIVE, NEGATIVE] {
                if side == Side::On || side.half() == half {
                    slots[half] = slicer.halves[half].vertices.len() as u32;
                    slicer.halves[half].vertices.push(*v);
                }
            }
            slicer.side.push(side);
            slicer.distance.push(dp);
            slicer.remap.push(slots);
        }
        slicer
    }

    #[inline]
    fn slot(&self, v: u32, half: usize) -> u32 {
        self.remap[v as usize][half]
    }

    fn copy_triangle(&mut self, tri: [u32; 3], half: usize) {
        let [a, b, c] = tri.map(|v| self.slot(v, half));
        self.halves[half].push_triangle(a, b, c);
    }

    /// Vertex where the edge `a`-`b` crosses the plane, added to both halves
    /// once.
    fn cut(&mut self, a: u32, b: u32) -> [u32; 2] {
        let (p, q) = if self.distance[a as usize] > 0.0 {
            (a, b)
        } else {
            (b, a)
        };
        let dp = self.distance[p as usize];
        let dq = self.distance[q as usize];
        let t = dp / (dp - dq);
        let vertex = self.source[p as usize].lerp(&self.source[q as usize], t);

        let halves = &mut self.halves;
        *self.cut_vertices.entry(vertex.bits()).or_insert_with(|| {
            [POSITIVE, NEGATIVE].map(|h| {
                halves[h].vertices.push(vertex);
                (halves[h].vertices.len() - 1) as u32
            })
        })
    }

    fn triangle(&mut self, tri: [u32; 3]) {
        let sides = tri.map(|v| self.side[v as usize]);
        let count = |s: Side| sides.iter().filter(|&&x| x == s).count();
        let (pos, neg, on) = (count(Side::Positive), count(Side::Negative), count(Side::On));

        match (pos, neg) {
            (0, 0) => {
                for half in [POSITIVE, NEGATIVE] {
                    self.copy_triangle(tri, half);
                    let [a, b, c] = tri.map(|v| self.slot(v, half));
                    let half = &mut self.halves[half];
                    half.closed_edges.extend_from_slice(&[[a, b], [b, c], [c, a]]);
                    half.flat_triangles += 1;
                }
            }
            (_, 0) | (0, _) => {
                let half = if neg == 0 { POSITIVE } else { NEGATIVE };
                self.copy_triangle(tri, half);
                if on == 2 {
                    self.on_plane_edge(tri, sides, half);
                }
            }
            (1, 1) => self.split_through_vertex(tri, sides),
            _ => self.split_lone(tri, sides),
        }
    }

    /// Two vertices on the plane: their edge is part of the cut boundary.
    fn on_plane_edge(&mut self, tri: [u32; 3], sides: [Side; 3], half: usize) {
        let Some(k) = sides.iter().position(|&s| s != Side::On) else {
            return;
        };
        let a = self.slot(tri[(k + 1) % 3], half);
        let b = self.slot(tri[(k + 2) % 3], half);
        self.halves[half].cut_edges.push([b, a]);
    }

    /// One vertex on the plane, the other two on opposite sides.
    fn split_through_vertex(&mut self, tri: [u32; 3], sides: [Side; 3]) {
        let Some(k) = sides.iter().position(|&s| s == Side::On) else {
            return;
        };
        let m = tri[k];
        let o0 = tri[(k + 1) % 3];
        let o1 = tri[(k + 2) % 3];
        let h0 = sides[(k + 1) % 3].half();
        let h1 = sides[(k + 2) % 3].half();
        let n = self.cut(o0, o1);

        let (m0, o0s) = (self.slot(m, h0), self.slot(o0, h0));
        self.halves[h0].push_triangle(n[h0], m0, o0s);
        self.halves[h0].cut_edges.push([m0, n[h0]]);

        let (m1, o1s) = (self.slot(m, h1), self.slot(o1, h1));
        self.halves[h1].push_triangle(m1, n[h1], o1s);
        self.halves[h1].cut_edges.push([n[h1], m1]);
    }

    /// One vertex alone on its side: a triangle there, a quad on the other.
    fn split_lone(&mut self, tri: [u32; 3], sides: [Side; 3]) {
        let lone_side = if sides.iter().filter(|&&s| s == Side::Positive).count() == 1 {
            Side::Positive
        } else {
            Side::Negative
        };
        let Some(k) = sides.iter().position(|&s| s == lone_side) else {
            return;
        };
        let lone = tri[k];
        let s0 = tri[(k + 1) % 3];
        let s1 = tri[(k + 2) % 3];
        let lh = lone_side.half();
        let oh = 1 - lh;

        let n0 = self.cut(lone, s0);
        let n1 = self.cut(lone, s1);

        let l = self.slot(lone, lh);
        self.halves[lh].push_triangle(l, n0[lh], n1[lh]);
        self.halves[lh].cut_edges.push([n1[lh], n0[lh]]);

        let (a, b) = (self.slot(s0, oh), self.slot(s1, oh));
        self.halves[oh].push_triangle(n0[oh], b, n1[oh]);
        self.halves[oh].push_triangle(a, b, n0[oh]);
        self.halves[oh].cut_edges.push([n0[oh], n1[oh]]);
    }

    fn finish(mut self, unit_normal: Vec3) -> [Half; 2] {
        for (h, half) in self.halves.iter_mut().enumerate() {
            let cap_normal = if h == POSITIVE { -unit_normal } else { unit_normal };
            half.cancel_closed_edges();
            build_cap(half, cap_normal);
        }
        let flat = [POSITIVE, NEGATIVE].map(|h| self.halves[h].is_flat());
        for h in [POSITIVE, NEGATIVE] {
            if flat[h] && !flat[1 - h] && !self.halves[1 - h].indices.is_empty() {
                self.halves[h] = Half::default();
            }
        }
        self.halves
    }
}

/// Close the cut boundary of `half` with a fan around its centroid.
///
/// Cap vertices are copies of the boundary vertices with a flat normal; the
/// side triangles keep their interpolated normals.
fn build_cap(half: &mut Half, normal: Vec3) {
    if half.cut_edges.is_empty() {
        return;
    }

    let mut sum = Vec3::ZERO;
    for &[a, b] in &half.cut_edges {
        sum += half.vertices[a as usize].pos() + half.vertices[b as usize].pos();
    }
    let centroid = sum / (2 * half.cut_edges.len()) as f32;

    let mut copies: HashMap<u32, u32> = HashMap::new();
    let edges = std::mem::take(&mut half.cut_edges);
    let center = half.vertices.len() as u32;
    half.vertices
        .push(Vertex::new(centroid, normal, Vec2::splat(0.5)));

    for &[a, b] in &edges {
        let [ca, cb] = [a, b].map(|v| {
            *copies.entry(v).or_insert_with(|| {
                let mut copy = half.vertices[v as usize];
                copy.normal = normal.to_array();
                half.vertices.push(copy);
                (half.vertices.len() - 1) as u32
            })
        });
        half.push_triangle(ca, cb, center);
    }
    half.cut_edges = edges;
}

/// Slice submesh `submesh` of `mesh` by `plane`.
///
/// The halves are named `<mesh>_pos` and `<mesh>_neg` and each carry a
/// single submesh. Every vertex referenced by the submesh range is kept in
/// at least one half.
pub fn slice_mesh(mesh: &MeshData, submesh: usize, plane: &Plane) -> Result<SliceResult, SliceError> {
    let range = mesh
        .submesh(submesh)
        .ok_or(SliceError::UnknownSubmesh(submesh))?;
    let unit_normal = plane
        .unit_normal()
        .filter(|_| plane.is_valid())
        .ok_or(SliceError::InvalidPlane)?;

    let start = range.base_index as usize;
    let end = start + range.index_count as usize;
    if end > mesh.indices.len() {
        return Err(SliceError::SubmeshOutOfRange {
            base_index: start,
            end,
            len: mesh.indices.len(),
        });
    }
    let indices = &mesh.indices[start..end];
    if indices.len() % 3 != 0 {
        return Err(SliceError::NotTriangles(indices.len()));
    }

    let base_vertex = range.base_vertex as usize;
    let referenced = indices.iter().max().map_or(0, |&m| m as usize + 1);
    if base_vertex + referenced > mesh.vertices.len() {
        return Err(SliceError::IndexOutOfRange {
            index: referenced.saturating_sub(1) as u32,
            base_vertex,
            len: mesh.vertices.len(),
        });
    }
    let source = &mesh.vertices[base_vertex..base_vertex + referenced];

    let mut slicer = Slicer::new(*plane, source);
    for tri in indices.chunks_exact(3) {
        slicer.triangle([tri[0], tri[1], tri[2]]);
    }
    let [positive, negative] = slicer.finish(unit_normal);

    let result = SliceResult {
        positive: MeshData::new(format!("{}_pos", mesh.name), positive.vertices, positive.indices),
        negative: MeshData::new(format!("{}_neg", mesh.name), negative.vertices, negative.indices),
    };
    if !result.is_split() {
        log::debug!(
            "Slice of '{}' did not split it (positive {} tris, negative {} tris)",
            mesh.name,
            result.positive.triangle_count(),
            result.negative.triangle_count()
        );
    }
    Ok(result)
}
