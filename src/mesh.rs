//! CPU-side mesh data.
//!
//! Vertex formats are `#[repr(C)]` and `Pod`, so buffers can be handed to a
//! renderer with `bytemuck::cast_slice`. Meshes live in a [`MeshRegistry`]
//! and are referred to by generational [`MeshHandle`]s.

use crate::bone::{BonePalette, Skeleton};
use crate::error::AssetError;
use crate::math::{Mat4, Vec2, Vec3};
use static_assertions::const_assert_eq;

/// Maximum bone influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Vertex format for static meshes
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex format for GPU-skinned mesh rendering
///
/// Up to four (bone, weight) pairs. Unused slots have weight 0.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone_indices: [u32; MAX_INFLUENCES],
    pub bone_weights: [f32; MAX_INFLUENCES],
}

const_assert_eq!(std::mem::size_of::<Vertex>(), 32);
const_assert_eq!(std::mem::size_of::<SkinnedVertex>(), 64);

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    pub fn norm(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    #[inline]
    pub fn tex(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }

    /// Attribute-wise interpolation with a single parameter.
    pub fn lerp(&self, other: &Vertex, t: f32) -> Vertex {
        Vertex::new(
            self.pos().lerp(other.pos(), t),
            self.norm().lerp(other.norm(), t),
            self.tex().lerp(other.tex(), t),
        )
    }

    /// Bit pattern of all attributes; equal keys mean identical vertices.
    #[inline]
    pub fn bits(&self) -> [u32; 8] {
        bytemuck::cast(*self)
    }
}

impl SkinnedVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
            ..Default::default()
        }
    }

    /// Record an influence. When all slots are taken the weakest one is
    /// replaced if `weight` is larger. Returns whether it was stored.
    pub fn add_influence(&mut self, bone: u32, weight: f32) -> bool {
        if let Some(slot) = self.bone_weights.iter().position(|&w| w == 0.0) {
            self.bone_indices[slot] = bone;
            self.bone_weights[slot] = weight;
            return true;
        }
        let (weakest, &min) = self
            .bone_weights
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        if weight > min {
            self.bone_indices[weakest] = bone;
            self.bone_weights[weakest] = weight;
            true
        } else {
            false
        }
    }

    /// Rescale weights to sum to 1. Unweighted vertices bind fully to their
    /// first slot.
    pub fn normalize_weights(&mut self) {
        let sum: f32 = self.bone_weights.iter().sum();
        if sum > 0.0 {
            for w in &mut self.bone_weights {
                *w /= sum;
            }
        } else {
            self.bone_weights = [1.0, 0.0, 0.0, 0.0];
        }
    }

    /// Blend of the palette matrices by this vertex's weights.
    pub fn skin_matrix(&self, palette: &BonePalette) -> Mat4 {
        let mut m = Mat4::ZERO;
        for (&bone, &weight) in self.bone_indices.iter().zip(&self.bone_weights) {
            if weight == 0.0 {
                continue;
            }
            if let Some(bone_m) = palette.as_slice().get(bone as usize) {
                m += *bone_m * weight;
            }
        }
        m
    }

    /// CPU skinning into a static vertex.
    pub fn skin(&self, palette: &BonePalette) -> Vertex {
        let m = self.skin_matrix(palette);
        let position = m.transform_point3(Vec3::from_array(self.position));
        let normal = m
            .transform_vector3(Vec3::from_array(self.normal))
            .normalize_or_zero();
        Vertex::new(position, normal, Vec2::from_array(self.uv))
    }
}

/// Named index range within a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submesh {
    pub name: String,
    /// Added to every index of the range
    pub base_vertex: u32,
    pub base_index: u32,
    pub index_count: u32,
}

impl Submesh {
    pub fn whole(name: impl Into<String>, index_count: usize) -> Self {
        Self {
            name: name.into(),
            base_vertex: 0,
            base_index: 0,
            index_count: index_count as u32,
        }
    }

    pub fn index_range(&self) -> std::ops::Range<usize> {
        let start = self.base_index as usize;
        start..start + self.index_count as usize
    }
}

/// Owned triangle list with submeshes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<Submesh>,
}

impl MeshData {
    /// Mesh with a single submesh covering every index.
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let name = name.into();
        let submeshes = vec![Submesh::whole(name.clone(), indices.len())];
        Self {
            name,
            vertices,
            indices,
            submeshes,
        }
    }

    pub fn submesh(&self, index: usize) -> Option<&Submesh> {
        self.submeshes.get(index)
    }

    pub fn find_submesh(&self, name: &str) -> Option<usize> {
        self.submeshes.iter().position(|s| s.name == name)
    }

    /// Append geometry as a new submesh and return its index.
    pub fn append_submesh(&mut self, name: impl Into<String>, vertices: &[Vertex], indices: &[u32]) -> usize {
        self.submeshes.push(Submesh {
            name: name.into(),
            base_vertex: self.vertices.len() as u32,
            base_index: self.indices.len() as u32,
            index_count: indices.len() as u32,
        });
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        self.submeshes.len() - 1
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Axis-aligned bounds, or `None` when there are no vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.pos();
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.min(v.pos()), hi.max(v.pos()))
        }))
    }
}

/// Skinned counterpart of [`MeshData`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinnedMeshData {
    pub name: String,
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<Submesh>,
}

impl SkinnedMeshData {
    /// Check bone references against `skeleton` and renormalise weights.
    pub fn prepare(&mut self, skeleton: &Skeleton) -> Result<(), AssetError> {
        let bone_count = skeleton.bone_count();
        for (i, v) in self.vertices.iter_mut().enumerate() {
            for (&bone, &weight) in v.bone_indices.iter().zip(&v.bone_weights) {
                if weight > 0.0 && bone as usize >= bone_count {
                    return Err(AssetError::BoneIndexOutOfRange {
                        vertex: i,
                        bone,
                        bone_count,
                    });
                }
            }
            v.normalize_weights();
        }
        Ok(())
    }

    /// Bake the current pose into a static mesh, e.g. to slice it.
    pub fn skin(&self, palette: &BonePalette) -> MeshData {
        MeshData {
            name: self.name.clone(),
            vertices: self.vertices.iter().map(|v| v.skin(palette)).collect(),
            indices: self.indices.clone(),
            submeshes: self.submeshes.clone(),
        }
    }
}

/// Generational reference to a mesh in a [`MeshRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    mesh: Option<MeshData>,
}

/// Arena of meshes. Removing a mesh bumps its slot's generation so stale
/// handles resolve to `None`.
#[derive(Debug, Clone, Default)]
pub struct MeshRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: MeshData) -> MeshHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.mesh = Some(mesh);
            return MeshHandle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            mesh: Some(mesh),
        });
        MeshHandle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.mesh.as_ref())
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut MeshData> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.mesh.as_mut())
    }

    pub fn remove(&mut self, handle: MeshHandle) -> Option<MeshData> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let mesh = slot.mesh.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(mesh)
    }

    pub fn contains(&self, handle: MeshHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &MeshData)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.mesh.as_ref().map(|m| {
                (
                    MeshHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    m,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::BonePalette;

    fn named(name: &str) -> MeshData {
        MeshData::new(name, vec![Vertex::default(); 3], vec![0, 1, 2])
    }

    #[test]
    fn test_stale_handle_resolves_to_none() {
        let mut registry = MeshRegistry::new();
        let a = registry.insert(named("a"));
        assert_eq!(registry.remove(a).unwrap().name, "a");
        let b = registry.insert(named("b"));

        // Same slot, new generation.
        assert_eq!(registry.len(), 1);
        assert!(registry.get(a).is_none());
        assert!(registry.remove(a).is_none());
        assert_eq!(registry.get(b).unwrap().name, "b");
        assert_eq!(registry.iter().count(), 1);
    }

    #[test]
    fn test_influences_fill_then_replace_weakest() {
        let mut v = SkinnedVertex::default();
        assert!(v.add_influence(3, 0.4));
        assert!(v.add_influence(1, 0.1));
        assert!(v.add_influence(7, 0.3));
        assert!(v.add_influence(2, 0.2));
        assert!(!v.add_influence(9, 0.05));
        assert!(v.add_influence(5, 0.5));
        assert_eq!(v.bone_indices, [3, 5, 7, 2]);

        v.normalize_weights();
        let sum: f32 = v.bone_weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unweighted_vertex_binds_first_slot() {
        let mut v = SkinnedVertex::default();
        v.normalize_weights();
        assert_eq!(v.bone_weights, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cpu_skinning_blends_translations() {
        let mut v = SkinnedVertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO);
        v.add_influence(0, 1.0);
        v.add_influence(1, 1.0);
        v.normalize_weights();

        let palette = BonePalette::from_matrices(vec![
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
        ]);
        let out = v.skin(&palette);
        assert_eq!(out.pos(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(out.norm(), Vec3::Y);
    }

    #[test]
    fn test_bits_distinguish_signed_zero() {
        let a = Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO);
        let b = Vertex::new(Vec3::new(-0.0, 0.0, 0.0), Vec3::Y, Vec2::ZERO);
        assert_eq!(a, b);
        assert_ne!(a.bits(), b.bits());
    }

    #[test]
    fn test_append_submesh_offsets() {
        let mut mesh = named("base");
        let s = mesh.append_submesh("extra", &[Vertex::default(); 3], &[0, 1, 2]);
        let sub = mesh.submesh(s).unwrap();
        assert_eq!(sub.base_vertex, 3);
        assert_eq!(sub.index_range(), 3..6);
        assert_eq!(mesh.find_submesh("extra"), Some(1));
        assert_eq!(mesh.vertex_bytes().len(), 6 * 32);
    }
}
