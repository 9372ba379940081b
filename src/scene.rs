//! Scene state and the per-frame control flow.
//!
//! `Scene` owns everything a frame needs and is passed around explicitly;
//! the web layer keeps one behind a thread-local and forwards calls to it.

use crate::animation::{sample_animation, AnimationLibrary};
use crate::bone::{BonePalette, Pose, Skeleton};
use crate::camera::{CameraPose, CameraRig};
use crate::config::SandboxConfig;
use crate::error::{AssetError, SliceError};
use crate::math::{Mat4, Plane, Quat, Vec3};
use crate::mesh::{MeshData, MeshHandle, MeshRegistry};
use crate::player::{InputState, Player, StateId, Transition};
use crate::slice::slice_mesh;
use crate::terrain::{FlatGround, Ground, TerrainGround};
use crate::timer::TimeStep;

/// Index of an entity in its [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Something placed in the world, optionally drawn with a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshHandle>,
    /// Submesh of `mesh` that is drawn and sliced
    pub submesh: usize,
}

impl Entity {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            mesh: None,
            submesh: 0,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshHandle, submesh: usize) -> Self {
        self.mesh = Some(mesh);
        self.submesh = submesh;
        self
    }
}

/// Everything a renderer needs after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub bone_palette: BonePalette,
    /// Player model matrix: yaw, then position
    pub player_transform: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub state: StateId,
    pub transitions: Vec<Transition>,
}

pub struct Scene {
    config: SandboxConfig,
    skeleton: Skeleton,
    library: AnimationLibrary,
    pose: Pose,
    player: Player,
    camera: CameraRig,
    meshes: MeshRegistry,
    entities: Vec<Entity>,
    ground: Box<dyn Ground>,
}

impl Scene {
    pub fn new(config: SandboxConfig, skeleton: Skeleton, library: AnimationLibrary) -> Self {
        let pose = Pose::new(&skeleton);
        let player = Player::new(&config);
        let mut camera = CameraRig::new(config.camera);
        camera.update(&player);
        Self {
            skeleton,
            library,
            pose,
            player,
            camera,
            meshes: MeshRegistry::new(),
            entities: Vec::new(),
            ground: Box::new(FlatGround),
            config,
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    /// Parse a clip and add it to the library. Returns its index.
    pub fn load_clip_json(&mut self, json: &str) -> Result<usize, AssetError> {
        self.library.load_json(json, &self.skeleton)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshHandle {
        self.meshes.insert(mesh)
    }

    pub fn set_ground(&mut self, ground: Box<dyn Ground>) {
        self.ground = ground;
    }

    pub fn ground(&self) -> &dyn Ground {
        &*self.ground
    }

    /// Use `terrain` as the ground and spawn its mesh at the terrain origin.
    pub fn set_terrain(&mut self, terrain: TerrainGround, smooth: bool) -> EntityId {
        let mesh = self.add_mesh(terrain.mesh("terrain", smooth));
        let transform = Transform::from_translation(terrain.origin);
        log::info!(
            "Terrain {}x{} over {}x{} units",
            terrain.map.width(),
            terrain.map.length(),
            terrain.width,
            terrain.length
        );
        self.ground = Box::new(terrain);
        self.spawn(Entity::new("terrain", transform).with_mesh(mesh, 0))
    }

    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len() as u32);
        log::debug!("Spawned entity {} '{}'", id.0, entity.name);
        self.entities.push(entity);
        id
    }

    /// Spawn `entity` `distance` units ahead of the player, `height` above
    /// its feet. The entity's rotation and scale are kept.
    pub fn spawn_in_front(&mut self, mut entity: Entity, distance: f32, height: f32) -> EntityId {
        let motion = &self.player.motion;
        entity.transform.translation = motion.position + motion.forward() * distance + Vec3::Y * height;
        self.spawn(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0 as usize)
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    /// Run one frame: locomotion, animation, camera.
    pub fn tick(&mut self, step: TimeStep, input: &InputState) -> FrameOutput {
        let transitions = self.player.tick(step, input, &*self.ground);

        sample_animation(
            &self.library,
            &self.config.animation.clip_table,
            self.player.state(),
            self.player.anim_time(),
            &self.skeleton,
            &mut self.pose,
        );
        let camera: &CameraPose = self.camera.update(&self.player);
        let view = camera.view;

        let motion = &self.player.motion;
        FrameOutput {
            bone_palette: self.pose.palette().clone(),
            player_transform: Mat4::from_rotation_translation(motion.yaw, motion.position),
            view,
            projection: self.camera.projection_matrix(),
            state: self.player.state(),
            transitions,
        }
    }

    /// Cut an entity's mesh with a world-space plane.
    ///
    /// Non-empty halves become new meshes and new entities with the source
    /// transform, pushed apart along the plane normal by the configured
    /// separation. The source entity is left untouched. Returns the spawned
    /// entities, positive half first.
    pub fn slice_entity(&mut self, id: EntityId, plane: &Plane) -> Result<Vec<EntityId>, SliceError> {
        let source = self.entity(id).ok_or(SliceError::UnknownEntity(id.0))?;
        let handle = source.mesh.ok_or(SliceError::UnknownMesh)?;
        let mesh = self.meshes.get(handle).ok_or(SliceError::UnknownMesh)?;
        let world_normal = plane.unit_normal().ok_or(SliceError::InvalidPlane)?;

        // dot(P, M * p) == dot(M^T * P, p)
        let to_world = source.transform.matrix();
        let local = Plane::from_vec4(to_world.transpose() * plane.to_vec4());
        let result = slice_mesh(mesh, source.submesh, &local)?;

        let base = source.clone();
        let separation = self.config.slice.separation;
        let mut spawned = Vec::with_capacity(2);
        for (half, sign) in [(result.positive, 1.0), (result.negative, -1.0)] {
            if half.is_empty() {
                continue;
            }
            let mut entity = Entity::new(half.name.clone(), base.transform);
            entity.transform.translation += world_normal * separation * sign;
            entity = entity.with_mesh(self.meshes.insert(half), 0);
            spawned.push(self.spawn(entity));
        }
        log::info!("Sliced '{}' into {} part(s)", base.name, spawned.len());
        Ok(spawned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::test_rig;
    use crate::player::Key;
    use crate::shapes::box_mesh;
    use crate::shapes::tests::assert_watertight;
    use crate::terrain::HeightMap;

    fn scene() -> Scene {
        let skeleton = test_rig::skeleton();
        let mut library = AnimationLibrary::new();
        library.add_clip(test_rig::sway_clip(), &skeleton).unwrap();
        Scene::new(SandboxConfig::default(), skeleton, library)
    }

    fn spawn_box(scene: &mut Scene, transform: Transform) -> EntityId {
        let mesh = scene.add_mesh(box_mesh("box", Vec3::splat(0.5)));
        scene.spawn(Entity::new("box", transform).with_mesh(mesh, 0))
    }

    #[test]
    fn test_tick_produces_frame() {
        let mut scene = scene();
        let mut input = InputState::default();
        input.key_down(Key::Forward);
        let out = scene.tick(TimeStep::fixed(1.0 / 60.0), &input);
        assert_eq!(out.bone_palette.len(), scene.skeleton().bone_count());
        assert_eq!(out.view, scene.camera().view_matrix());
        assert_eq!(out.state, scene.player().state());
        assert!(scene.player().motion.position.z > 0.0);
        assert_eq!(
            out.player_transform.w_axis.truncate(),
            scene.player().motion.position
        );
    }

    #[test]
    fn test_slice_spawns_separated_halves() {
        let mut scene = scene();
        let source = spawn_box(
            &mut scene,
            Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)).with_scale(Vec3::splat(50.0)),
        );
        // x = 10 in world is the box's local x = 0.
        let plane = Plane::from_point_normal(Vec3::new(10.0, 0.0, 0.0), Vec3::X);
        let parts = scene.slice_entity(source, &plane).unwrap();
        assert_eq!(parts.len(), 2);

        let separation = scene.config().slice.separation;
        let pos = scene.entity(parts[0]).unwrap();
        let neg = scene.entity(parts[1]).unwrap();
        assert_eq!(pos.name, "box_pos");
        assert_eq!(pos.transform.translation, Vec3::new(10.0 + separation, 0.0, 0.0));
        assert_eq!(neg.transform.translation, Vec3::new(10.0 - separation, 0.0, 0.0));

        for part in [pos, neg] {
            let mesh = scene.meshes().get(part.mesh.unwrap()).unwrap();
            assert_watertight(mesh);
            assert_eq!(mesh.triangle_count(), 22);
        }
        // Source entity and its mesh are kept.
        assert!(scene.entity(source).unwrap().mesh.is_some());
        assert_eq!(scene.meshes().len(), 3);
    }

    #[test]
    fn test_slice_uses_local_space() {
        let mut scene = scene();
        let rotated = Transform {
            translation: Vec3::new(0.0, 5.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::ONE,
        };
        let source = spawn_box(&mut scene, rotated);
        // Horizontal cut at y = 5.25; local x axis points up.
        let plane = Plane::from_point_normal(Vec3::new(0.0, 5.25, 0.0), Vec3::Y);
        let parts = scene.slice_entity(source, &plane).unwrap();
        let upper = scene.entity(parts[0]).unwrap();
        let mesh = scene.meshes().get(upper.mesh.unwrap()).unwrap();
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((lo.x - 0.25).abs() < 1e-5 && (hi.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_slice_missing_everything() {
        let mut scene = scene();
        assert_eq!(
            scene.slice_entity(EntityId(3), &Plane::new(1.0, 0.0, 0.0, 0.0)),
            Err(SliceError::UnknownEntity(3))
        );
        let bare = scene.spawn(Entity::new("marker", Transform::default()));
        assert_eq!(
            scene.slice_entity(bare, &Plane::new(1.0, 0.0, 0.0, 0.0)),
            Err(SliceError::UnknownMesh)
        );
        let boxed = spawn_box(&mut scene, Transform::default());
        assert_eq!(
            scene.slice_entity(boxed, &Plane::new(0.0, 0.0, 0.0, 1.0)),
            Err(SliceError::InvalidPlane)
        );
        // A miss spawns only one half.
        let parts = scene.slice_entity(boxed, &Plane::new(1.0, 0.0, 0.0, 4.0)).unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_spawn_in_front_of_player() {
        let mut scene = scene();
        let id = scene.spawn_in_front(Entity::new("crate", Transform::default()), 100.0, 130.0);
        assert_eq!(
            scene.entity(id).unwrap().transform.translation,
            Vec3::new(0.0, 130.0, 100.0)
        );
    }

    #[test]
    fn test_terrain_becomes_ground() {
        let mut scene = scene();
        let map = HeightMap::from_heights(3, 3, vec![2.0; 9]).unwrap();
        let terrain = scene.set_terrain(TerrainGround::new(map, 10.0, 10.0, Vec3::ZERO), false);
        assert_eq!(scene.entity(terrain).unwrap().name, "terrain");
        assert_eq!(scene.ground().height_at(0.0, 0.0), 2.0);

        // The player starts below the surface and is lifted onto it.
        scene.tick(TimeStep::fixed(1.0 / 60.0), &InputState::default());
        assert_eq!(scene.player().motion.position.y, 2.0);
    }
}
