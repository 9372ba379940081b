//! Browser bindings.
//!
//! A single [`Scene`] lives in a thread-local together with the pending
//! input and the frame clock. Exported functions are thin wrappers that
//! borrow it and call into the core modules; errors cross the boundary as
//! strings.

use std::cell::RefCell;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::animation::AnimationLibrary;
use crate::bone::Skeleton;
use crate::config::SandboxConfig;
use crate::math::{MatrixConvention, Plane, Vec2, Vec3};
use crate::mesh::MeshData;
use crate::player::{InputState, Key};
use crate::scene::{Entity, EntityId, FrameOutput, Scene, Transform};
use crate::shapes::box_mesh;
use crate::terrain::{HeightMap, TerrainGround};
use crate::timer::FrameClock;

struct Session {
    scene: Scene,
    input: InputState,
    clock: FrameClock,
}

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

fn with_session<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&Session) -> R,
{
    SESSION.with(|s| s.borrow().as_ref().map(f))
}

fn with_session_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Session) -> R,
{
    SESSION.with(|s| s.borrow_mut().as_mut().map(f))
}

fn not_initialized() -> JsValue {
    JsValue::from_str("sandbox not initialized")
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Create the sandbox. An empty `config_json` uses the defaults.
#[wasm_bindgen]
pub fn init_sandbox(config_json: &str, skeleton_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    let config = if config_json.trim().is_empty() {
        SandboxConfig::default()
    } else {
        SandboxConfig::from_json(config_json).map_err(js_error)?
    };
    let skeleton = Skeleton::from_json(skeleton_json).map_err(js_error)?;
    let scene = Scene::new(config, skeleton, AnimationLibrary::new());

    SESSION.with(|s| {
        *s.borrow_mut() = Some(Session {
            scene,
            input: InputState::new(),
            clock: FrameClock::new(),
        });
    });
    log::info!("Sandbox initialized");
    Ok(())
}

/// Add a clip; returns its library index.
#[wasm_bindgen]
pub fn load_clip(json: &str) -> Result<usize, JsValue> {
    with_session_mut(|s| s.scene.load_clip_json(json).map_err(js_error)).unwrap_or_else(|| Err(not_initialized()))
}

/// Replace the ground with a 16-bit height map; returns the terrain entity.
#[wasm_bindgen]
pub fn load_height_map(
    bytes: &[u8],
    width: usize,
    length: usize,
    y_scale: f32,
    world_width: f32,
    world_length: f32,
    smooth: bool,
) -> Result<u32, JsValue> {
    let map = HeightMap::from_r16(width, length, y_scale, bytes).map_err(js_error)?;
    let terrain = TerrainGround::new(map, world_width, world_length, Vec3::ZERO);
    with_session_mut(|s| s.scene.set_terrain(terrain, smooth).raw()).ok_or_else(not_initialized)
}

/// Key codes follow [`Key`]'s discriminants. Unknown codes are ignored.
#[wasm_bindgen]
pub fn key_down(code: u8) {
    if let Some(key) = Key::from_u8(code) {
        with_session_mut(|s| s.input.key_down(key));
    }
}

#[wasm_bindgen]
pub fn key_up(code: u8) {
    if let Some(key) = Key::from_u8(code) {
        with_session_mut(|s| s.input.key_up(key));
    }
}

#[wasm_bindgen]
pub fn mouse_move(dx: f32, dy: f32) {
    with_session_mut(|s| s.input.add_look_delta(Vec2::new(dx, dy)));
}

#[wasm_bindgen]
pub fn resize(width: f32, height: f32) {
    with_session_mut(|s| s.scene.camera_mut().set_aspect(width, height));
}

#[wasm_bindgen]
pub fn pause() {
    with_session_mut(|s| s.clock.pause());
}

#[wasm_bindgen]
pub fn resume() {
    with_session_mut(|s| s.clock.resume());
}

/// Force the locomotion state by raw id; returns whether it changed.
#[wasm_bindgen]
pub fn request_transition(state: u32) -> bool {
    with_session_mut(|s| s.scene.player_mut().request_transition(state).is_some()).unwrap_or(false)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameJs {
    bone_palette: Vec<f32>,
    player_transform: [f32; 16],
    view: [f32; 16],
    projection: [f32; 16],
    state: &'static str,
    transitions: Vec<[&'static str; 2]>,
}

impl FrameJs {
    fn new(frame: &FrameOutput, convention: MatrixConvention) -> Self {
        Self {
            bone_palette: frame.bone_palette.to_gpu(convention),
            player_transform: convention.export(&frame.player_transform),
            view: convention.export(&frame.view),
            projection: convention.export(&frame.projection),
            state: frame.state.name(),
            transitions: frame
                .transitions
                .iter()
                .map(|t| [t.from.name(), t.to.name()])
                .collect(),
        }
    }
}

/// Advance to `now_seconds` (host clock) and return the frame as a JS
/// object with column-major matrices.
#[wasm_bindgen]
pub fn tick(now_seconds: f64) -> Result<JsValue, JsValue> {
    let frame = with_session_mut(|s| {
        let step = s.clock.tick(now_seconds);
        let frame = s.scene.tick(step, &s.input);
        s.input.end_tick();
        FrameJs::new(&frame, MatrixConvention::ColumnMajor)
    })
    .ok_or_else(not_initialized)?;
    serde_wasm_bindgen::to_value(&frame).map_err(js_error)
}

/// Spawn a box in front of the player; returns its entity id.
#[wasm_bindgen]
pub fn spawn_box(size: f32, distance: f32, height: f32) -> Result<u32, JsValue> {
    with_session_mut(|s| {
        let mesh = s.scene.add_mesh(box_mesh("box", Vec3::splat(0.5)));
        let entity = Entity::new("box", Transform::default().with_scale(Vec3::splat(size))).with_mesh(mesh, 0);
        s.scene.spawn_in_front(entity, distance, height).raw()
    })
    .ok_or_else(not_initialized)
}

/// Slice an entity by the world plane `a*x + b*y + c*z + d = 0`; returns
/// the ids of the spawned halves.
#[wasm_bindgen]
pub fn slice_entity(id: u32, a: f32, b: f32, c: f32, d: f32) -> Result<Vec<u32>, JsValue> {
    with_session_mut(|s| {
        s.scene
            .slice_entity(EntityId(id), &Plane::new(a, b, c, d))
            .map(|ids| ids.into_iter().map(EntityId::raw).collect())
            .map_err(js_error)
    })
    .unwrap_or_else(|| Err(not_initialized()))
}

fn with_entity_mesh<R>(id: u32, f: impl FnOnce(&MeshData) -> R) -> Option<R> {
    with_session(|s| {
        let entity = s.scene.entity(EntityId(id))?;
        s.scene.meshes().get(entity.mesh?).map(f)
    })
    .flatten()
}

/// Interleaved position/normal/uv floats of an entity's mesh.
#[wasm_bindgen]
pub fn mesh_vertices(id: u32) -> Vec<f32> {
    with_entity_mesh(id, |m| bytemuck::cast_slice(&m.vertices).to_vec()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn mesh_indices(id: u32) -> Vec<u32> {
    with_entity_mesh(id, |m| m.indices.clone()).unwrap_or_default()
}

/// Model matrix of an entity, column-major.
#[wasm_bindgen]
pub fn entity_transform(id: u32) -> Vec<f32> {
    with_session(|s| {
        s.scene
            .entity(EntityId(id))
            .map(|e| e.transform.matrix().to_cols_array().to_vec())
    })
    .flatten()
    .unwrap_or_default()
}
