//! In-memory scene implementing every collaborator trait
//!
//! Used by the headless demo and by tests. All clones share one underlying
//! state, so a test can hand a clone to the fire system and inspect what was
//! spawned, pushed to the environment or removed through its own handle.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::{
    Aabb, EffectHandle, EffectKind, Environment, HazeSettings, SceneGeometry, SceneObjects,
    SpatialHashGrid, SpatialQuery, VisualEffects,
};
use crate::core_types::{TargetId, Vec3};

/// A transient effect request as recorded by the sandbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnedEffect {
    pub kind: EffectKind,
    pub position: Vec3,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy)]
struct SandboxObject {
    position: Vec3,
    bounds: Option<Aabb>,
}

#[derive(Debug)]
struct SandboxState {
    objects: FxHashMap<TargetId, SandboxObject>,
    index: SpatialHashGrid,
    transient: Vec<SpawnedEffect>,
    persistent: FxHashMap<EffectHandle, (EffectKind, Vec3)>,
    stopped: Vec<EffectHandle>,
    next_handle: u64,
    haze: Option<HazeSettings>,
    haze_updates: usize,
    focus_distance: Option<f32>,
    aperture: Option<f32>,
    removed: Vec<TargetId>,
}

/// Shared handle to an in-memory scene
#[derive(Debug, Clone)]
pub struct SandboxScene {
    state: Rc<RefCell<SandboxState>>,
}

impl Default for SandboxScene {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl SandboxScene {
    /// Create an empty scene whose spatial grid uses `cell_size`
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        Self {
            state: Rc::new(RefCell::new(SandboxState {
                objects: FxHashMap::default(),
                index: SpatialHashGrid::new(Vec3::zeros(), cell_size),
                transient: Vec::new(),
                persistent: FxHashMap::default(),
                stopped: Vec::new(),
                next_handle: 0,
                haze: None,
                haze_updates: 0,
                focus_distance: None,
                aperture: None,
                removed: Vec::new(),
            })),
        }
    }

    /// Add an object with no geometry (top-surface lookups use the fallback offset)
    pub fn add_object(&self, target: TargetId, position: Vec3) {
        self.insert(target, SandboxObject { position, bounds: None });
    }

    /// Add an object with a box of `half_extents` centred on `position`
    pub fn add_box(&self, target: TargetId, position: Vec3, half_extents: Vec3) {
        let bounds = Some(Aabb::from_center(position, half_extents));
        self.insert(target, SandboxObject { position, bounds });
    }

    fn insert(&self, target: TargetId, object: SandboxObject) {
        let mut state = self.state.borrow_mut();
        if let Some(previous) = state.objects.insert(target, object) {
            state.index.remove(target, previous.position);
        }
        state.index.insert(target, object.position);
    }

    /// Destroy an object from outside the fire system (not recorded as a burn removal)
    pub fn destroy(&self, target: TargetId) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.objects.remove(&target) {
            state.index.remove(target, object.position);
        }
    }

    /// Number of objects still in the scene
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Every transient effect requested so far
    #[must_use]
    pub fn transient_effects(&self) -> Vec<SpawnedEffect> {
        self.state.borrow().transient.clone()
    }

    /// Transient effects of one kind
    #[must_use]
    pub fn transient_count(&self, kind: EffectKind) -> usize {
        self.state
            .borrow()
            .transient
            .iter()
            .filter(|effect| effect.kind == kind)
            .count()
    }

    /// Persistent effects of one kind that are still alive
    #[must_use]
    pub fn active_persistent(&self, kind: EffectKind) -> Vec<Vec3> {
        self.state
            .borrow()
            .persistent
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|&(_, position)| position)
            .collect()
    }

    /// Handles that were stopped and removed
    #[must_use]
    pub fn stopped_effects(&self) -> Vec<EffectHandle> {
        self.state.borrow().stopped.clone()
    }

    /// Most recent haze settings pushed by the fire system
    #[must_use]
    pub fn haze(&self) -> Option<HazeSettings> {
        self.state.borrow().haze
    }

    /// How many times haze settings were pushed
    #[must_use]
    pub fn haze_updates(&self) -> usize {
        self.state.borrow().haze_updates
    }

    #[must_use]
    pub fn focus_distance(&self) -> Option<f32> {
        self.state.borrow().focus_distance
    }

    #[must_use]
    pub fn aperture(&self) -> Option<f32> {
        self.state.borrow().aperture
    }

    /// Objects removed by the fire system, in removal order
    #[must_use]
    pub fn removed(&self) -> Vec<TargetId> {
        self.state.borrow().removed.clone()
    }
}

impl SpatialQuery for SandboxScene {
    fn query_within_radius(&self, center: Vec3, radius: f32) -> Vec<TargetId> {
        self.state.borrow().index.query_radius(center, radius)
    }
}

impl SceneGeometry for SandboxScene {
    fn bounds(&self, target: TargetId) -> Option<Aabb> {
        self.state.borrow().objects.get(&target)?.bounds
    }

    fn position(&self, target: TargetId) -> Option<Vec3> {
        self.state
            .borrow()
            .objects
            .get(&target)
            .map(|object| object.position)
    }
}

impl VisualEffects for SandboxScene {
    fn spawn_transient(&mut self, kind: EffectKind, position: Vec3, duration: f32) {
        self.state.borrow_mut().transient.push(SpawnedEffect {
            kind,
            position,
            duration,
        });
    }

    fn spawn_persistent(&mut self, kind: EffectKind, position: Vec3) -> EffectHandle {
        let mut state = self.state.borrow_mut();
        let handle = EffectHandle(state.next_handle);
        state.next_handle += 1;
        state.persistent.insert(handle, (kind, position));
        handle
    }

    fn stop_and_remove(&mut self, handle: EffectHandle) {
        let mut state = self.state.borrow_mut();
        if state.persistent.remove(&handle).is_some() {
            state.stopped.push(handle);
        }
    }
}

impl Environment for SandboxScene {
    fn set_ambient_haze(&mut self, haze: &HazeSettings) {
        let mut state = self.state.borrow_mut();
        state.haze = Some(*haze);
        state.haze_updates += 1;
    }

    fn set_focus(&mut self, distance: f32, aperture: f32) {
        let mut state = self.state.borrow_mut();
        state.focus_distance = Some(distance);
        state.aperture = Some(aperture);
    }

    fn set_focus_distance(&mut self, distance: f32) {
        self.state.borrow_mut().focus_distance = Some(distance);
    }
}

impl SceneObjects for SandboxScene {
    fn contains(&self, target: TargetId) -> bool {
        self.state.borrow().objects.contains_key(&target)
    }

    fn remove(&mut self, target: TargetId) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.objects.remove(&target) {
            state.index.remove(target, object.position);
            state.removed.push(target);
        }
    }
}
