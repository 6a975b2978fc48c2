//! Host scene collaborators
//!
//! The fire system never renders, queries physics or touches post-processing
//! itself. Everything it needs from the host goes through the narrow traits in
//! this module:
//!
//! - [`SpatialQuery`] - overlap queries used by heat propagators
//! - [`SceneGeometry`] - bounds and positions for effect anchors
//! - [`VisualEffects`] - spawn/stop of spark and fire visuals by semantic kind
//! - [`Environment`] - ambient haze and depth-of-field parameters
//! - [`SceneObjects`] - existence checks and removal of burnt-out objects
//!
//! [`SandboxScene`] implements all of them in memory.

pub mod sandbox;
pub mod spatial;

pub use sandbox::{SandboxScene, SpawnedEffect};
pub use spatial::SpatialHashGrid;

use crate::core_types::{Color, TargetId, Vec3};
use serde::{Deserialize, Serialize};

/// Vertical offset above the object origin used when it has no bounds
pub const DEFAULT_TOP_FALLBACK_OFFSET: f32 = 0.5;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centred on `center` extending `half_extents` along each axis
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Centre of the top face (z-up)
    #[must_use]
    pub fn top_center(&self) -> Vec3 {
        let center = self.center();
        Vec3::new(center.x, center.y, self.max.z)
    }
}

/// Semantic kind of a visual effect; the host decides what it looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Spark,
    Fire,
}

/// Opaque handle to a persistent effect spawned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectHandle(pub u64);

/// Ambient haze (fog) parameters pushed to the environment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazeSettings {
    pub enabled: bool,
    pub density: f32,
    pub color: Color,
    pub start_distance: f32,
    pub end_distance: f32,
}

/// Overlap queries against the host scene
pub trait SpatialQuery {
    /// All scene objects within `radius` of `center`
    fn query_within_radius(&self, center: Vec3, radius: f32) -> Vec<TargetId>;
}

/// Geometry lookups used to place visual effects
pub trait SceneGeometry {
    /// World-space bounds of the target's visible geometry, if it has any
    fn bounds(&self, target: TargetId) -> Option<Aabb>;

    /// Origin of the target, `None` once it has left the scene
    fn position(&self, target: TargetId) -> Option<Vec3>;

    /// Anchor point on top of the target.
    ///
    /// Top centre of the bounds when available, otherwise the origin raised
    /// by `fallback_offset` along z.
    fn top_surface_point(&self, target: TargetId, fallback_offset: f32) -> Option<Vec3> {
        if let Some(bounds) = self.bounds(target) {
            return Some(bounds.top_center());
        }
        self.position(target)
            .map(|position| position + Vec3::new(0.0, 0.0, fallback_offset))
    }
}

/// Spawning and stopping visual effects
pub trait VisualEffects {
    /// Fire-and-forget effect that the host removes after `duration` seconds
    fn spawn_transient(&mut self, kind: EffectKind, position: Vec3, duration: f32);

    /// Effect that lives until [`VisualEffects::stop_and_remove`] is called
    fn spawn_persistent(&mut self, kind: EffectKind, position: Vec3) -> EffectHandle;

    fn stop_and_remove(&mut self, handle: EffectHandle);
}

/// Write-only view of the ambient visibility settings
pub trait Environment {
    fn set_ambient_haze(&mut self, haze: &HazeSettings);

    /// Depth-of-field focus distance and aperture
    fn set_focus(&mut self, distance: f32, aperture: f32);

    /// Focus distance alone, used by observer tracking
    fn set_focus_distance(&mut self, distance: f32);
}

/// Existence and removal of scene objects
pub trait SceneObjects {
    fn contains(&self, target: TargetId) -> bool;

    /// Remove a burnt-out object from the scene
    fn remove(&mut self, target: TargetId);
}

/// The full set of collaborators the fire system talks to
///
/// Built by [`FireSystemBuilder`](crate::simulation::FireSystemBuilder), which
/// rejects a missing collaborator up front instead of failing on first use.
pub struct SceneHooks {
    pub(crate) spatial: Box<dyn SpatialQuery>,
    pub(crate) geometry: Box<dyn SceneGeometry>,
    pub(crate) effects: Box<dyn VisualEffects>,
    pub(crate) environment: Box<dyn Environment>,
    pub(crate) objects: Box<dyn SceneObjects>,
}

impl SceneHooks {
    /// Assemble hooks from individual collaborators
    pub fn new(
        spatial: Box<dyn SpatialQuery>,
        geometry: Box<dyn SceneGeometry>,
        effects: Box<dyn VisualEffects>,
        environment: Box<dyn Environment>,
        objects: Box<dyn SceneObjects>,
    ) -> Self {
        Self {
            spatial,
            geometry,
            effects,
            environment,
            objects,
        }
    }

    /// Use one shared scene handle for every collaborator
    pub fn from_scene<S>(scene: &S) -> Self
    where
        S: SpatialQuery + SceneGeometry + VisualEffects + Environment + SceneObjects + Clone + 'static,
    {
        Self::new(
            Box::new(scene.clone()),
            Box::new(scene.clone()),
            Box::new(scene.clone()),
            Box::new(scene.clone()),
            Box::new(scene.clone()),
        )
    }
}
