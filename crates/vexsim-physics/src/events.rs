//! Touch notifications collected during a step.

use parking_lot::Mutex;
use rapier3d::dynamics::RigidBodySet;
use rapier3d::geometry::{ColliderSet, CollisionEvent, ContactPair};
use rapier3d::math::Real;
use rapier3d::pipeline::EventHandler;

use crate::facade::BodyHandle;

/// A contact (or trigger overlap) starting or stopping between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// First body, if the collider has a parent.
    pub body1: Option<BodyHandle>,
    /// Second body, if the collider has a parent.
    pub body2: Option<BodyHandle>,
    /// True when the pair started touching, false when it separated.
    pub started: bool,
    /// True when one of the colliders is a trigger volume.
    pub trigger: bool,
}

/// Accumulates collision events emitted by the pipeline.
///
/// Only pairs that passed the filter hooks produce events, so suppressed
/// pairs never show up here.
#[derive(Debug, Default)]
pub struct ContactLog {
    events: Mutex<Vec<ContactEvent>>,
}

impl ContactLog {
    /// Take every event recorded since the last drain.
    pub fn drain(&self) -> Vec<ContactEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventHandler for ContactLog {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        let parent = |handle| colliders.get(handle).and_then(|c| c.parent()).map(BodyHandle);
        let contact = ContactEvent {
            body1: parent(event.collider1()),
            body2: parent(event.collider2()),
            started: event.started(),
            trigger: event.sensor(),
        };
        tracing::trace!(?contact, "contact event");
        self.events.lock().push(contact);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}
