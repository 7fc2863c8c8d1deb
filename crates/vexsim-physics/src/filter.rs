//! Collision filtering between actor categories.
//!
//! Every collider carries a [`FilterData`] pair: the category it belongs to
//! and the mask of categories it accepts. A pair of colliders generates
//! contacts only when each one accepts the other's category. Sensors are
//! the exception: they always report intersections, regardless of masks.
//!
//! The pair is packed into the collider's `user_data` so the Rapier hook can
//! read it back without any side table.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use rapier3d::geometry::SolverFlags;
use rapier3d::pipeline::{PairFilterContext, PhysicsHooks};
use serde::{Deserialize, Serialize};

/// Bit set of collision categories.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(u32);

impl Category {
    /// No category.
    pub const NONE: Self = Self(0);
    /// The static field floor and walls.
    pub const GROUND: Self = Self(1 << 0);
    /// Robot chassis.
    pub const CHASSIS: Self = Self(1 << 1);
    /// Robot wheels.
    pub const WHEEL: Self = Self(1 << 2);
    /// Static or kinematic obstacles on the field.
    pub const OBSTACLE: Self = Self(1 << 3);
    /// Free game pieces.
    pub const PIECE: Self = Self(1 << 4);

    /// Build from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the two sets share at least one bit.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Category {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for Category {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Category, &str); 5] = [
            (Category::GROUND, "GROUND"),
            (Category::CHASSIS, "CHASSIS"),
            (Category::WHEEL, "WHEEL"),
            (Category::OBSTACLE, "OBSTACLE"),
            (Category::PIECE, "PIECE"),
        ];
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (cat, name) in NAMES {
            if self.contains(cat) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        let known = NAMES.iter().fold(0, |acc, (c, _)| acc | c.0);
        if self.0 & !known != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{:#x}", self.0 & !known)?;
        }
        Ok(())
    }
}

/// Kinds of actor placed in the world, one per row of the filter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// Field floor.
    Ground,
    /// Robot chassis.
    Chassis,
    /// Robot wheel.
    Wheel,
    /// Field obstacle.
    Obstacle,
    /// Game piece.
    Piece,
}

impl ActorKind {
    /// All actor kinds, in table order.
    pub const ALL: [ActorKind; 5] = [
        ActorKind::Ground,
        ActorKind::Chassis,
        ActorKind::Wheel,
        ActorKind::Obstacle,
        ActorKind::Piece,
    ];

    /// The category bit for this actor kind.
    pub const fn category(self) -> Category {
        match self {
            ActorKind::Ground => Category::GROUND,
            ActorKind::Chassis => Category::CHASSIS,
            ActorKind::Wheel => Category::WHEEL,
            ActorKind::Obstacle => Category::OBSTACLE,
            ActorKind::Piece => Category::PIECE,
        }
    }

    /// The standard (category, mask) row for this actor kind.
    ///
    /// Wheels never accept the chassis: they are held by the drive joints and
    /// would otherwise fight them through contact.
    pub const fn filter(self) -> FilterData {
        let mask = match self {
            ActorKind::Ground => Category(
                Category::CHASSIS.0 | Category::WHEEL.0 | Category::OBSTACLE.0 | Category::PIECE.0,
            ),
            ActorKind::Chassis => Category(
                Category::GROUND.0 | Category::OBSTACLE.0 | Category::CHASSIS.0 | Category::PIECE.0,
            ),
            ActorKind::Wheel => {
                Category(Category::GROUND.0 | Category::OBSTACLE.0 | Category::PIECE.0)
            }
            ActorKind::Obstacle => Category(
                Category::GROUND.0
                    | Category::CHASSIS.0
                    | Category::WHEEL.0
                    | Category::OBSTACLE.0
                    | Category::PIECE.0,
            ),
            ActorKind::Piece => Category(
                Category::GROUND.0
                    | Category::CHASSIS.0
                    | Category::WHEEL.0
                    | Category::OBSTACLE.0
                    | Category::PIECE.0,
            ),
        };
        FilterData {
            category: self.category(),
            mask,
        }
    }
}

/// A collider's (category, accepted-categories) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterData {
    /// Categories this collider belongs to.
    pub category: Category,
    /// Categories this collider accepts contacts from.
    pub mask: Category,
}

impl FilterData {
    /// Opts out of every contact.
    pub const NONE: Self = Self {
        category: Category::NONE,
        mask: Category::NONE,
    };

    /// Create a filter pair.
    pub const fn new(category: Category, mask: Category) -> Self {
        Self { category, mask }
    }

    /// Pack into a collider `user_data` value.
    pub const fn to_user_data(self) -> u128 {
        (self.category.0 as u128) | ((self.mask.0 as u128) << 32)
    }

    /// Unpack from a collider `user_data` value.
    pub const fn from_user_data(data: u128) -> Self {
        Self {
            category: Category(data as u32),
            mask: Category((data >> 32) as u32),
        }
    }

    /// Symmetric test: each side must accept the other's category.
    pub const fn accepts(self, other: Self) -> bool {
        self.category.intersects(other.mask) && other.category.intersects(self.mask)
    }
}

/// Outcome of filtering a collider pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairFilter {
    /// No response and no notification.
    Suppress,
    /// Generate and solve contacts.
    Contact {
        /// Report a touch notification when the contact starts.
        notify_touch: bool,
    },
    /// Report intersection only, no contact response.
    Trigger,
}

/// Decide how a pair of colliders interacts.
pub fn filter_pair(a: FilterData, a_sensor: bool, b: FilterData, b_sensor: bool) -> PairFilter {
    if a_sensor || b_sensor {
        return PairFilter::Trigger;
    }
    if a.accepts(b) {
        PairFilter::Contact { notify_touch: true }
    } else {
        PairFilter::Suppress
    }
}

/// Rapier hooks applying [`filter_pair`] to every collider pair.
///
/// Colliders must be created with `ActiveHooks::FILTER_CONTACT_PAIRS` and
/// `ActiveHooks::FILTER_INTERSECTION_PAIR` for the hooks to run.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterHooks;

impl FilterHooks {
    fn decide(&self, context: &PairFilterContext) -> PairFilter {
        let (Some(co1), Some(co2)) = (
            context.colliders.get(context.collider1),
            context.colliders.get(context.collider2),
        ) else {
            return PairFilter::Suppress;
        };
        filter_pair(
            FilterData::from_user_data(co1.user_data),
            co1.is_sensor(),
            FilterData::from_user_data(co2.user_data),
            co2.is_sensor(),
        )
    }
}

impl PhysicsHooks for FilterHooks {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        match self.decide(context) {
            PairFilter::Contact { .. } => Some(SolverFlags::COMPUTE_IMPULSES),
            PairFilter::Trigger | PairFilter::Suppress => None,
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        !matches!(self.decide(context), PairFilter::Suppress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collides(a: ActorKind, b: ActorKind) -> bool {
        a.filter().accepts(b.filter())
    }

    #[test]
    fn test_standard_table() {
        use ActorKind::*;

        assert!(collides(Ground, Chassis));
        assert!(collides(Ground, Wheel));
        assert!(collides(Ground, Piece));
        assert!(collides(Chassis, Chassis));
        assert!(collides(Chassis, Piece));
        assert!(collides(Wheel, Piece));
        assert!(collides(Wheel, Obstacle));
        assert!(collides(Piece, Piece));

        assert!(!collides(Wheel, Chassis));
        assert!(!collides(Chassis, Wheel));
        assert!(!collides(Wheel, Wheel));
        assert!(!collides(Ground, Ground));
    }

    #[test]
    fn test_symmetric_and() {
        // One side accepting is not enough.
        let greedy = FilterData::new(Category::CHASSIS, Category::WHEEL);
        let picky = FilterData::new(Category::WHEEL, Category::GROUND);
        assert!(!greedy.accepts(picky));
        assert!(!picky.accepts(greedy));
        assert_eq!(filter_pair(greedy, false, picky, false), PairFilter::Suppress);

        for a in ActorKind::ALL {
            for b in ActorKind::ALL {
                assert_eq!(collides(a, b), collides(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_held_piece_opts_out() {
        for kind in ActorKind::ALL {
            assert!(!FilterData::NONE.accepts(kind.filter()));
            assert!(!kind.filter().accepts(FilterData::NONE));
        }
    }

    #[test]
    fn test_triggers_ignore_masks() {
        assert_eq!(
            filter_pair(FilterData::NONE, true, FilterData::NONE, false),
            PairFilter::Trigger
        );
        assert_eq!(
            filter_pair(ActorKind::Wheel.filter(), false, ActorKind::Chassis.filter(), true),
            PairFilter::Trigger
        );
        assert_eq!(
            filter_pair(ActorKind::Piece.filter(), false, ActorKind::Ground.filter(), false),
            PairFilter::Contact { notify_touch: true }
        );
    }

    #[test]
    fn test_user_data_packing() {
        for kind in ActorKind::ALL {
            let data = kind.filter();
            assert_eq!(FilterData::from_user_data(data.to_user_data()), data);
        }
        assert_eq!(FilterData::from_user_data(0), FilterData::NONE);
    }

    #[test]
    fn test_category_debug() {
        assert_eq!(format!("{:?}", Category::NONE), "NONE");
        assert_eq!(
            format!("{:?}", Category::GROUND | Category::PIECE),
            "GROUND | PIECE"
        );
    }
}
