//! Directed entity-to-entity relations used by the foraging behavior.

use formicary_core::impl_relation;

/// An ant's current movement goal (a food item or the colony). At most
/// one target per ant.
pub struct Targeting;
impl_relation!(Targeting, exclusive);

/// The food entity an ant currently holds. At most one per ant.
pub struct Carrying;
impl_relation!(Carrying, exclusive);

/// Inverse of [`Carrying`], kept on the food side for fast
/// "is this food held" checks.
pub struct CarriedBy;
impl_relation!(CarriedBy, exclusive);
