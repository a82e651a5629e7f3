//! Effect container (C3): a named collection of segments that render
//! together as one animation.

use crate::segment::Segment;

/// One effect: an ordered set of segments rendered together.
#[derive(Debug, Clone)]
pub struct Effect {
    pub effect_id: u32,
    pub segments: Vec<Segment>,
}
