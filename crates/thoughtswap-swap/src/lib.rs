//! The Swap Engine (§4.6): pure randomized redistribution of Thoughts to
//! recipients. No I/O, no store access — `thoughtswap-room` owns writing
//! the result into a Room's Distribution and fanning it out.

mod engine;

pub use engine::{
    compute_distribution, pick_reassignment_thought, pick_reswap_thought, Assignment,
    RecipientInput, ThoughtInput,
};
