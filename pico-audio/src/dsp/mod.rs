//! Fixed-point sample arithmetic used on the refill path.

pub mod helpers;
pub mod intrinsics;
