//! Core types for state estimation and data association
//!
//! Typed vector spaces, transformation matrices, Gaussian densities, and
//! track labels.

pub mod spaces;
pub mod transforms;
pub mod gaussian;
pub mod labels;
