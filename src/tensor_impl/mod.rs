//! Tensor storage for two-electron and three-center integrals.

mod eri;
mod ri;
mod tensor4;

#[cfg(test)]
mod tests;

pub use eri::{pair_index, quad_multiplicity, symmetry_orbit, EriFold4, EriFull};
pub use ri::RiTensor;
pub use tensor4::Tensor4;
