//! Integral kind selectors and the engine capability trait.

/// The closed set of integral types an engine can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegralKind {
    /// One-electron overlap `<mu|nu>`.
    Overlap,
    /// One-electron kinetic energy `<mu|-1/2 nabla^2|nu>`.
    Kinetic,
    /// One-electron nuclear attraction `<mu|sum_A -Z_A/r_A|nu>`.
    NuclearAttraction,
    /// Four-center two-electron repulsion `(mu nu|lambda sigma)`.
    ElectronRepulsion,
    /// Three-center two-electron integrals `(mu nu|P)` over an auxiliary
    /// fitting basis, for resolution-of-identity tensors.
    ThreeCenter2e,
}

impl IntegralKind {
    /// Whether the kind produces shell-pair batches assembling into an
    /// `n x n` one-electron matrix.
    pub fn is_one_electron(self) -> bool {
        matches!(
            self,
            IntegralKind::Overlap | IntegralKind::Kinetic | IntegralKind::NuclearAttraction
        )
    }
}

/// Capability interface of a native integral engine.
///
/// Batch buffers are column-major over the basis functions of the requested
/// shells, innermost index first: a shell pair `(i, j)` yields
/// `dim(i) * dim(j)` values at `a + dim(i) * b`, a shell quadruple
/// `(i, j, k, l)` yields values at `a + dim(i) (b + dim(j) (c + dim(k) d))`,
/// and a three-center triple `(i, j, P)` at `a + dim(i) (b + dim(j) p)`.
pub trait IntegralEngine {
    /// Engine-owned precomputed optimization data. The consumer never
    /// inspects it; it is created by [`prepare`](Self::prepare) once per
    /// basis set, handed back on every batch call, and released by its own
    /// `Drop`.
    type Context;

    /// Number of shells in the orbital basis.
    fn n_shells(&self) -> usize;

    /// Number of basis functions carried by a shell.
    fn shell_dim(&self, shell: usize) -> usize;

    /// Number of shells in the auxiliary fitting basis, when the engine
    /// supports three-center integrals.
    fn n_aux_shells(&self) -> usize {
        0
    }

    /// Number of auxiliary functions carried by an auxiliary shell.
    fn aux_shell_dim(&self, _shell: usize) -> usize {
        0
    }

    /// Build the optimization context for an integral kind.
    fn prepare(&self, kind: IntegralKind) -> Self::Context;

    /// Evaluate one shell batch of the given kind.
    fn compute_batch(
        &self,
        kind: IntegralKind,
        shells: &[usize],
        context: &Self::Context,
    ) -> Vec<f64>;
}
