//! Secret polynomials and their public commitment vectors.
//!
//! Every dealer in the key generation protocol samples a random
//! polynomial over the scalar field. The constant term is the dealer's
//! secret contribution; evaluations at the other keypers' points are the
//! private shares; the coefficient-wise commitment [`Gammas`] is the
//! public object against which shares are verified.
//!
//! Polynomials are represented in coefficient form with coefficients in
//! ascending order, `p(x) = c_0 + c_1*x + ... + c_d*x^d`, and evaluated
//! with Horner's method.

use rand_core::RngCore;
use tracing::instrument;

use crate::{CurvePoint, Error, FieldElement, PairingBackend};

/// A secret polynomial over the scalar field.
///
/// The polynomial never leaves the dealer that sampled it; only
/// evaluations and the commitment vector are published. `Debug` therefore
/// prints the degree only.
pub struct Polynomial<B: PairingBackend> {
    coeffs: Vec<B::Scalar>,
}

impl<B: PairingBackend> Polynomial<B> {
    /// Samples a uniform polynomial of the given degree (degree+1
    /// independent coefficients).
    pub fn random<R: RngCore + ?Sized>(rng: &mut R, degree: usize) -> Self {
        let coeffs = (0..=degree).map(|_| B::Scalar::random(rng)).collect();
        Self { coeffs }
    }

    /// Returns the degree of this polynomial.
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Evaluates the polynomial at the given point using Horner's method.
    pub fn evaluate(&self, x: &B::Scalar) -> B::Scalar {
        let mut acc = B::Scalar::zero();
        for coeff in self.coeffs.iter().rev() {
            acc *= *x;
            acc += *coeff;
        }
        acc
    }

    /// Commits to this polynomial: `Γ = (c_0·g2, c_1·g2, ..., c_d·g2)`.
    #[instrument(level = "trace", skip_all, fields(degree = self.degree()))]
    pub fn gammas(&self) -> Gammas<B> {
        let g2 = B::G2::generator();
        let points = self.coeffs.iter().map(|c| g2.mul_scalar(c)).collect();
        Gammas { points }
    }
}

impl<B: PairingBackend> std::fmt::Debug for Polynomial<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Polynomial")
            .field("degree", &self.degree())
            .finish_non_exhaustive()
    }
}

/// Commitment vector to a dealer's polynomial, one G2 point per
/// coefficient.
///
/// For a DKG with threshold `t` the underlying polynomial has degree
/// `t - 1`, so an accepted commitment has exactly `t` entries.
#[derive(Debug)]
pub struct Gammas<B: PairingBackend> {
    points: Vec<B::G2>,
}

impl<B: PairingBackend> Gammas<B> {
    /// Builds a commitment vector from raw G2 points.
    pub fn from_points(points: Vec<B::G2>) -> Self {
        Self { points }
    }

    /// Number of commitment entries (threshold of the originating DKG).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The committed points, constant term first.
    pub fn points(&self) -> &[B::G2] {
        &self.points
    }

    /// Evaluates the commitment at `x`: `Π(x) = Σ x^i · Γ[i]`.
    ///
    /// `Π(x_k)` is keyper k's public share of the committed polynomial;
    /// `Π(0)` is the commitment to the dealer's secret contribution.
    pub fn pi(&self, x: &B::Scalar) -> B::G2 {
        let mut acc = B::G2::identity();
        let mut power = B::Scalar::one();
        for point in &self.points {
            acc = acc.add(&point.mul_scalar(&power));
            power *= *x;
        }
        acc
    }

    /// Checks a claimed evaluation of the committed polynomial:
    /// `Π(x) == eval·g2`.
    pub fn verify_eval(&self, x: &B::Scalar, eval: &B::Scalar) -> bool {
        self.pi(x) == B::G2::generator().mul_scalar(eval)
    }

    /// Fails with a degree mismatch unless the commitment has exactly
    /// `expected` entries.
    pub fn ensure_len(&self, expected: usize) -> Result<(), Error> {
        if self.points.len() != expected {
            return Err(Error::DegreeMismatch {
                expected,
                actual: self.points.len(),
            });
        }
        Ok(())
    }
}

impl<B: PairingBackend> Clone for Gammas<B> {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
        }
    }
}

impl<B: PairingBackend> PartialEq for Gammas<B> {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl<B: PairingBackend> Eq for Gammas<B> {}
