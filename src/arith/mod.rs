//! Cryptographic backend abstractions and field/group/pairing arithmetic.
//!
//! This module provides the trait layer that the protocol code is written
//! against, plus the concrete arkworks BLS12-381 backend. The traits keep
//! the protocol independent of the curve library so another pairing
//! backend can be slotted in behind a feature flag.
//!
//! # Architecture
//!
//! - **[`field`]**: scalar field operations (Fr): sampling, inversion,
//!   canonical byte representations
//! - **[`group`]**: curve point operations (G1, G2, GT): addition, scalar
//!   multiplication, canonical serialization
//! - **[`pairing`]**: the bilinear pairing, products of pairings, and the
//!   pairing-product identity check used for share verification
//! - **[`poly`]**: secret polynomials and their public commitment vectors
//! - **[`lagrange`]**: keyper evaluation points and Lagrange coefficients
//!
//! # Example
//!
//! ```rust
//! use rand::thread_rng;
//! use teks::{CurvePoint, FieldElement, PairingBackend, PairingEngine};
//!
//! let mut rng = thread_rng();
//! let scalar = <PairingEngine as PairingBackend>::Scalar::random(&mut rng);
//!
//! let g1 = <PairingEngine as PairingBackend>::G1::generator();
//! let point = g1.mul_scalar(&scalar);
//!
//! let g2 = <PairingEngine as PairingBackend>::G2::generator();
//! let gt = PairingEngine::pairing(&point, &g2);
//! println!("{:?}", gt);
//! ```

mod field;
pub use field::*;

mod group;
pub use group::*;

mod pairing;
pub use pairing::*;

mod poly;
pub use poly::*;

mod lagrange;
pub use lagrange::*;
