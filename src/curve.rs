//! secp256k1 adapter.
//!
//! Every integer-to-field conversion in the crate goes through here, so the
//! 32-byte padding and range rules live in exactly one place. Callers hand
//! over byte slices and get back `k256` scalars and points or an error.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::elliptic_curve::{Field, PrimeField};
use k256::{AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar, U256};
use rand::rngs::OsRng;

use crate::error::Error;

pub const SCALAR_LEN: usize = 32;
pub const POINT_COMPRESSED_LEN: usize = 33;
pub const POINT_UNCOMPRESSED_LEN: usize = 65;

/// Strict parse of a 32-byte big-endian scalar. Rejects values >= the curve
/// order; zero is accepted (callers that need nonzero check separately).
pub fn scalar_from_be_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<Scalar, Error> {
    let repr = FieldBytes::from(*bytes);
    Option::<Scalar>::from(Scalar::from_repr(repr)).ok_or(Error::InvalidScalar)
}

/// Like [`scalar_from_be_bytes`] but additionally rejects zero.
pub fn nonzero_scalar_from_be_bytes(bytes: &[u8; SCALAR_LEN]) -> Result<Scalar, Error> {
    let scalar = scalar_from_be_bytes(bytes)?;
    if bool::from(scalar.is_zero()) {
        return Err(Error::InvalidScalar);
    }
    Ok(scalar)
}

/// Zero-padded 32-byte big-endian encoding of a scalar.
pub fn scalar_to_be_bytes(scalar: &Scalar) -> [u8; SCALAR_LEN] {
    scalar.to_bytes().into()
}

/// Reduce arbitrary 32 bytes (a digest, an x-coordinate) modulo the curve
/// order. Never fails; the result may be zero.
pub fn reduce_to_scalar(bytes: &[u8; SCALAR_LEN]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*bytes))
}

/// The x-coordinate of a point reduced modulo the curve order, as ECDSA
/// computes `r`.
pub fn x_coordinate_scalar(point: &AffinePoint) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&point.x())
}

/// Parse a SEC1 point, compressed or uncompressed. The identity and
/// off-curve encodings are rejected.
pub fn point_from_sec1(bytes: &[u8]) -> Result<AffinePoint, Error> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| Error::InvalidPoint)?;
    let point =
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded)).ok_or(Error::InvalidPoint)?;
    if point == AffinePoint::IDENTITY {
        return Err(Error::InvalidPoint);
    }
    Ok(point)
}

pub fn point_to_compressed(point: &AffinePoint) -> [u8; POINT_COMPRESSED_LEN] {
    let encoded = point.to_encoded_point(true);
    let mut out = [0u8; POINT_COMPRESSED_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

pub fn point_to_uncompressed(point: &AffinePoint) -> [u8; POINT_UNCOMPRESSED_LEN] {
    let encoded = point.to_encoded_point(false);
    let mut out = [0u8; POINT_UNCOMPRESSED_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Sum of two points, rejected if it lands on the identity.
pub fn add_points(a: &AffinePoint, b: &AffinePoint) -> Result<AffinePoint, Error> {
    let sum = (ProjectivePoint::from(*a) + ProjectivePoint::from(*b)).to_affine();
    if sum == AffinePoint::IDENTITY {
        return Err(Error::InvalidPoint);
    }
    Ok(sum)
}

/// Fixed-base multiplication `scalar * G`.
pub fn mul_base(scalar: &Scalar) -> AffinePoint {
    (ProjectivePoint::GENERATOR * scalar).to_affine()
}

/// Variable-base multiplication `scalar * point`.
pub fn mul_point(scalar: &Scalar, point: &AffinePoint) -> AffinePoint {
    (ProjectivePoint::from(*point) * scalar).to_affine()
}

/// Uniform nonzero scalar from the OS CSPRNG.
pub fn random_nonzero_scalar() -> Scalar {
    *NonZeroScalar::random(&mut OsRng)
}
