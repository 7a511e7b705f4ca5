//! This module implements the domain-specific 4-momentum handling logic that
//! the analysis nodes need: transverse and angular coordinates, invariant
//! mass, Lorentz boosts and angular distances.

use crate::numeric::{reals::consts::PI, Float};
use nalgebra::{SVector, Vector3};

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Velocity of a reference frame, in units of c
pub type BoostVector = Vector3<Float>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Pseudorapidity reported for momenta aligned with the beam axis
const BEAM_AXIS_ETA: Float = 10e10;

/// Build a 4-momentum from its energy and 3-momentum components
pub fn momentum(e: Float, px: Float, py: Float, pz: Float) -> Momentum {
    Momentum::new(px, py, pz, e)
}

/// Build a 4-momentum from collider coordinates and mass
pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, m: Float) -> Momentum {
    let (px, py, pz) = (pt * phi.cos(), pt * phi.sin(), pt * eta.sinh());
    let e = (px * px + py * py + pz * pz + m * m).sqrt();
    momentum(e, px, py, pz)
}

/// Spatial part of a 4-momentum
pub fn xyz(p: &Momentum) -> Vector3<Float> {
    Vector3::new(p[X], p[Y], p[Z])
}

/// Transverse momentum
pub fn pt(p: &Momentum) -> Float {
    p[X].hypot(p[Y])
}

/// Azimuthal angle, in ]-π, π]
pub fn phi(p: &Momentum) -> Float {
    p[Y].atan2(p[X])
}

/// Pseudorapidity
///
/// Momenta which are parallel to the beam axis get a huge value of the
/// appropriate sign instead of an infinity, and a null momentum gets zero.
///
pub fn eta(p: &Momentum) -> Float {
    let mag = xyz(p).norm();
    let cos_theta = if mag == 0. { 1. } else { p[Z] / mag };
    if cos_theta * cos_theta < 1. {
        -0.5 * ((1. - cos_theta) / (1. + cos_theta)).ln()
    } else if p[Z] == 0. {
        0.
    } else if p[Z] > 0. {
        BEAM_AXIS_ETA
    } else {
        -BEAM_AXIS_ETA
    }
}

/// Invariant mass
///
/// Space-like momenta get a negative mass, so that rounding errors on
/// (nearly) massless particles remain visible instead of producing NaNs.
///
pub fn mass(p: &Momentum) -> Float {
    let m2 = p[E] * p[E] - xyz(p).norm_squared();
    if m2 < 0. {
        -(-m2).sqrt()
    } else {
        m2.sqrt()
    }
}

/// Velocity of the rest frame of a momentum
pub fn boost_vector(p: &Momentum) -> BoostVector {
    xyz(p) / p[E]
}

/// Apply a Lorentz boost of velocity `b` to a 4-momentum
pub fn boost(p: &Momentum, b: &BoostVector) -> Momentum {
    let b2 = b.norm_squared();
    let gamma = 1. / (1. - b2).sqrt();
    let bp = b.dot(&xyz(p));
    let gamma2 = if b2 > 0. { (gamma - 1.) / b2 } else { 0. };
    let spatial = xyz(p) + b * (gamma2 * bp + gamma * p[E]);
    momentum(gamma * (p[E] + bp), spatial.x, spatial.y, spatial.z)
}

/// Express a 4-momentum in the rest frame of another one
pub fn in_rest_frame_of(p: &Momentum, frame: &Momentum) -> Momentum {
    boost(p, &-boost_vector(frame))
}

/// Azimuthal distance, folded back into [-π, π]
pub fn delta_phi(p1: &Momentum, p2: &Momentum) -> Float {
    let dphi = phi(p1) - phi(p2);
    if dphi > PI {
        dphi - 2. * PI
    } else if dphi < -PI {
        dphi + 2. * PI
    } else {
        dphi
    }
}

/// Angular distance ΔR = √(Δη² + Δφ²)
pub fn delta_r(p1: &Momentum, p2: &Momentum) -> Float {
    let deta = eta(p1) - eta(p2);
    deta.hypot(delta_phi(p1, p2))
}

/// Cosine of the angle between the spatial parts of two 4-momenta
///
/// Returns None when either 3-momentum is null or ill-defined (NaN), since
/// the angle is then undefined.
///
pub fn cos_angle(p1: &Momentum, p2: &Momentum) -> Option<Float> {
    let (v1, v2) = (xyz(p1), xyz(p2));
    let norms = v1.norm() * v2.norm();
    if norms == 0. || norms.is_nan() {
        return None;
    }
    Some(v1.dot(&v2) / norms)
}
