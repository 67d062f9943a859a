//! Physical unit definitions and conversions.
//!
//! Base units (molecular-dynamics convention):
//! - Length: nanometer (nm)
//! - Time: picosecond (ps)
//! - Mass: atomic mass unit (amu)
//! - Energy: kJ/mol

/// Nanometer in meters.
pub const NANOMETER: f64 = 1.0e-9;
/// Picosecond in seconds.
pub const PICOSECOND: f64 = 1.0e-12;
/// Atomic mass unit in kilograms.
pub const AMU: f64 = 1.660_539_066_60e-27;
/// Avogadro's number.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Energy of one simulation unit (amu·nm²/ps²) expressed in kJ/mol.
/// The MD unit system is self-consistent: this evaluates to 1 to within
/// the precision of the defining constants.
pub const ENERGY_KJ_PER_MOL: f64 =
    AMU * NANOMETER * NANOMETER * AVOGADRO / (PICOSECOND * PICOSECOND * 1.0e3);

/// Boltzmann constant in kJ/(mol·K).
pub const BOLTZMANN_CONSTANT: f64 = 8.314_462_618e-3;
