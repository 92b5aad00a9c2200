//! Underwater sound speed and acoustic environment models.
//!
//! Computes sound speed from climate-model fields (potential temperature,
//! salinity, depth, latitude) and generates environment-file input lines for
//! the OASES wavenumber-integration propagation code.
//!
//! # Physics
//!
//! Sound speed uses the Medwin formulation on in-situ temperature:
//!
//! ```text
//! c = 1449.2 + 4.6 T − 0.055 T² + 0.00029 T³ + (1.34 − 0.01 T)(S − 35) + 0.016 z
//! ```
//!
//! Climate models carry *potential* temperature, so the in-situ temperature is
//! recovered by integrating the adiabatic lapse rate (Bryden 1973) from the
//! surface down to the in-situ pressure, which in turn comes from depth and
//! latitude (Saunders 1981).
//!
//! # References
//!
//! - Medwin (1975): Speed of sound in water: a simple equation for realistic
//!   parameters.
//! - Saunders (1981): Practical conversion of pressure to depth.
//! - Bryden (1973): New polynomials for thermal expansion, adiabatic
//!   temperature gradient and potential temperature of sea water.
//! - Fofonoff & Millard (1983): Algorithms for computation of fundamental
//!   properties of seawater. UNESCO Technical Papers in Marine Science 44.

use ndarray::{Array1, Array2, Array4};
use thiserror::Error;

/// Error type for acoustic computations.
#[derive(Debug, Error)]
pub enum AcousticError {
    /// Input arrays have incompatible shapes
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Pressure (dbar) from depth (m, positive down) and latitude (degrees).
///
/// Inverts the Saunders (1981) depth formula `z = (1 − c₁) p − c₂ p²` with
/// `c₁ = (5.92 + 5.25 sin²φ) × 10⁻³` and `c₂ = 2.21 × 10⁻⁶`.
pub fn pressure_from_depth(depth: f64, lat: f64) -> f64 {
    let sin_lat = lat.to_radians().sin();
    let c1 = (5.92 + 5.25 * sin_lat * sin_lat) * 1e-3;
    let c2 = 2.21e-6;

    let b = 1.0 - c1;
    (b - (b * b - 4.0 * c2 * depth).sqrt()) / (2.0 * c2)
}

/// Adiabatic temperature gradient (°C/dbar), Bryden (1973) polynomial as
/// given by Fofonoff & Millard (1983).
///
/// `s` in PSU, `t` in °C, `p` in dbar.
fn adiabatic_lapse_rate(s: f64, t: f64, p: f64) -> f64 {
    let ds = s - 35.0;

    (((-2.1687e-16 * t + 1.8676e-14) * t - 4.6206e-13) * p
        + ((2.7759e-12 * t - 1.1351e-10) * ds
            + ((-5.4481e-14 * t + 8.733e-12) * t - 6.7795e-10) * t
            + 1.8741e-8))
        * p
        + (-4.2393e-8 * t + 1.8932e-6) * ds
        + ((6.6228e-10 * t - 6.836e-8) * t + 8.5258e-6) * t
        + 3.5803e-5
}

/// In-situ temperature (°C) from potential temperature referenced to the
/// surface, at pressure `p` (dbar).
///
/// Runs the Fofonoff & Millard (1983) Runge-Kutta integration of the
/// adiabatic lapse rate from the surface down to `p`. This is the inverse of
/// the standard potential-temperature computation and shares its accuracy
/// (order 10⁻⁴ °C over the full oceanic range).
pub fn insitu_from_potential(s: f64, theta: f64, p: f64) -> f64 {
    let p_ref = 0.0;
    let h = p - p_ref;

    let mut t = theta;
    let mut xk = h * adiabatic_lapse_rate(s, t, p_ref);
    t += 0.5 * xk;
    let mut q = xk;

    let mut pr = p_ref + 0.5 * h;
    xk = h * adiabatic_lapse_rate(s, t, pr);
    t += 0.292_893_22 * (xk - q);
    q = 0.585_786_44 * xk + 0.121_320_344 * q;

    xk = h * adiabatic_lapse_rate(s, t, pr);
    t += 1.707_106_781 * (xk - q);
    q = 3.414_213_562 * xk - 4.121_320_344 * q;

    pr += 0.5 * h;
    xk = h * adiabatic_lapse_rate(s, t, pr);

    t + (xk - 2.0 * q) / 6.0
}

/// Medwin sound speed (m/s) from in-situ temperature (°C), salinity (PSU) and
/// depth (m).
fn medwin(t: f64, s: f64, z: f64) -> f64 {
    1449.2 + 4.6 * t - 0.055 * t * t + 0.00029 * t * t * t
        + (1.34 - 0.01 * t) * (s - 35.0)
        + 0.016 * z
}

/// Sound speed from potential temperature and salinity fields.
///
/// # Arguments
/// * `thetao` - Potential temperature (°C), time × depth × lat × lon
/// * `so` - Salinity (PSU), same shape as `thetao`
/// * `depth` - Depths (m, positive down), length of the depth dimension
/// * `lats` - Latitudes (degrees), length of the latitude dimension
///
/// # Returns
/// Sound speed (m/s) with the same shape as `thetao`. Cells where temperature
/// or salinity are NaN (e.g. below the seafloor) yield NaN.
///
/// # Example
/// ```
/// use havkit::acoustic::sound_speed;
/// use ndarray::{array, Array4};
///
/// // Single cell at the surface: 10 °C, 35 PSU
/// let thetao = Array4::from_elem((1, 1, 1, 1), 10.0);
/// let so = Array4::from_elem((1, 1, 1, 1), 35.0);
/// let c = sound_speed(&thetao, &so, &array![0.0], &array![60.0]).unwrap();
/// assert!((c[(0, 0, 0, 0)] - 1489.99).abs() < 0.01);
/// ```
pub fn sound_speed(
    thetao: &Array4<f64>,
    so: &Array4<f64>,
    depth: &Array1<f64>,
    lats: &Array1<f64>,
) -> Result<Array4<f64>, AcousticError> {
    let (n_time, n_depth, n_lat, n_lon) = thetao.dim();

    if so.dim() != thetao.dim() {
        return Err(AcousticError::ShapeMismatch(format!(
            "thetao has shape {:?}, so has shape {:?}",
            thetao.dim(),
            so.dim()
        )));
    }
    if depth.len() != n_depth {
        return Err(AcousticError::ShapeMismatch(format!(
            "depth has {} levels, fields have {}",
            depth.len(),
            n_depth
        )));
    }
    if lats.len() != n_lat {
        return Err(AcousticError::ShapeMismatch(format!(
            "lats has {} rows, fields have {}",
            lats.len(),
            n_lat
        )));
    }

    // Pressure depends only on depth and latitude
    let pressure =
        Array2::from_shape_fn((n_depth, n_lat), |(id, il)| {
            pressure_from_depth(depth[id], lats[il])
        });

    let mut c = Array4::zeros(thetao.dim());
    for it in 0..n_time {
        for id in 0..n_depth {
            let z = depth[id];
            for il in 0..n_lat {
                let p = pressure[(id, il)];
                for ix in 0..n_lon {
                    let theta = thetao[(it, id, il, ix)];
                    let s = so[(it, id, il, ix)];
                    let t = insitu_from_potential(s, theta, p);
                    c[(it, id, il, ix)] = medwin(t, s, z);
                }
            }
        }
    }

    Ok(c)
}

/// Seawater density used in the linear-gradient OASES layers (g/cm³).
const OASES_DENSITY: f64 = 1.0264;

/// Generate environment-file layer lines for OASES.
///
/// The profile is truncated at the first NaN in `ssp` (below-seafloor fill
/// values); if there is no NaN the full profile is used. The OASES model
/// requires the 0.0-depth line twice, and a synthetic surface layer is
/// inserted when the profile does not start at the surface.
///
/// # Arguments
/// * `depths` - Depths (m, positive down, increasing)
/// * `ssp` - Sound speed (m/s), same length as `depths`
/// * `linear` - Linear-gradient layers instead of step-wise
///
/// # Panics
///
/// Panics if `depths` and `ssp` have different lengths.
pub fn oases_ssp(depths: &[f64], ssp: &[f64], linear: bool) -> Vec<String> {
    assert_eq!(
        depths.len(),
        ssp.len(),
        "depths and ssp must have the same length"
    );

    let cut = ssp.iter().position(|v| v.is_nan()).unwrap_or(ssp.len());
    let depths = &depths[..cut];
    let ssp = &ssp[..cut];

    let mut layers = Vec::new();

    // OASES needs the 0.0 depth twice
    layers.push("0.00  0.0       0    0.0   0.0   0.00   0.0 0.0 0".to_string());

    if depths.is_empty() {
        return layers;
    }

    if linear {
        if depths[0] != 0.0 {
            let next = if ssp.len() > 1 { ssp[1] } else { ssp[0] };
            layers.push(format!(
                "{:.2} {:.2} -{:.2} 0.0 0.0 {} 0.0",
                0.0, ssp[0], next, OASES_DENSITY
            ));
        }

        for i in 0..depths.len() - 1 {
            layers.push(format!(
                "{:.2} {:.2} -{:.2} 0.0 0.0 {} 0.0",
                depths[i],
                ssp[i],
                ssp[i + 1],
                OASES_DENSITY
            ));
        }

        layers.push(format!(
            "{:.2} {:.2} 0.0 0.0 0.0 {} 0.0",
            depths[depths.len() - 1],
            ssp[ssp.len() - 1],
            OASES_DENSITY
        ));
    } else {
        if depths[0] != 0.0 {
            // From the surface to the first interface
            layers.push(format!(
                "{:.2}  {:.1}    0.0  0.0   0.0   1.000  0.0 0.0 0",
                0.0, ssp[0]
            ));
        }

        for (i, &d) in depths.iter().enumerate() {
            layers.push(format!(
                "{:.2}  {:.1}    0.0  0.0   0.0   1.000  0.0 0.0 0",
                d, ssp[i]
            ));
        }
    }

    layers
}
