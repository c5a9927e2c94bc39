use nalgebra::Vector3;

use crate::constants::{Degree, Radian, RADEG};

/// Convert equatorial coordinates to a unit vector on the celestial sphere.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in degrees
/// * `dec`: declination in degrees
///
/// Return
/// ----------
/// * `Vector3<f64>`: the cartesian unit vector `(cos δ cos α, cos δ sin α, sin δ)`
pub fn radec_to_unit_vector(ra: Degree, dec: Degree) -> Vector3<f64> {
    let (sin_ra, cos_ra) = (ra * RADEG).sin_cos();
    let (sin_dec, cos_dec) = (dec * RADEG).sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// Great-circle distance between two unit vectors.
///
/// Uses `atan2(|a × b|, a · b)`, well conditioned for both tiny and large separations.
///
/// Return
/// ----------
/// * The angular distance in radians, in `[0, π]`.
pub fn angular_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Great-circle distance between two equatorial positions, in degrees.
pub fn angular_separation(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> Degree {
    let a = radec_to_unit_vector(ra1, dec1);
    let b = radec_to_unit_vector(ra2, dec2);
    angular_distance(&a, &b) / RADEG
}

/// Wrap an angle difference in degrees to `[-180, 180)`.
#[inline]
pub fn wrap_degree_difference(delta: Degree) -> Degree {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Format a right ascension as `HH MM SS.ss` for MPC 80-column records.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in degrees, any value (wrapped to `[0, 360)`)
///
/// Return
/// ----------
/// * An 11 characters string, seconds rounded to the hundredth.
pub fn ra_to_sexagesimal(ra: Degree) -> String {
    let hours = ra.rem_euclid(360.0) / 15.0;
    let mut centisec = (hours * 360_000.0).round() as u64;
    // 24h00m00.00s wraps to 0h
    centisec %= 24 * 360_000;

    let h = centisec / 360_000;
    let m = (centisec % 360_000) / 6_000;
    let cs = centisec % 6_000;
    format!("{:02} {:02} {:02}.{:02}", h, m, cs / 100, cs % 100)
}

/// Format a declination as `±DD MM SS.s` for MPC 80-column records.
///
/// Arguments
/// ---------
/// * `dec`: declination in degrees, `[-90, 90]`
///
/// Return
/// ----------
/// * An 11 characters string, seconds rounded to the tenth.
pub fn dec_to_sexagesimal(dec: Degree) -> String {
    let sign = if dec < 0.0 { '-' } else { '+' };
    let decisec = (dec.abs() * 36_000.0).round() as u64;

    let d = decisec / 36_000;
    let m = (decisec % 36_000) / 600;
    let ds = decisec % 600;
    format!("{}{:02} {:02} {:02}.{}", sign, d, m, ds / 10, ds % 10)
}
