use hifitime::Epoch;

use crate::{
    constants::{JD, JDTOMJD, MJD},
    linkage_errors::LinkError,
};

/// Transformation from julian date (JD) to modified julian date (MJD)
#[inline]
pub fn jd_to_mjd(jd: JD) -> MJD {
    jd - JDTOMJD
}

/// Transformation from modified julian date (MJD) to julian date (JD)
#[inline]
pub fn mjd_to_jd(mjd: MJD) -> JD {
    mjd + JDTOMJD
}

/// Calendar date of a julian date in the UTC frame.
///
/// Argument
/// --------
/// * `jd`: the julian date (UTC)
///
/// Return
/// ------
/// * `(year, month, day, fraction_of_day)`, or [`LinkError::InvalidDate`] when `jd` is not finite.
pub fn jd_to_calendar(jd: JD) -> Result<(i32, u8, u8, f64), LinkError> {
    if !jd.is_finite() {
        return Err(LinkError::InvalidDate(jd));
    }
    let epoch = Epoch::from_mjd_utc(jd_to_mjd(jd));
    let (year, month, day, hour, minute, second, nanos) = epoch.to_gregorian_utc();
    let fraction = (hour as f64 * 3600.0 + minute as f64 * 60.0 + second as f64) / 86_400.0
        + nanos as f64 * 1e-9 / 86_400.0;
    Ok((year, month, day, fraction))
}

/// Format a julian date as the MPC observation date `YYYY MM DD.ddddd`.
///
/// The day fraction is rounded to five decimals; a fraction rounding up to a full
/// day is clamped to `.99999` so that the calendar day stays valid.
///
/// Argument
/// --------
/// * `jd`: the julian date (UTC)
///
/// Return
/// ------
/// * a 16 characters string in the MPC date format
pub fn jd_to_mpc_date(jd: JD) -> Result<String, LinkError> {
    let (year, month, day, fraction) = jd_to_calendar(jd)?;
    let frac = ((fraction * 1e5).round() as u32).min(99_999);
    Ok(format!("{:04} {:02} {:02}.{:05}", year, month, day, frac))
}

#[cfg(test)]
mod time_test {
    use super::*;

    #[test]
    fn test_mjd_jd_conversions() {
        assert_eq!(mjd_to_jd(59215.0), 2459215.5);
        assert_eq!(jd_to_mjd(2459216.5), 59216.0);
    }

    #[test]
    fn test_jd_to_calendar() {
        let (y, m, d, f) = jd_to_calendar(2459215.5).unwrap();
        assert_eq!((y, m, d), (2021, 1, 1));
        assert!(f.abs() < 1e-9);

        let (y, m, d, f) = jd_to_calendar(2459356.75).unwrap();
        assert_eq!((y, m, d), (2021, 5, 22));
        assert!((f - 0.25).abs() < 1e-9);

        assert!(matches!(
            jd_to_calendar(f64::NAN),
            Err(LinkError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_jd_to_mpc_date() {
        assert_eq!(jd_to_mpc_date(2459356.75).unwrap(), "2021 05 22.25000");
        assert_eq!(jd_to_mpc_date(2459215.5).unwrap(), "2021 01 01.00000");
        assert!(jd_to_mpc_date(f64::INFINITY).is_err());
    }
}
