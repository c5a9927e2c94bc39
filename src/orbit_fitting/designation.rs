//! # Provisional designations
//!
//! Every trajectory submitted to the orbit fit is named with a packed MPC provisional
//! designation built from the date of its first observation and its trajectory id:
//!
//! ```text
//! K 21 K 00 A
//! | |  | |  └─ order within the cycle: discovery_number % 25, A–Z without I
//! | |  | └─ packed cycle: discovery_number / 25 as 00–99, then A0–Z9, then a0–z9
//! | |  └─ half-month letter: A (Jan 1–15) … Y (Dec 16–31), I skipped
//! | └─ last two digits of the year
//! └─ century letter (K for 20xx)
//! ```
use crate::{constants::JD, linkage_errors::LinkError, time::jd_to_calendar};

const HALF_MONTH_LETTERS: &[u8; 24] = b"ABCDEFGHJKLMNOPQRSTUVWXY";
const ORDER_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Largest cycle encodable on two characters (`z9`).
const MAX_CYCLE: u32 = 61 * 10 + 9;

fn packed_cycle(cycle: u32) -> Option<String> {
    if cycle <= 99 {
        return Some(format!("{cycle:02}"));
    }
    let (tens, unit) = (cycle / 10, cycle % 10);
    let letter = match tens {
        10..=35 => b'A' + (tens - 10) as u8,
        36..=61 => b'a' + (tens - 36) as u8,
        _ => return None,
    };
    Some(format!("{}{unit}", letter as char))
}

/// Provisional designation of a trajectory.
///
/// Arguments
/// -----------------
/// * `jd`: Julian date of the first observation of the trajectory.
/// * `discovery_number`: the trajectory id.
///
/// Return
/// ----------
/// * The 7 characters designation, [`LinkError::DesignationOverflow`] when the number does
///   not fit the packed cycle and [`LinkError::InvalidDate`] for a date outside years
///   1000–6199.
pub fn make_designation(jd: JD, discovery_number: u32) -> Result<String, LinkError> {
    let (year, month, day, _) = jd_to_calendar(jd)?;

    let century = year.div_euclid(100);
    if !(10..=61).contains(&century) {
        return Err(LinkError::InvalidDate(jd));
    }
    let century_letter = match century {
        10..=35 => (b'A' + (century - 10) as u8) as char,
        _ => (b'a' + (century - 36) as u8) as char,
    };

    let half_month = HALF_MONTH_LETTERS[(month as usize - 1) * 2 + usize::from(day > 15)] as char;

    let cycle = discovery_number / 25;
    if cycle > MAX_CYCLE {
        return Err(LinkError::DesignationOverflow(discovery_number));
    }
    let packed = packed_cycle(cycle).ok_or(LinkError::DesignationOverflow(discovery_number))?;
    let order = ORDER_LETTERS[(discovery_number % 25) as usize] as char;

    Ok(format!(
        "{century_letter}{:02}{half_month}{packed}{order}",
        year.rem_euclid(100)
    ))
}
