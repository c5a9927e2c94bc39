//! # OrbFit file formats
//!
//! Readers and writers for the files exchanged with the OrbFit binary. All files of one
//! run live under a working directory (`ram_dir`):
//!
//! | file                       | content                                         |
//! |----------------------------|-------------------------------------------------|
//! | `mpcobs/<desig>.obs`       | observations, one MPC 80-column line each       |
//! | `<desig>.inp`              | run prefix, fed to OrbFit on stdin              |
//! | `<desig>.oop`              | option file                                     |
//! | `<desig>.oel`              | output: Keplerian elements and their rms        |
//! | `mpcobs/<desig>.rwo`       | output: residuals, one chi per observation      |
//!
//! In identification mode two arcs are fitted together and the run is named
//! `<first>_<second>`.
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use ordered_float::OrderedFloat;
use tracing::error;

use crate::{
    conversion::{dec_to_sexagesimal, ra_to_sexagesimal},
    linkage_errors::LinkError,
    observations::Observation,
    orbit_fitting::orbital_elements::OrbitalElements,
    time::{jd_to_mpc_date, mjd_to_jd},
};

/// Sub-directory of `ram_dir` holding the observation files.
pub const MPC_OBS_DIR: &str = "mpcobs";

/// ZTF observatory code.
pub const DEFAULT_OBSERVATORY_CODE: &str = "I41";

/// `<first>` alone, `<first>_<second>` in identification mode.
pub(crate) fn run_name(first: &str, second: Option<&str>) -> String {
    match second {
        Some(second) => format!("{first}_{second}"),
        None => first.to_string(),
    }
}

fn band_letter(fid: u8) -> Result<char, LinkError> {
    match fid {
        1 => Ok('g'),
        2 => Ok('r'),
        3 => Ok('i'),
        other => Err(LinkError::InvalidFilterBand(other)),
    }
}

/// One MPC 80-column observation record.
///
/// ```text
///      K21K00A  C2021 05 22.25000 04 00 00.00 +10 00 00.0          18.3 r      I41
/// ```
pub fn mpc_observation_line(
    designation: &str,
    observation: &Observation,
    observatory_code: &str,
) -> Result<String, LinkError> {
    Ok(format!(
        "{:5}{:<7}  C{:<17}{:<12}{:<12}{:9}{:<5.1}{}{:6}{:>3}",
        "",
        designation,
        jd_to_mpc_date(observation.jd)?,
        ra_to_sexagesimal(observation.ra),
        dec_to_sexagesimal(observation.dec),
        "",
        observation.magpsf,
        band_letter(observation.fid)?,
        "",
        observatory_code,
    ))
}

/// Write `mpcobs/<designation>.obs`, observations sorted by Julian date.
pub fn write_observation_file(
    ram_dir: &Utf8Path,
    designation: &str,
    observations: &[Observation],
    observatory_code: &str,
) -> Result<Utf8PathBuf, LinkError> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|o| OrderedFloat(o.jd));

    let lines = sorted
        .into_iter()
        .map(|o| mpc_observation_line(designation, o, observatory_code))
        .collect::<Result<Vec<_>, _>>()?;

    let path = ram_dir.join(MPC_OBS_DIR).join(format!("{designation}.obs"));
    fs::write(&path, lines.join("\n"))?;
    Ok(path)
}

/// Write `<run>.inp`, containing the run prefix.
pub fn write_inp(
    ram_dir: &Utf8Path,
    first: &str,
    second: Option<&str>,
) -> Result<Utf8PathBuf, LinkError> {
    let name = run_name(first, second);
    let path = ram_dir.join(format!("{name}.inp"));
    fs::write(&path, ram_dir.join(&name).as_str())?;
    Ok(path)
}

/// Tunable entries of the OrbFit option file.
#[derive(Debug, Clone, PartialEq)]
pub struct OopOptions {
    /// Epoch of the output elements, in any OrbFit epoch syntax (`JD 2459000.5 UTC`, ...).
    pub prop_epoch: Option<String>,
    /// Triplets tried by the initial orbit determination; `<= 0` means 10.
    pub n_triplets: i32,
    /// Noise trials per triplet; `<= 0` means 10.
    pub noise_ntrials: i32,
}

impl Default for OopOptions {
    fn default() -> Self {
        OopOptions {
            prop_epoch: None,
            n_triplets: 10,
            noise_ntrials: 10,
        }
    }
}

/// Content of the OrbFit option file.
pub fn oop_options(
    ram_dir: &Utf8Path,
    first: &str,
    second: Option<&str>,
    options: &OopOptions,
) -> String {
    let positive_or_ten = |v: i32| if v <= 0 { 10 } else { v };
    let obs_dir = ram_dir.join(MPC_OBS_DIR);

    let epoch = options
        .prop_epoch
        .as_ref()
        .map(|epoch| format!("\t.epoch = {epoch}\n"))
        .unwrap_or_default();
    let object2 = second
        .map(|second| format!("\nobject2.\n\t.obs_dir = {obs_dir}\n\t.name = {second}"))
        .unwrap_or_default();

    format!(
        "output.
\t.elements = 'KEP'
{epoch}init_orbdet.
\t.verbose = 1
\t.n_triplets = {n_triplets}
\t.noise.ntrials = {noise_ntrials}
operations.
\t.init_orbdet = 2
\t.diffcor = 2
\t.ident = {ident}
\t.ephem = 0
error_model.
\t.name='fcct14'
IERS.
\t.extrapolation = .T.
reject.
\t.rejopp = .FALSE.
propag.
\t.iast = 17
\t.npoint = 600
\t.dmea = 0.2d0
\t.dter = 0.05d0
\t.filbe={filbe}

output_files.
\t.elem = {elem}
object1.
\t.obs_dir = {obs_dir}
\t.name = {first}{object2}",
        n_triplets = positive_or_ten(options.n_triplets),
        noise_ntrials = positive_or_ten(options.noise_ntrials),
        ident = if second.is_some() { 2 } else { 0 },
        filbe = ram_dir.join("AST17"),
        elem = ram_dir.join(format!("{}.oel", run_name(first, second))),
    )
}

/// Write `<run>.oop`.
pub fn write_oop(
    ram_dir: &Utf8Path,
    first: &str,
    second: Option<&str>,
    options: &OopOptions,
) -> Result<Utf8PathBuf, LinkError> {
    let path = ram_dir.join(format!("{}.oop", run_name(first, second)));
    fs::write(&path, oop_options(ram_dir, first, second, options))?;
    Ok(path)
}

fn parse_tokens<'a>(tokens: impl Iterator<Item = &'a str>, out: &mut [f64]) -> Result<(), String> {
    let mut n = 0;
    for (slot, token) in out.iter_mut().zip(tokens) {
        // Fortran exponents may use `D`
        *slot = token
            .replace(['D', 'd'], "E")
            .parse()
            .map_err(|e| format!("bad value {token:?}: {e}"))?;
        n += 1;
    }
    if n != out.len() {
        return Err(format!("expected {} values, got {n}", out.len()));
    }
    Ok(())
}

/// Parse the lines of an `.oel` file.
///
/// * line 8: `KEP a e i long_node arg_peric mean_anomaly`
/// * line 9: `MJD <epoch> TDT`, converted to JD
/// * line 13, when present: `! RMS <six values>`; otherwise the rms are `-1`
///
/// Arguments
/// -----------------
/// * `run`: run name, reported in the error.
/// * `lines`: lines of the file.
pub fn read_oel_lines(run: &str, lines: &[&str]) -> Result<OrbitalElements, LinkError> {
    parse_oel_lines(lines).map_err(|reason| LinkError::OrbFitParse {
        designation: run.to_string(),
        reason,
    })
}

fn parse_oel_lines(lines: &[&str]) -> Result<OrbitalElements, String> {
    let elements_line = lines.get(7).ok_or("missing element line")?;
    let epoch_line = lines.get(8).ok_or("missing epoch line")?;

    let mut values = [-1.0; 13];

    let mut epoch = [0.0];
    parse_tokens(epoch_line.split_whitespace().skip(1), &mut epoch)?;
    values[0] = mjd_to_jd(epoch[0]);

    parse_tokens(elements_line.split_whitespace().skip(1), &mut values[1..7])?;

    if let Some(rms_line) = lines.get(12) {
        parse_tokens(rms_line.split_whitespace().skip(2), &mut values[7..13])?;
    }

    Ok(OrbitalElements::from_values(values))
}

/// Read `<run>.oel`.
///
/// Return
/// ----------
/// * The elements, or the sentinel when the file is missing (no orbit found) or does not
///   have the expected structure (logged).
pub fn read_oel(ram_dir: &Utf8Path, first: &str, second: Option<&str>) -> OrbitalElements {
    let run = run_name(first, second);
    let path = ram_dir.join(format!("{run}.oel"));
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return OrbitalElements::sentinel(),
    };

    let lines: Vec<&str> = content.lines().collect();
    read_oel_lines(&run, &lines).unwrap_or_else(|e| {
        error!(%path, error = %e, "unexpected OrbFit output");
        OrbitalElements::sentinel()
    })
}

/// Parse the lines of an `.rwo` file: a 7-line header, then one line per observation
/// whose third field from the end is the chi of the observation residuals.
pub fn read_rwo_lines(run: &str, lines: &[&str]) -> Result<Vec<f64>, LinkError> {
    let parse_error = |reason: String| LinkError::OrbFitParse {
        designation: run.to_string(),
        reason,
    };
    if lines.len() < 7 {
        return Err(parse_error("missing header".to_string()));
    }
    lines[7..]
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let chi = fields
                .len()
                .checked_sub(3)
                .map(|k| fields[k])
                .ok_or_else(|| parse_error(format!("short observation line {line:?}")))?;
            chi.parse()
                .map_err(|e| parse_error(format!("bad chi {chi:?}: {e}")))
        })
        .collect()
}

/// Read `mpcobs/<designation>.rwo`, the residuals written by OrbFit next to the
/// observation file.
///
/// Arguments
/// -----------------
/// * `ram_dir`: working directory of the run.
/// * `designation`: designation of the fitted arc.
/// * `n_obs`: number of observations of the arc.
///
/// Return
/// ----------
/// * The chi of each observation, or `n_obs` times `-1` when the file is missing or
///   malformed (logged).
pub fn read_rwo(ram_dir: &Utf8Path, designation: &str, n_obs: usize) -> Vec<f64> {
    let path = ram_dir.join(MPC_OBS_DIR).join(format!("{designation}.rwo"));
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return vec![-1.0; n_obs],
    };

    let lines: Vec<&str> = content.lines().collect();
    read_rwo_lines(designation, &lines).unwrap_or_else(|e| {
        error!(%path, error = %e, "unexpected OrbFit residuals");
        vec![-1.0; n_obs]
    })
}

fn remove_matching(dir: &Utf8Path, keep: impl Fn(&str) -> bool) -> Result<(), LinkError> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if keep(entry.file_name()) {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Remove every file of a run: `<desig>.*` and `mpcobs/<desig>.*`.
pub fn obs_clean(ram_dir: &Utf8Path, designation: &str) -> Result<(), LinkError> {
    let prefix = format!("{designation}.");
    remove_matching(ram_dir, |name| name.starts_with(&prefix))?;
    remove_matching(&ram_dir.join(MPC_OBS_DIR), |name| name.starts_with(&prefix))
}

/// Remove the ephemeris links and the logs left by OrbFit.
pub fn final_clean(ram_dir: &Utf8Path) -> Result<(), LinkError> {
    remove_matching(ram_dir, |name| {
        matches!(
            Utf8Path::new(name).extension(),
            Some("bai") | Some("bep") | Some("log")
        )
    })
}
