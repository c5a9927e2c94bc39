use std::fs::{self, File};
use std::process::{Command, Stdio};

use camino::Utf8PathBuf;
use tracing::debug;

use crate::{
    linkage_errors::LinkError,
    observations::Observation,
    orbit_fitting::{
        orbfit_files::{
            final_clean, obs_clean, read_oel, read_rwo, run_name, write_inp, write_observation_file,
            write_oop, OopOptions, DEFAULT_OBSERVATORY_CODE, MPC_OBS_DIR,
        },
        orbital_elements::OrbitalElements,
        OrbitFitter,
    },
};

/// Location of the OrbFit installation and of its working files.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbFitConfig {
    /// Working directory of the runs, ideally on a memory file system.
    pub ram_dir: Utf8PathBuf,
    /// The `orbfit.x` executable.
    pub orbfit_binary: Utf8PathBuf,
    /// Directory holding `AST17.bai_431_fcct` and `AST17.bep_431_fcct`, linked into
    /// `ram_dir` by [`OrbFitProcess::prepare`].
    pub ast17_dir: Option<Utf8PathBuf>,
    pub observatory_code: String,
    pub options: OopOptions,
}

impl OrbFitConfig {
    pub fn new(ram_dir: impl Into<Utf8PathBuf>, orbfit_binary: impl Into<Utf8PathBuf>) -> Self {
        OrbFitConfig {
            ram_dir: ram_dir.into(),
            orbfit_binary: orbfit_binary.into(),
            ast17_dir: None,
            observatory_code: DEFAULT_OBSERVATORY_CODE.to_string(),
            options: OopOptions::default(),
        }
    }

    pub fn with_ast17_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.ast17_dir = Some(dir.into());
        self
    }
}

/// Orbit fitting through the external OrbFit program, one process per trajectory.
#[derive(Debug, Clone)]
pub struct OrbFitProcess {
    config: OrbFitConfig,
}

impl OrbFitProcess {
    pub fn new(config: OrbFitConfig) -> Self {
        OrbFitProcess { config }
    }

    pub fn config(&self) -> &OrbFitConfig {
        &self.config
    }

    /// Create the observation directory and link the asteroid ephemeris files.
    ///
    /// Existing links are kept.
    pub fn prepare(&self) -> Result<(), LinkError> {
        let ram_dir = &self.config.ram_dir;
        fs::create_dir_all(ram_dir.join(MPC_OBS_DIR))?;

        if let Some(ast17) = &self.config.ast17_dir {
            for (source, link) in [
                ("AST17.bai_431_fcct", "AST17.bai"),
                ("AST17.bep_431_fcct", "AST17.bep"),
            ] {
                let link = ram_dir.join(link);
                if link.exists() {
                    continue;
                }
                #[cfg(unix)]
                std::os::unix::fs::symlink(ast17.join(source), &link)?;
                #[cfg(not(unix))]
                fs::copy(ast17.join(source), &link).map(|_| ())?;
            }
        }
        Ok(())
    }

    /// Remove the ephemeris links and the logs once every fit is done.
    pub fn finish(&self) -> Result<(), LinkError> {
        final_clean(&self.config.ram_dir)
    }

    /// Identification mode: fit two arcs together, as if they were one object.
    ///
    /// Arguments
    /// -----------------
    /// * `first`, `second`: designations of the two arcs.
    /// * `obs_first`, `obs_second`: observations of each arc.
    ///
    /// Return
    /// ----------
    /// * The elements of the joint orbit, the sentinel when OrbFit finds none. The files of
    ///   both arcs and of the joint run are removed whatever the outcome.
    pub fn fit_pair(
        &self,
        first: &str,
        second: &str,
        obs_first: &[Observation],
        obs_second: &[Observation],
    ) -> Result<OrbitalElements, LinkError> {
        let run = run_name(first, Some(second));
        let result = self.write_and_run_pair(first, second, obs_first, obs_second);
        for designation in [first, second, run.as_str()] {
            self.clean(designation);
        }
        result
    }

    /// Same as [`OrbitFitter::fit`], also returning the chi of each observation read
    /// from the OrbFit residuals (`-1` each when OrbFit wrote none).
    pub fn fit_with_residuals(
        &self,
        designation: &str,
        observations: &[Observation],
    ) -> Result<(OrbitalElements, Vec<f64>), LinkError> {
        let result = self.write_and_run(designation, observations).map(|elements| {
            let chi = read_rwo(&self.config.ram_dir, designation, observations.len());
            (elements, chi)
        });
        self.clean(designation);
        result
    }

    fn clean(&self, designation: &str) {
        if let Err(e) = obs_clean(&self.config.ram_dir, designation) {
            debug!(designation, error = %e, "unable to clean OrbFit files");
        }
    }

    fn write_and_run(
        &self,
        designation: &str,
        observations: &[Observation],
    ) -> Result<OrbitalElements, LinkError> {
        let cfg = &self.config;
        write_observation_file(&cfg.ram_dir, designation, observations, &cfg.observatory_code)?;
        write_inp(&cfg.ram_dir, designation, None)?;
        write_oop(&cfg.ram_dir, designation, None, &cfg.options)?;
        self.run(designation)?;
        Ok(read_oel(&cfg.ram_dir, designation, None))
    }

    fn write_and_run_pair(
        &self,
        first: &str,
        second: &str,
        obs_first: &[Observation],
        obs_second: &[Observation],
    ) -> Result<OrbitalElements, LinkError> {
        let cfg = &self.config;
        write_observation_file(&cfg.ram_dir, first, obs_first, &cfg.observatory_code)?;
        write_observation_file(&cfg.ram_dir, second, obs_second, &cfg.observatory_code)?;
        write_inp(&cfg.ram_dir, first, Some(second))?;
        write_oop(&cfg.ram_dir, first, Some(second), &cfg.options)?;
        self.run(&run_name(first, Some(second)))?;
        Ok(read_oel(&cfg.ram_dir, first, Some(second)))
    }

    /// Run OrbFit with `<run>.inp` on stdin.
    fn run(&self, run: &str) -> Result<(), LinkError> {
        let ram_dir = &self.config.ram_dir;
        let inp = File::open(ram_dir.join(format!("{run}.inp")))?;

        let status = Command::new(self.config.orbfit_binary.as_std_path())
            .current_dir(ram_dir)
            .stdin(Stdio::from(inp))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(LinkError::OrbFitProcess {
                designation: run.to_string(),
                reason: format!("OrbFit exited with {status}"),
            })
        }
    }
}

impl OrbitFitter for OrbFitProcess {
    /// Write the run files, call OrbFit and read its output.
    ///
    /// A run without output file ends with the sentinel elements. Run files are removed
    /// whatever the outcome.
    fn fit(
        &self,
        designation: &str,
        observations: &[Observation],
    ) -> Result<OrbitalElements, LinkError> {
        let result = self.write_and_run(designation, observations);
        self.clean(designation);
        result
    }
}
