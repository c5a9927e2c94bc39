use std::fmt;

use crate::{constants::Nid, trajectories::Trajectory};

/// Shape of a trajectory set after a night: how long the trajectories are and how many
/// nights they cover.
///
/// `median_len` uses the nearest rank on the sorted lengths, so it is always an actual
/// trajectory length. `orbit_ready` counts the trajectories long enough for orbit fitting.
///
/// Display
/// -----------------
/// * `{}` – single line, for logs.
/// * `{:#}` – aligned block.
///
/// See also
/// ------------
/// * [`TrajectorySet::stats`](crate::trajectories::TrajectorySet::stats)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectoryStats {
    pub trajectories: usize,
    pub observations: usize,
    pub min_len: usize,
    pub median_len: usize,
    pub max_len: usize,
    /// Widest range of nights covered by one trajectory, both ends included.
    pub max_night_span: Nid,
    pub orbit_ready: usize,
}

impl TrajectoryStats {
    pub(crate) fn from_trajectories<'a>(
        trajectories: impl IntoIterator<Item = &'a Trajectory>,
        orbfit_limit: usize,
    ) -> Option<Self> {
        let mut lengths = Vec::new();
        let mut max_night_span = 0;
        for traj in trajectories {
            lengths.push(traj.len());
            if let (Some(first), Some(last)) = (traj.first(), traj.last()) {
                max_night_span = max_night_span.max(last.nid.saturating_sub(first.nid) + 1);
            }
        }
        if lengths.is_empty() {
            return None;
        }
        lengths.sort_unstable();

        let n = lengths.len();
        Some(TrajectoryStats {
            trajectories: n,
            observations: lengths.iter().sum(),
            min_len: lengths[0],
            median_len: lengths[(n - 1) / 2],
            max_len: lengths[n - 1],
            max_night_span,
            orbit_ready: lengths.iter().filter(|&&l| l >= orbfit_limit).count(),
        })
    }
}

impl fmt::Display for TrajectoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "trajectories   : {}", self.trajectories)?;
            writeln!(f, "observations   : {}", self.observations)?;
            writeln!(
                f,
                "length         : {} / {} / {} (min / median / max)",
                self.min_len, self.median_len, self.max_len
            )?;
            writeln!(f, "max night span : {}", self.max_night_span)?;
            write!(f, "orbit ready    : {}", self.orbit_ready)
        } else {
            write!(
                f,
                "n={} obs={} len={}/{}/{} span={} ready={}",
                self.trajectories,
                self.observations,
                self.min_len,
                self.median_len,
                self.max_len,
                self.max_night_span,
                self.orbit_ready
            )
        }
    }
}

#[cfg(test)]
mod trajectory_stats_test {
    use super::*;
    use crate::observations::Observation;

    fn traj(id: u32, nights: &[Nid]) -> Trajectory {
        Trajectory::new(
            id,
            nights
                .iter()
                .enumerate()
                .map(|(k, &nid)| Observation::new(0.0, 0.0, 2459000.5 + nid as f64 + k as f64 * 1e-3, 1, 18.0, k as i64, nid)),
        )
    }

    #[test]
    fn test_stats() {
        assert_eq!(TrajectoryStats::from_trajectories(&[], 3), None);

        let set = [traj(0, &[1, 1]), traj(1, &[1, 2, 5]), traj(2, &[3, 3, 4, 4, 6])];
        let stats = TrajectoryStats::from_trajectories(&set, 3).unwrap();
        assert_eq!(
            stats,
            TrajectoryStats {
                trajectories: 3,
                observations: 10,
                min_len: 2,
                median_len: 3,
                max_len: 5,
                max_night_span: 5,
                orbit_ready: 2,
            }
        );
        assert_eq!(stats.to_string(), "n=3 obs=10 len=2/3/5 span=5 ready=2");
        assert!(format!("{stats:#}").starts_with("trajectories   : 3\n"));
    }
}
