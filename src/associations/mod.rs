//! # Associations
//!
//! The matching engine. Leaf modules first:
//!
//! * [`candidates`] – separation match, magnitude filter, mirror removal.
//! * [`cone_search`] – three-point direction check.
//! * [`intra_night`] – tracklets of a single night.
//! * [`time_window`] – eviction of stale trajectories and observations.
//! * [`id_management`] – applies accepted matches to trajectories.
//! * [`inter_night`] – the four inter-night stages.
//! * [`night_to_night`] – the nightly cycle chaining all of the above.
//!
//! [`params`] holds the thresholds and [`report`] the counters produced along the way.
pub mod candidates;
pub mod cone_search;
pub mod id_management;
pub mod inter_night;
pub mod intra_night;
pub mod night_to_night;
pub mod params;
pub mod report;
pub(crate) mod sky_zones;
pub mod time_window;
