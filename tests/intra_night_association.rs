mod common;

use common::{obs, JD0};
use nightlink::associations::intra_night::intra_night_association;
use nightlink::{AssociationParams, Observation, Trajectory};

#[test]
fn test_two_tracklets_from_four_alerts() {
    // two movers, 36 arcsec apart within a 30 minutes gap, 40 degrees from each other
    let night = vec![
        obs(10.0, 5.0, JD0 + 0.10, 1, 1),
        obs(50.0, -5.0, JD0 + 0.10, 2, 1),
        obs(10.01, 5.0, JD0 + 0.12, 3, 1),
        obs(50.01, -5.0, JD0 + 0.12, 4, 1),
    ];

    let out = intra_night_association(night, 7, &AssociationParams::default());

    assert_eq!(out.tracklets.len(), 2);
    assert!(out.remaining.is_empty());
    assert!(out.tracklets.iter().all(|t| t.id() >= 7));

    let first = out.tracklets.get(7).unwrap();
    assert_eq!(first.candids().collect::<Vec<_>>(), vec![1, 3]);
    let second = out.tracklets.get(8).unwrap();
    assert_eq!(second.candids().collect::<Vec<_>>(), vec![2, 4]);
    assert_eq!(out.report.get("number of intra night tracklets"), 2);
}

#[test]
fn test_isolated_alerts_stay_unassociated() {
    let night = vec![
        obs(10.0, 5.0, JD0 + 0.10, 1, 1),
        obs(11.0, 5.0, JD0 + 0.12, 2, 1),
        obs(12.0, 5.0, JD0 + 0.14, 3, 1),
    ];

    let out = intra_night_association(night.clone(), 0, &AssociationParams::default());
    assert!(out.tracklets.is_empty());
    assert_eq!(out.remaining, night);
}

#[test]
fn test_different_filters_use_their_own_criterion() {
    // a 2 mag jump passes the same-band criterion (2.21) but not the cross-band one (1.75)
    let same_band = vec![
        Observation::new(10.0, 5.0, JD0 + 0.10, 1, 17.0, 1, 1),
        Observation::new(10.01, 5.0, JD0 + 0.12, 1, 19.0, 2, 1),
    ];
    let cross_band = vec![
        Observation::new(10.0, 5.0, JD0 + 0.10, 1, 17.0, 1, 1),
        Observation::new(10.01, 5.0, JD0 + 0.12, 2, 19.0, 2, 1),
    ];
    let params = AssociationParams::default();

    assert_eq!(intra_night_association(same_band, 0, &params).tracklets.len(), 1);
    let out = intra_night_association(cross_band, 0, &params);
    assert!(out.tracklets.is_empty());
    assert_eq!(out.remaining.len(), 2);
}

#[test]
fn test_metrics_against_ground_truth() {
    let night = vec![
        obs(10.0, 5.0, JD0 + 0.10, 1, 1).with_ssnamenr("1999 AB"),
        obs(10.01, 5.0, JD0 + 0.12, 2, 1).with_ssnamenr("1999 AB"),
        obs(10.0, 5.02, JD0 + 0.11, 3, 1).with_ssnamenr("2001 XY"),
    ];
    let params = AssociationParams::builder().run_metrics(true).build().unwrap();

    let out = intra_night_association(night, 0, &params);
    let metrics = out.report.metrics.unwrap();
    assert_eq!(metrics.total_real_associations, 1);
    assert_eq!(metrics.true_positives, 1);
    assert!(out.tracklets.iter().map(Trajectory::len).sum::<usize>() >= 2);
}

#[test]
fn test_alerts_on_the_ra_origin_meridian() {
    // movers along ra = 0, the same coordinate repeated for every alert
    let night: Vec<Observation> = (0..100)
        .flat_map(|k| {
            let dec = -25.0 + 0.5 * k as f64;
            [
                obs(0.0, dec, JD0 + 0.10, 2 * k, 1),
                obs(0.0, dec + 0.005, JD0 + 0.12, 2 * k + 1, 1),
            ]
        })
        .collect();

    let out = intra_night_association(night, 0, &AssociationParams::default());

    assert_eq!(out.tracklets.len(), 100);
    assert!(out.remaining.is_empty());
    for tracklet in out.tracklets.iter() {
        let candids: Vec<_> = tracklet.candids().collect();
        assert_eq!(candids.len(), 2);
        assert_eq!(candids[0] % 2, 0);
        assert_eq!(candids[1], candids[0] + 1);
    }
}
