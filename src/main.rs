//! Example usage of the JIPDA tracker
//!
//! Two crossing constant-velocity targets observed by a noisy position
//! sensor, with a third target appearing mid-scenario and discovered through
//! the search-track lifecycle.

use jipda::prelude::*;

fn main() {
    println!("JIPDA: Joint Probabilistic Data Association Tracker");
    println!("===================================================\n");

    let dynamics = ConstantVelocity2D::new(
        0.5,  // Process noise (acceleration std)
        0.99, // Survival probability
    );
    let sensor = PositionSensor2D::new(
        2.0, // Measurement noise std
    );

    let config = JipdaConfigBuilder::new()
        .gate_threshold(9.21) // chi-squared 99% quantile, 2 dof
        .prob_detection(0.9)
        .prob_gating(0.99)
        .birth_threshold(0.9)
        .death_threshold(0.1)
        .search_prior(Estimate::with_diagonal_covariance(
            StateVector::from_array([100.0, 100.0, 0.0, 0.0]),
            &nalgebra::vector![3000.0, 3000.0, 100.0, 100.0],
        ))
        .build()
        .expect("demo configuration is complete");

    let mut tracker: JipdaTracker<f64, _, _, _, 4, 2> = JipdaTracker::new(
        config,
        EstimatorKind::Linear,
        dynamics,
        sensor,
        ExactEnumeration::new(),
    );

    // Two targets on crossing courses
    tracker.spawn_track(
        Estimate::with_diagonal_covariance(
            StateVector::from_array([0.0, 0.0, 10.0, 5.0]),
            &nalgebra::vector![25.0, 25.0, 4.0, 4.0],
        ),
        0.95,
    );
    tracker.spawn_track(
        Estimate::with_diagonal_covariance(
            StateVector::from_array([200.0, 0.0, -10.0, 5.0]),
            &nalgebra::vector![25.0, 25.0, 4.0, 4.0],
        ),
        0.95,
    );

    let dt = 1.0;
    for k in 1..=20 {
        let t = k as f64;

        // Scripted measurements: two crossing targets plus a third appearing
        // at step 6, with slight deterministic offsets standing in for noise
        let mut scan = vec![
            Measurement::from_array([10.0 * t + 0.4, 5.0 * t - 0.3]),
            Measurement::from_array([200.0 - 10.0 * t - 0.2, 5.0 * t + 0.5]),
        ];
        if k >= 6 {
            let t3 = (k - 6) as f64;
            scan.push(Measurement::from_array([100.0 + 0.3, 100.0 + 8.0 * t3 - 0.4]));
        }

        let report = tracker.step(dt, &scan).expect("cycle");

        print!("step {:2}: {} tracks", k, report.tracks.len());
        for summary in &report.tracks {
            print!(
                "  [{} @ ({:6.1}, {:6.1}) r={:.2}]",
                summary.label,
                summary.mean.index(0),
                summary.mean.index(1),
                summary.existence
            );
        }
        if !report.promoted.is_empty() {
            print!("  promoted {}", report.promoted.len());
        }
        println!();
    }

    // Smoothed trajectory of the first surviving track
    if let Some(track) = tracker.tracks().first() {
        let label = track.label;
        let smoothed = tracker
            .smoothed_trajectory(label)
            .expect("completed history");
        println!(
            "\nSmoothed {} steps of track {}; final position ({:.1}, {:.1})",
            smoothed.len(),
            label,
            smoothed.last().unwrap().mean.index(0),
            smoothed.last().unwrap().mean.index(1),
        );
    }
}
