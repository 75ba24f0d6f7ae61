//! End-to-end tracking scenarios driven through the public engine surface.

use approx::assert_abs_diff_eq;
use nalgebra as na;

use ktrack::{ArenaLayout, Detection, Detector, Error, Region, TrackerConfig, TrackerEngine};

fn detection_at(x: f64, y: f64) -> Detection {
    Detection::new(x, y, 18.0, 18.0, 0.85)
}

/// Scripted stand-in for the perception module: one pre-baked detection
/// list per frame index.
struct ScriptedDetector {
    frames: Vec<Vec<Detection>>,
}

impl Detector for ScriptedDetector {
    type Frame = usize;

    fn detect(&mut self, frame: &usize) -> Result<Vec<Detection>, Error> {
        self.frames
            .get(*frame)
            .cloned()
            .ok_or_else(|| Error::Detection(format!("no frame {frame}")))
    }
}

#[test]
fn follows_moving_subjects_through_the_detector_boundary() {
    let mut engine = TrackerEngine::new(TrackerConfig::new(2, Region::frame(640.0, 480.0))).unwrap();

    // two subjects drifting apart, 12 scripted frames
    let frames: Vec<Vec<Detection>> = (0..12)
        .map(|i| {
            let t = i as f64;
            vec![
                detection_at(100.0 + 3.0 * t, 100.0),
                detection_at(400.0 - 3.0 * t, 300.0),
            ]
        })
        .collect();
    let mut detector = ScriptedDetector { frames };

    for i in 0..12 {
        engine
            .track_frame(&mut detector, &i, (i + 1) as f64 * 0.04)
            .unwrap();
    }

    let mut xs: Vec<f64> = engine.tracks().iter().map(|t| t.position().x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_abs_diff_eq!(xs[0], 133.0, epsilon = 1e-9);
    assert_abs_diff_eq!(xs[1], 367.0, epsilon = 1e-9);

    let mut missing = ScriptedDetector { frames: Vec::new() };
    assert!(matches!(
        engine.track_frame(&mut missing, &0, 1.0),
        Err(Error::Detection(_))
    ));
}

#[test]
fn five_frame_occlusion_coasts_and_recovers() {
    let mut engine = TrackerEngine::new(TrackerConfig::new(1, Region::frame(640.0, 480.0))).unwrap();

    // constant 2 px/frame rightward motion
    let mut ts = 0.0;
    for i in 1..=12 {
        ts += 0.04;
        engine
            .step(&[detection_at(100.0 + 2.0 * i as f64, 240.0)], ts)
            .unwrap();
    }
    let speed_before = engine.tracks()[0].velocity().norm();

    // five missed frames: the subject keeps moving, the track coasts
    for _ in 0..5 {
        ts += 0.04;
        engine.step(&[], ts).unwrap();
        let track = &engine.tracks()[0];
        assert!(track.bounds().contains(&track.position()));
        assert!(track.velocity().norm() <= speed_before * 1.5 + 1e-9);
    }

    // the detector comes back where the subject actually is
    ts += 0.04;
    engine.step(&[detection_at(136.0, 240.0)], ts).unwrap();
    assert_abs_diff_eq!(engine.tracks()[0].position().x, 136.0, epsilon = 1e-9);
}

#[test]
fn identities_survive_detection_dropout() {
    let mut engine = TrackerEngine::new(TrackerConfig::new(3, Region::frame(640.0, 480.0))).unwrap();
    let spots = [
        na::Point2::new(80.0, 80.0),
        na::Point2::new(320.0, 240.0),
        na::Point2::new(560.0, 400.0),
    ];
    let dets: Vec<_> = spots.iter().map(|p| detection_at(p.x, p.y)).collect();

    let owner_of = |engine: &TrackerEngine, spot: &na::Point2<f64>| {
        engine
            .tracks()
            .iter()
            .min_by(|a, b| {
                na::distance(&a.position(), spot)
                    .partial_cmp(&na::distance(&b.position(), spot))
                    .unwrap()
            })
            .map(|t| t.id())
            .unwrap()
    };

    let mut ts = 0.0;
    for _ in 0..12 {
        ts += 0.04;
        engine.step(&dets, ts).unwrap();
    }
    let owners: Vec<_> = spots.iter().map(|s| owner_of(&engine, s)).collect();

    for _ in 0..3 {
        ts += 0.04;
        engine.step(&[], ts).unwrap();
    }
    for _ in 0..3 {
        ts += 0.04;
        engine.step(&dets, ts).unwrap();
    }

    let owners_after: Vec<_> = spots.iter().map(|s| owner_of(&engine, s)).collect();
    assert_eq!(owners, owners_after);
}

#[test]
fn multi_plate_sessions_keep_tracks_on_their_plates() {
    let mut config = TrackerConfig::new(4, Region::frame(400.0, 400.0));
    config.layout = ArenaLayout::Grid { rows: 2, cols: 2 };
    let mut engine = TrackerEngine::new(config).unwrap();

    // one subject per plate, jittering around each plate center
    let centers = [
        (100.0, 100.0),
        (300.0, 100.0),
        (100.0, 300.0),
        (300.0, 300.0),
    ];

    let mut ts = 0.0;
    for i in 0..20 {
        ts += 0.04;
        let jitter = if i % 2 == 0 { 3.0 } else { -3.0 };
        let dets: Vec<_> = centers
            .iter()
            .map(|&(x, y)| detection_at(x + jitter, y))
            .collect();
        engine.step(&dets, ts).unwrap();
    }

    for track in engine.tracks() {
        assert!(track.bounds().contains(&track.position()));
        assert!(track.bounds().width() < 250.0, "track kept a plate-sized region");
    }
}

#[test]
fn observer_views_expose_positions_velocities_and_trails() {
    let mut engine = TrackerEngine::new(TrackerConfig::new(1, Region::frame(640.0, 480.0))).unwrap();

    let mut ts = 0.0;
    for i in 1..=8 {
        ts += 0.04;
        engine
            .step(&[detection_at(50.0 + 5.0 * i as f64, 60.0)], ts)
            .unwrap();
    }

    let track = &engine.tracks()[0];

    assert_abs_diff_eq!(track.position().x, 90.0, epsilon = 1e-9);
    assert!(track.velocity().x > 0.0);

    let trail: Vec<_> = track.recent_positions().collect();
    assert_eq!(trail.len(), 8);
    // newest first
    assert!(trail[0].0 > trail[1].0);

    let history = track.history();
    assert_eq!(history.len(), 8);
    assert_abs_diff_eq!(history[0].1.x, 55.0, epsilon = 1e-9);
}
