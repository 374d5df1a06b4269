use crabtrack_rs::{Detection, Sort, SortConfig};

fn shifted(offset: f32) -> Detection {
    Detection::new(100.0 + offset, 100.0 + offset, 200.0 + offset, 200.0 + offset, 0.9)
}

#[test]
fn test_basic_tracking() {
    let mut tracker = Sort::new(SortConfig {
        min_hits: 1,
        ..Default::default()
    });

    // Frame 1: a new track is reported while the tracker warms up
    let tracks1 = tracker.update(&[shifted(0.0)]).unwrap();
    assert_eq!(tracks1.len(), 1);
    let id1 = tracks1[0].track_id;
    assert_eq!(id1, 1);

    // Frames 2-3: same object moving slightly
    for (frame, offset) in [(2, 5.0), (3, 10.0)] {
        let tracks = tracker.update(&[shifted(offset)]).unwrap();
        assert_eq!(tracks.len(), 1, "frame {}", frame);
        assert_eq!(tracks[0].track_id, id1); // ID should persist
    }

    // Frame 4: object missed, the track coasts without being reported
    let tracks4 = tracker.update(&[]).unwrap();
    assert!(tracks4.is_empty());
    assert_eq!(tracker.num_tracklets(), 1);

    // Frame 5: object reappears within max_age and keeps its id
    let tracks5 = tracker.update(&[shifted(20.0)]).unwrap();
    assert_eq!(tracks5.len(), 1);
    assert_eq!(tracks5[0].track_id, id1);
}

#[test]
fn test_lost_track_gets_new_id() {
    let mut tracker = Sort::new(SortConfig {
        min_hits: 1,
        ..Default::default()
    });

    for offset in [0.0, 2.0, 4.0] {
        tracker.update(&[shifted(offset)]).unwrap();
    }

    // Two missed frames exceed max_age = 1
    tracker.update(&[]).unwrap();
    tracker.update(&[]).unwrap();
    assert_eq!(tracker.num_tracklets(), 0);

    // A newborn track has no hit streak yet, so it is hidden on its birth frame
    let born = tracker.update(&[shifted(6.0)]).unwrap();
    assert!(born.is_empty());
    assert_eq!(tracker.num_tracklets(), 1);

    let tracks = tracker.update(&[shifted(8.0)]).unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].track_id, 2);
}

#[test]
fn test_two_objects_keep_their_ids() {
    let mut tracker = Sort::new(SortConfig::default());

    let left = |dx: f32| Detection::new(10.0 + dx, 10.0, 60.0 + dx, 60.0, 0.8);
    let right = |dx: f32| Detection::new(300.0 - dx, 200.0, 360.0 - dx, 260.0, 0.8);

    let first = tracker.update(&[left(0.0), right(0.0)]).unwrap();
    // Newest track first
    let ids: Vec<u64> = first.iter().map(|t| t.track_id).collect();
    assert_eq!(ids, vec![2, 1]);

    for step in 1..=6 {
        let dx = step as f32 * 3.0;
        // Swap the detection order; association must not depend on it
        let tracks = tracker.update(&[right(dx), left(dx)]).unwrap();
        assert_eq!(tracks.len(), 2);
        for t in &tracks {
            let [x1, ..] = t.bbox.to_tlbr();
            let expected = if x1 < 150.0 { 1 } else { 2 };
            assert_eq!(t.track_id, expected, "step {}", step);
        }
    }
    assert_eq!(tracker.num_tracklets(), 2);
}

#[test]
fn test_unconfirmed_track_is_hidden_after_warmup() {
    let mut tracker = Sort::new(SortConfig::default());

    // Warm-up: frame_count <= min_hits reports everything
    for _ in 0..3 {
        tracker.update(&[shifted(0.0)]).unwrap();
    }

    // A new object after warm-up needs min_hits consecutive matches
    let newcomer = Detection::new(400.0, 400.0, 450.0, 450.0, 0.9);
    let mut reported = Vec::new();
    for _ in 0..5 {
        let tracks = tracker.update(&[shifted(0.0), newcomer.clone()]).unwrap();
        reported.push(tracks.iter().any(|t| t.track_id == 2));
    }
    assert_eq!(reported, vec![false, false, false, true, true]);
}
