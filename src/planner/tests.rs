// Unit tests for the sequence planner

use super::*;

fn create_test_aroll(durations: &[f64]) -> Vec<ARollSegment> {
    durations
        .iter()
        .enumerate()
        .map(|(i, d)| {
            ARollSegment::whole_file(format!("segment_{}", i), format!("/a/segment_{}.mp4", i), *d)
                .unwrap()
        })
        .collect()
}

fn create_test_broll(count: usize) -> Vec<BRollSegment> {
    (0..count)
        .map(|i| {
            BRollSegment::new(
                format!("broll_{}", i),
                format!("/b/broll_{}.png", i),
                ContentType::Image,
            )
            .unwrap()
        })
        .collect()
}

fn kinds(sequence: &AssemblySequence) -> Vec<EntryKind> {
    sequence.entries.iter().map(|e| e.kind).collect()
}

fn visuals(sequence: &AssemblySequence) -> Vec<&str> {
    sequence
        .entries
        .iter()
        .map(|e| e.visual_source.segment_id.as_str())
        .collect()
}

fn assert_audio_unique(sequence: &AssemblySequence, a_roll: &[ARollSegment]) {
    let audio: Vec<&str> = sequence.entries.iter().map(|e| e.audio_source.as_str()).collect();
    let expected: Vec<&str> = a_roll.iter().map(|s| s.id()).collect();
    assert_eq!(audio, expected);
}

const ALL_POLICIES: [SequencePolicy; 6] = [
    SequencePolicy::NoOverlap,
    SequencePolicy::Standard { broll_density: 0.5 },
    SequencePolicy::Bookends,
    SequencePolicy::Sandwich,
    SequencePolicy::BRollHeavy,
    SequencePolicy::BRollFull,
];

#[test]
fn test_no_overlap_three_segments() {
    let a_roll = create_test_aroll(&[10.0, 8.0, 12.0]);
    let b_roll = create_test_broll(2);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::NoOverlap)
        .unwrap();

    assert_eq!(
        kinds(&sequence),
        vec![
            EntryKind::ArollFull,
            EntryKind::BrollWithArollAudio,
            EntryKind::ArollFull
        ]
    );
    assert_eq!(visuals(&sequence), vec!["segment_0", "broll_0", "segment_2"]);
    assert_eq!(sequence.entries[1].audio_source, "segment_1");
    assert_eq!(sequence.entries[1].duration, 8.0);
}

#[test]
fn test_no_overlap_four_segments_cycles_pool() {
    let a_roll = create_test_aroll(&[10.0, 8.0, 12.0, 9.0]);
    let b_roll = create_test_broll(2);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::NoOverlap)
        .unwrap();

    assert_eq!(sequence.len(), 4);
    assert_eq!(visuals(&sequence), vec!["segment_0", "broll_0", "broll_1", "segment_3"]);
    assert_eq!(sequence.total_duration(), 39.0);
    assert_audio_unique(&sequence, &a_roll);
}

#[test]
fn test_no_overlap_wraps_small_pool() {
    let a_roll = create_test_aroll(&[3.0; 6]);
    let b_roll = create_test_broll(2);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::NoOverlap)
        .unwrap();
    assert_eq!(
        visuals(&sequence),
        vec!["segment_0", "broll_0", "broll_1", "broll_0", "broll_1", "segment_5"]
    );
}

#[test]
fn test_single_segment_is_aroll_full_for_every_policy() {
    let a_roll = create_test_aroll(&[7.0]);
    let b_roll = create_test_broll(3);
    for policy in [
        SequencePolicy::NoOverlap,
        SequencePolicy::Standard { broll_density: 1.0 },
        SequencePolicy::Bookends,
        SequencePolicy::Sandwich,
        SequencePolicy::BRollHeavy,
    ] {
        let sequence = SequencePlanner::default().plan(&a_roll, &b_roll, &policy).unwrap();
        assert_eq!(kinds(&sequence), vec![EntryKind::ArollFull], "{}", policy);
    }
}

#[test]
fn test_empty_pool_degrades_to_aroll() {
    let a_roll = create_test_aroll(&[4.0, 5.0, 6.0, 7.0]);
    for policy in ALL_POLICIES.iter() {
        let sequence = SequencePlanner::default().plan(&a_roll, &[], policy).unwrap();
        assert!(
            sequence.entries.iter().all(|e| e.kind == EntryKind::ArollFull),
            "{}",
            policy
        );
        assert_audio_unique(&sequence, &a_roll);
    }
}

#[test]
fn test_every_policy_keeps_audio_unique() {
    for count in 0..=9 {
        let a_roll = create_test_aroll(&vec![2.5; count.max(1)]);
        for pool in 0..4 {
            let b_roll = create_test_broll(pool);
            for policy in ALL_POLICIES.iter() {
                let sequence = SequencePlanner::default().plan(&a_roll, &b_roll, policy).unwrap();
                assert_audio_unique(&sequence, &a_roll);
                assert!(crate::domain::rules::OverlapValidator::validate(&sequence).is_empty());
                assert!(sequence.validate().is_ok());
            }
        }
    }
}

#[test]
fn test_empty_aroll_is_rejected() {
    let err = SequencePlanner::default()
        .plan(&[], &create_test_broll(2), &SequencePolicy::NoOverlap)
        .unwrap_err();
    match err {
        DomainError::EmptyInput { input } => assert!(input.contains("A-Roll")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_duplicate_aroll_ids_are_rejected() {
    let mut a_roll = create_test_aroll(&[3.0, 4.0]);
    a_roll.push(a_roll[0].clone());
    let err = SequencePlanner::default()
        .plan(&a_roll, &[], &SequencePolicy::NoOverlap)
        .unwrap_err();
    assert_eq!(err.segment_id(), Some("segment_0"));
}

#[test]
fn test_standard_density_spreads_evenly() {
    // 8 middles at 25% -> 2 overlays at middle positions 0 and 4
    let a_roll = create_test_aroll(&[2.0; 10]);
    let b_roll = create_test_broll(5);
    let sequence = SequencePlanner::default()
        .plan(
            &a_roll,
            &b_roll,
            &SequencePolicy::Standard { broll_density: 0.25 },
        )
        .unwrap();

    let overlaid: Vec<usize> = sequence
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == EntryKind::BrollWithArollAudio)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(overlaid, vec![1, 5]);
    assert_eq!(sequence.entries[1].visual_source.segment_id, "broll_0");
    assert_eq!(sequence.entries[5].visual_source.segment_id, "broll_1");
}

#[test]
fn test_standard_is_limited_by_pool() {
    let a_roll = create_test_aroll(&[2.0; 6]);
    let b_roll = create_test_broll(1);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::Standard { broll_density: 1.0 })
        .unwrap();
    let overlays = sequence
        .entries
        .iter()
        .filter(|e| e.kind == EntryKind::BrollWithArollAudio)
        .count();
    assert_eq!(overlays, 1);
}

#[test]
fn test_bookends_never_reuses_broll() {
    let a_roll = create_test_aroll(&[2.0; 6]);
    let b_roll = create_test_broll(2);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::Bookends)
        .unwrap();
    assert_eq!(
        visuals(&sequence),
        vec!["segment_0", "broll_0", "broll_1", "segment_3", "segment_4", "segment_5"]
    );
}

#[test]
fn test_sandwich_alternates() {
    let a_roll = create_test_aroll(&[2.0; 7]);
    let b_roll = create_test_broll(2);
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::Sandwich)
        .unwrap();
    assert_eq!(
        visuals(&sequence),
        vec!["segment_0", "broll_0", "segment_2", "broll_1", "segment_4", "broll_0", "segment_6"]
    );
}

#[test]
fn test_broll_heavy_and_full() {
    let a_roll = create_test_aroll(&[2.0; 4]);
    let b_roll = create_test_broll(3);
    let heavy = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::BRollHeavy)
        .unwrap();
    assert_eq!(visuals(&heavy), vec!["segment_0", "broll_0", "broll_1", "broll_2"]);

    let full = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::BRollFull)
        .unwrap();
    assert_eq!(visuals(&full), vec!["broll_0", "broll_1", "broll_2", "broll_0"]);
}

#[test]
fn test_custom_passes_through_unmodified() {
    let a_roll = create_test_aroll(&[5.0, 6.0]);
    let b_roll = create_test_broll(1);
    let custom = vec![
        TimelineEntry::broll_with_aroll_audio(0, &a_roll[1], &b_roll[0]),
        TimelineEntry::aroll_full(1, &a_roll[0]),
    ];
    let sequence = SequencePlanner::default()
        .plan(&a_roll, &b_roll, &SequencePolicy::Custom(custom.clone()))
        .unwrap();
    assert_eq!(sequence.entries, custom);
}

#[test]
fn test_custom_reports_every_unresolved_reference() {
    let a_roll = create_test_aroll(&[5.0, 6.0]);
    let b_roll = create_test_broll(1);
    let mut bad_audio = TimelineEntry::aroll_full(0, &a_roll[0]);
    bad_audio.audio_source = "segment_7".to_string();
    let mut bad_visual = TimelineEntry::broll_with_aroll_audio(1, &a_roll[1], &b_roll[0]);
    bad_visual.visual_source.segment_id = "broll_9".to_string();

    let err = SequencePlanner::default()
        .plan(
            &a_roll,
            &b_roll,
            &SequencePolicy::Custom(vec![bad_audio, bad_visual]),
        )
        .unwrap_err();

    match err {
        DomainError::UnresolvedReferences(refs) => {
            let ids: Vec<&str> = refs.iter().map(|r| r.segment_id.as_str()).collect();
            assert_eq!(ids, vec!["segment_7", "broll_9"]);
            assert_eq!(refs[1].entry_index, Some(1));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_policy_parse() {
    assert_eq!(
        SequencePolicy::parse("no_overlap", 0.25).unwrap(),
        SequencePolicy::NoOverlap
    );
    assert_eq!(
        SequencePolicy::parse("Standard", 0.5).unwrap(),
        SequencePolicy::Standard { broll_density: 0.5 }
    );
    assert_eq!(
        SequencePolicy::parse("broll-heavy", 0.25).unwrap(),
        SequencePolicy::BRollHeavy
    );
    assert!(SequencePolicy::parse("custom", 0.25).is_err());
    assert!(SequencePolicy::parse("random", 0.25).is_err());
}

#[test]
fn test_planner_carries_resolution_and_crossfade() {
    let a_roll = create_test_aroll(&[5.0]);
    let sequence = SequencePlanner::new(Resolution::LANDSCAPE_1080, 0.5)
        .plan(&a_roll, &[], &SequencePolicy::NoOverlap)
        .unwrap();
    assert_eq!(sequence.target_resolution, Resolution::LANDSCAPE_1080);
    assert_eq!(sequence.crossfade_duration, 0.5);
    assert_eq!(sequence.audio_segments, a_roll);
}
