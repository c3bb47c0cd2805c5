//! Vocal synthesis rendered end to end.

use vs_vocal::{Note, VocalProject, VocalSynth};

fn mean_abs(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
}

#[test]
fn single_a4_note() {
    let mut synth = VocalSynth::new();
    synth.add_note(Note::new(69, 0.0, 0.5, 100, "a"));
    let buf = synth.synthesize(44100);

    assert_eq!(buf.channels(), 2);
    assert_eq!(buf.frames(), 22050);
    let samples = buf.as_f32().unwrap();
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.5, "peak {peak}");

    let edge = 22050 / 20 * 2;
    assert!(mean_abs(&samples[..edge]) < 0.1);
    assert!(mean_abs(&samples[samples.len() - edge..]) < 0.1);
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[samples.len() - 1], 0.0);
}

#[test]
fn overlapping_notes_sum() {
    let mut solo = VocalSynth::new();
    solo.add_note(Note::new(60, 0.0, 0.2, 100, "a"));
    let solo = solo.synthesize(8000);

    let mut duet = VocalSynth::new();
    duet.add_note(Note::new(60, 0.0, 0.2, 100, "a"));
    duet.add_note(Note::new(60, 0.3, 0.1, 100, "o"));
    let duet = duet.synthesize(8000);

    assert_eq!(duet.frames(), 3200);
    let (a, b) = (solo.as_f32().unwrap(), duet.as_f32().unwrap());
    assert_eq!(&b[..a.len()], a);
    assert!(b[2 * 2400..].iter().any(|&s| s != 0.0));
}

#[test]
fn project_renders_like_its_synth() {
    let json = r#"{
        "name": "hook",
        "tempo": 90.0,
        "notes": [
            {"midi_note": 67, "start": 0.0, "duration": 0.25, "lyrics": "sa"},
            {"midi_note": 69, "start": 0.25, "duration": 0.25, "lyrics": "ki", "vibrato": {"rate": 6.0, "depth": 0.2}}
        ]
    }"#;
    let project = VocalProject::from_json(json).unwrap();
    assert_eq!(project.notes.len(), 2);

    let mut direct = VocalSynth::new();
    for note in &project.notes {
        direct.add_note(note.clone());
    }
    assert_eq!(project.synth().synthesize(16000), direct.synthesize(16000));
}
