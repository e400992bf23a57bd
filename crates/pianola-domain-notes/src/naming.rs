use pianola_ports::types::Pitch;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn pitch_class_name(pitch: Pitch) -> &'static str {
    PITCH_CLASSES[(pitch % 12) as usize]
}

/// Scientific pitch label, MIDI 60 = "C4".
pub fn note_label(pitch: Pitch) -> String {
    let octave = pitch as i32 / 12 - 1;
    format!("{}{}", pitch_class_name(pitch), octave)
}
