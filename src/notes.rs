//! Note names and their fundamental frequencies.

use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;

/// Fixed fundamentals of the octave starting at middle C.
pub struct PianoNotes;

impl PianoNotes {
    /// Middle C.
    pub const C4: f64 = 261.63;
    pub const D4: f64 = 293.66;
    pub const E4: f64 = 329.63;
    pub const F4: f64 = 349.23;
    pub const G4: f64 = 392.00;
    /// Standard tuning reference.
    pub const A4: f64 = 440.00;
    pub const B4: f64 = 493.88;
    pub const C5: f64 = 523.25;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PianoNote {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    B4,
    C5,
}

impl PianoNote {
    pub const ALL: [PianoNote; 8] = [
        PianoNote::C4,
        PianoNote::D4,
        PianoNote::E4,
        PianoNote::F4,
        PianoNote::G4,
        PianoNote::A4,
        PianoNote::B4,
        PianoNote::C5,
    ];

    pub fn frequency(self) -> f64 {
        match self {
            PianoNote::C4 => PianoNotes::C4,
            PianoNote::D4 => PianoNotes::D4,
            PianoNote::E4 => PianoNotes::E4,
            PianoNote::F4 => PianoNotes::F4,
            PianoNote::G4 => PianoNotes::G4,
            PianoNote::A4 => PianoNotes::A4,
            PianoNote::B4 => PianoNotes::B4,
            PianoNote::C5 => PianoNotes::C5,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PianoNote::C4 => "C4",
            PianoNote::D4 => "D4",
            PianoNote::E4 => "E4",
            PianoNote::F4 => "F4",
            PianoNote::G4 => "G4",
            PianoNote::A4 => "A4",
            PianoNote::B4 => "B4",
            PianoNote::C5 => "C5",
        }
    }

    /// A bare letter `C`..`B` names the note in the 4th octave.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "C" => Some(PianoNote::C4),
            "D" => Some(PianoNote::D4),
            "E" => Some(PianoNote::E4),
            "F" => Some(PianoNote::F4),
            "G" => Some(PianoNote::G4),
            "A" => Some(PianoNote::A4),
            "B" => Some(PianoNote::B4),
            _ => None,
        }
    }
}

impl fmt::Display for PianoNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PianoNote {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PianoNote::ALL
            .into_iter()
            .find(|n| n.symbol() == s)
            .ok_or_else(|| SynthError::invalid_argument(format!("unknown piano note '{s}'")))
    }
}

/// Parse a note name (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let mut chars = note.chars();
    let base = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };
    let octave: i32 = octave.parse().ok()?;

    // C4 = 60
    Some((octave + 1) * 12 + base + accidental)
}

/// `tuning_pitch` is the frequency of A4 (MIDI 69).
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * 2.0_f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Frequency of a note name. Names in [`PianoNote`] use the fixed table;
/// anything else is computed in equal temperament from A4 = 440 Hz.
pub fn note_to_frequency(note: &str) -> Option<f64> {
    if let Ok(known) = note.parse::<PianoNote>() {
        return Some(known.frequency());
    }
    note_to_midi(note).map(|midi| midi_to_frequency(midi, 440.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_values_are_exact() {
        assert_eq!(PianoNotes::C4, 261.63);
        assert_eq!(PianoNotes::A4, 440.00);
        assert_eq!(PianoNotes::C5, 523.25);
        assert_eq!(PianoNote::E4.frequency(), 329.63);
    }

    #[test]
    fn symbols_round_trip() {
        for note in PianoNote::ALL {
            assert_eq!(note.symbol().parse::<PianoNote>().unwrap(), note);
        }
        assert!("Z".parse::<PianoNote>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn letters_map_to_fourth_octave() {
        assert_eq!(PianoNote::from_letter("C"), Some(PianoNote::C4));
        assert_eq!(PianoNote::from_letter("B"), Some(PianoNote::B4));
        assert_eq!(PianoNote::from_letter("Z"), None);
        assert_eq!(PianoNote::from_letter("c"), None);
        assert_eq!(PianoNote::from_letter("C4"), None);
    }

    #[test]
    fn note_names_to_midi() {
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("A4"), Some(69));
        assert_eq!(note_to_midi("F#3"), Some(54));
        assert_eq!(note_to_midi("Bb5"), Some(82));
        assert_eq!(note_to_midi("H2"), None);
        assert_eq!(note_to_midi("C"), None);
    }

    #[test]
    fn frequencies_prefer_the_table() {
        assert_eq!(note_to_frequency("C4"), Some(261.63));
        let a3 = note_to_frequency("A3").unwrap();
        assert!((a3 - 220.0).abs() < 1e-9);
        assert!((midi_to_frequency(69, 432.0) - 432.0).abs() < 1e-12);
    }
}
