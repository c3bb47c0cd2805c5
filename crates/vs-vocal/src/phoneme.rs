//! Lyric-to-phoneme mapping.

use serde::{Deserialize, Serialize};

/// Most phonemes one note carries; further lyric characters are dropped.
pub const MAX_PHONEMES: usize = 16;

pub type Phonemes = heapless::Vec<Phoneme, MAX_PHONEMES>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phoneme {
    A,
    I,
    U,
    E,
    O,
    Ka,
    Sa,
    Ta,
    Na,
    Ha,
    Ma,
    Ya,
    Ra,
    Wa,
    /// Silent vowel-pause.
    Pause,
}

impl Phoneme {
    /// Ratio of the added harmonic to the fundamental; `None` for a pause.
    /// Consonant starts carry the harmonic of their `a` vowel.
    pub fn harmonic(self) -> Option<f64> {
        match self {
            Phoneme::A => Some(2.0),
            Phoneme::I => Some(3.0),
            Phoneme::U => Some(1.5),
            Phoneme::E => Some(2.5),
            Phoneme::O => Some(1.8),
            Phoneme::Pause => None,
            _ => Some(2.0),
        }
    }

    pub fn is_consonant(self) -> bool {
        matches!(
            self,
            Phoneme::Ka
                | Phoneme::Sa
                | Phoneme::Ta
                | Phoneme::Na
                | Phoneme::Ha
                | Phoneme::Ma
                | Phoneme::Ya
                | Phoneme::Ra
                | Phoneme::Wa
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Phoneme::A => "a",
            Phoneme::I => "i",
            Phoneme::U => "u",
            Phoneme::E => "e",
            Phoneme::O => "o",
            Phoneme::Ka => "ka",
            Phoneme::Sa => "sa",
            Phoneme::Ta => "ta",
            Phoneme::Na => "na",
            Phoneme::Ha => "ha",
            Phoneme::Ma => "ma",
            Phoneme::Ya => "ya",
            Phoneme::Ra => "ra",
            Phoneme::Wa => "wa",
            Phoneme::Pause => " ",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'a' => Phoneme::A,
            'i' => Phoneme::I,
            'u' => Phoneme::U,
            'e' => Phoneme::E,
            'o' => Phoneme::O,
            'k' => Phoneme::Ka,
            's' => Phoneme::Sa,
            't' => Phoneme::Ta,
            'n' => Phoneme::Na,
            'h' => Phoneme::Ha,
            'm' => Phoneme::Ma,
            'y' => Phoneme::Ya,
            'r' => Phoneme::Ra,
            'w' => Phoneme::Wa,
            ' ' => Phoneme::Pause,
            _ => return None,
        })
    }
}

/// Map lyrics to phonemes character by character, after lowercasing.
///
/// A consonant followed by `a` forms one syllable (`"ka"` is `[Ka]`);
/// followed by another vowel it stays a separate onset (`"ki"` is
/// `[Ka, I]`). Unmapped characters are dropped. An empty result is `[A]`.
pub fn lyrics_to_phonemes(lyrics: &str) -> Phonemes {
    let mut out = Phonemes::new();
    let mut chars = lyrics.chars().flat_map(char::to_lowercase).peekable();
    while let Some(c) = chars.next() {
        let Some(p) = Phoneme::from_char(c) else {
            continue;
        };
        if p.is_consonant() && chars.peek() == Some(&'a') {
            chars.next();
        }
        if out.push(p).is_err() {
            break;
        }
    }
    if out.is_empty() {
        let _ = out.push(Phoneme::A);
    }
    out
}
