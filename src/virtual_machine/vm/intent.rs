use crate::virtual_machine::isa::Word;
use std::fmt;

/// Per-round choice returned by a fighter program through O0.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Intent {
    #[default]
    Defend = 0,
    Attack = 1,
    Gamble = 2,
}

impl Intent {
    /// Interprets an output register value. Anything outside 0..=2 is Defend.
    pub const fn from_word(word: Word) -> Self {
        match word {
            1 => Intent::Attack,
            2 => Intent::Gamble,
            _ => Intent::Defend,
        }
    }

    pub const fn word(&self) -> Word {
        *self as u8 as Word
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Intent::Defend => "defend",
            Intent::Attack => "attack",
            Intent::Gamble => "gamble",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion() {
        assert_eq!(Intent::from_word(0), Intent::Defend);
        assert_eq!(Intent::from_word(1), Intent::Attack);
        assert_eq!(Intent::from_word(2), Intent::Gamble);
        assert_eq!(Intent::from_word(3), Intent::Defend);
        assert_eq!(Intent::from_word(7), Intent::Defend);
        assert_eq!(Intent::from_word(99), Intent::Defend);
        assert_eq!(Intent::from_word(-1), Intent::Defend);
        assert_eq!(Intent::from_word(Word::MIN), Intent::Defend);
    }

    #[test]
    fn word_round_trip() {
        for intent in [Intent::Defend, Intent::Attack, Intent::Gamble] {
            assert_eq!(Intent::from_word(intent.word()), intent);
        }
        assert_eq!(Intent::Gamble.to_string(), "gamble");
    }
}
