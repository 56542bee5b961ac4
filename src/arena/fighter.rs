use crate::virtual_machine::assembler::{assemble_reported, assemble_source, load_reported};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::Intent;
use std::path::Path;

/// Health every fighter starts a match with, and the upper bound for it.
pub const MAX_HEALTH: Word = 1000;

/// Strength multiplier at the start of a match.
pub const BASE_STRENGTH: Word = 1;

/// One side of a match: an assembled program plus its combat state.
///
/// The program is fixed once the fighter is built. Health and strength change
/// every round through the resolver.
#[derive(Clone, Debug)]
pub struct Fighter {
    name: String,
    source: String,
    program: Program,
    health: Word,
    max_health: Word,
    strength: Word,
    last_intent: Intent,
}

impl Fighter {
    /// Assembles `source` into a fighter at full health.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Result<Self, VMError> {
        let source = source.into();
        let program = assemble_source(&source)?;
        Ok(Self::new(name, source, program))
    }

    /// Loads and assembles the program at `path`. The fighter is named after
    /// the file.
    ///
    /// Load failures and compile errors are logged, the latter as a
    /// diagnostic against the source, before they are returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VMError> {
        let path = path.as_ref();
        let source = load_reported(path)?;
        let program = assemble_reported(&path.display().to_string(), &source)?;
        Ok(Self::new(fighter_name(path), source, program))
    }

    /// Builds a fighter around an already assembled program.
    pub fn new(name: impl Into<String>, source: impl Into<String>, program: Program) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            program,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            strength: BASE_STRENGTH,
            last_intent: Intent::Defend,
        }
    }

    /// Restores full health and base strength, with health capped at
    /// `max_health` (itself capped at [`MAX_HEALTH`]).
    pub fn reset(&mut self, max_health: Word) {
        self.max_health = max_health.clamp(0, MAX_HEALTH);
        self.health = self.max_health;
        self.strength = BASE_STRENGTH;
        self.last_intent = Intent::Defend;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn health(&self) -> Word {
        self.health
    }

    pub fn max_health(&self) -> Word {
        self.max_health
    }

    pub fn strength(&self) -> Word {
        self.strength
    }

    pub fn last_intent(&self) -> Intent {
        self.last_intent
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub(crate) fn set_last_intent(&mut self, intent: Intent) {
        self.last_intent = intent;
    }

    /// Subtracts `amount` from health, stopping at zero.
    pub(crate) fn take_damage(&mut self, amount: Word) {
        self.health = self.health.saturating_sub(amount.max(0)).max(0);
    }

    pub(crate) fn gain_strength(&mut self) {
        self.strength = self.strength.saturating_add(1);
    }
}

/// One side of a match as loaded from disk: the fighter, or the error that
/// kept its program out of the match.
#[derive(Debug)]
pub struct Entrant {
    pub name: String,
    pub fighter: Result<Fighter, VMError>,
}

impl Entrant {
    /// Loads the program at `path`. A failure is logged and kept, so the
    /// other side can still be loaded and reported.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            name: fighter_name(path),
            fighter: Fighter::load(path),
        }
    }

    /// Wraps the result of assembling `source` under `name`.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fighter: Fighter::from_source(name.clone(), source),
            name,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.fighter.is_err()
    }
}

/// File stem of `path`, or the whole path when it has none.
fn fighter_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berserker() -> Fighter {
        Fighter::from_source("berserker", include_str!("../../programs/berserker.asm")).unwrap()
    }

    #[test]
    fn new_fighter_is_fresh() {
        let fighter = berserker();
        assert_eq!(fighter.name(), "berserker");
        assert_eq!(fighter.health(), MAX_HEALTH);
        assert_eq!(fighter.strength(), BASE_STRENGTH);
        assert_eq!(fighter.last_intent(), Intent::Defend);
        assert!(!fighter.program().is_empty());
        assert!(fighter.source().starts_with("STORE O0, 1"));
    }

    #[test]
    fn damage_clamps_at_zero() {
        let mut fighter = berserker();
        fighter.take_damage(995);
        assert_eq!(fighter.health(), 5);
        assert!(fighter.is_alive());
        fighter.take_damage(6);
        assert_eq!(fighter.health(), 0);
        assert!(!fighter.is_alive());
        fighter.take_damage(Word::MAX);
        assert_eq!(fighter.health(), 0);
    }

    #[test]
    fn negative_damage_never_heals() {
        let mut fighter = berserker();
        fighter.take_damage(10);
        fighter.take_damage(-50);
        assert_eq!(fighter.health(), MAX_HEALTH - 10);
    }

    #[test]
    fn reset_caps_health() {
        let mut fighter = berserker();
        fighter.gain_strength();
        fighter.take_damage(300);
        fighter.reset(5000);
        assert_eq!(fighter.health(), MAX_HEALTH);
        assert_eq!(fighter.strength(), BASE_STRENGTH);
        fighter.reset(40);
        assert_eq!(fighter.health(), 40);
        assert_eq!(fighter.max_health(), 40);
    }

    #[test]
    fn compile_error_is_reported() {
        let err = Fighter::from_source("broken", "STORE R0,").unwrap_err();
        assert!(matches!(err, VMError::Syntax { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Fighter::load("programs/does-not-exist.asm").unwrap_err();
        assert!(matches!(err, VMError::IoError { .. }));
    }

    #[test]
    fn load_names_fighter_after_file() {
        let fighter = Fighter::load("programs/turtle.asm").unwrap();
        assert_eq!(fighter.name(), "turtle");
        assert_eq!(fighter.health(), MAX_HEALTH);
    }

    #[test]
    fn entrant_keeps_load_failure() {
        let entrant = Entrant::load("programs/does-not-exist.asm");
        assert_eq!(entrant.name, "does-not-exist");
        assert!(entrant.is_rejected());
        assert!(matches!(entrant.fighter, Err(VMError::IoError { .. })));

        let entrant = Entrant::from_source("broken", "INC X9");
        assert_eq!(entrant.name, "broken");
        assert!(matches!(entrant.fighter, Err(VMError::Syntax { .. })));

        let entrant = Entrant::load("programs/gambler.asm");
        assert!(!entrant.is_rejected());
        assert_eq!(entrant.fighter.unwrap().name(), "gambler");
    }

    #[test]
    fn name_from_path() {
        assert_eq!(fighter_name(Path::new("programs/turtle.asm")), "turtle");
        assert_eq!(fighter_name(Path::new("bot")), "bot");
    }
}
