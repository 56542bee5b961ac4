//! Match loop driving two fighters round by round.
//!
//! Every round captures both health values, runs the first program and then
//! the second on a single shared [`VM`], resolves the pair of intents and logs
//! what happened. The match stops once a fighter is at zero health or the
//! round cap is reached.
//!
//! A side whose program failed to load or assemble never enters the ring: the
//! match is settled by forfeit before any round is played.

use crate::arena::config::MatchConfig;
use crate::arena::fighter::{BASE_STRENGTH, Entrant, Fighter};
use crate::arena::resolver::{RoundOutcome, resolve_round};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::vm::{Clock, Intent, SystemClock, VM};
use crate::{debug, error, info, warn};
use rand_core::RngCore;
use std::fmt;

/// Everything observable about one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: u64,
    pub outcome: RoundOutcome,
    /// Run failures, each treated as Defend for that round.
    pub faults: [Option<VMError>; 2],
    /// Health after the round.
    pub health: [Word; 2],
    /// Strength after the round.
    pub strength: [Word; 2],
}

/// How a match ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Only the fighter at this index is still standing.
    Knockout { winner: usize },
    /// Both fighters reached zero in the same round.
    DoubleKnockout,
    /// The round cap was reached with both fighters standing.
    RoundLimit,
    /// The other side's program was rejected before the match.
    Forfeit { winner: usize },
    /// Neither program could be loaded and assembled.
    DoubleForfeit,
}

/// Final state of a match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchReport {
    pub rounds: u64,
    pub verdict: Verdict,
    pub names: [String; 2],
    pub health: [Word; 2],
    pub strength: [Word; 2],
}

impl MatchReport {
    /// Name of the winner, if the match had one.
    pub fn winner(&self) -> Option<&str> {
        match self.verdict {
            Verdict::Knockout { winner } | Verdict::Forfeit { winner } => {
                Some(&self.names[winner])
            }
            Verdict::DoubleKnockout | Verdict::RoundLimit | Verdict::DoubleForfeit => None,
        }
    }

    /// Report for a match settled before its first round. Rejected sides are
    /// listed at zero health.
    fn forfeit(names: [String; 2], rejected: [bool; 2], max_health: Word) -> Self {
        let verdict = match rejected {
            [true, true] => Verdict::DoubleForfeit,
            [true, false] => Verdict::Forfeit { winner: 1 },
            _ => Verdict::Forfeit { winner: 0 },
        };
        MatchReport {
            rounds: 0,
            verdict,
            names,
            health: rejected.map(|r| if r { 0 } else { max_health }),
            strength: [BASE_STRENGTH; 2],
        }
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            Verdict::Knockout { winner } => write!(
                f,
                "{} wins after {} rounds with {} hp left.",
                self.names[winner], self.rounds, self.health[winner]
            ),
            Verdict::DoubleKnockout => write!(
                f,
                "{} and {} knocked each other out after {} rounds.",
                self.names[0], self.names[1], self.rounds
            ),
            Verdict::RoundLimit => write!(
                f,
                "Draw after {} rounds: {} has {} hp, {} has {} hp.",
                self.rounds, self.names[0], self.health[0], self.names[1], self.health[1]
            ),
            Verdict::Forfeit { winner } => write!(
                f,
                "{} wins by forfeit: the program of {} was rejected.",
                self.names[winner],
                self.names[1 - winner]
            ),
            Verdict::DoubleForfeit => write!(
                f,
                "No contest: the programs of {} and {} were both rejected.",
                self.names[0], self.names[1]
            ),
        }
    }
}

/// A match between two fighters.
pub struct Duel<C: Clock = SystemClock> {
    fighters: [Fighter; 2],
    vm: VM<C>,
    config: MatchConfig,
    round: u64,
}

impl Duel<SystemClock> {
    /// Starts a match on the wall clock. Both fighters are reset to the
    /// configured health and base strength.
    pub fn new(fighters: [Fighter; 2], config: MatchConfig) -> Self {
        Self::with_clock(fighters, config, SystemClock::new())
    }

    /// Starts a match between two loaded entrants on the wall clock, or
    /// returns the forfeit report if either program was rejected.
    pub fn from_entrants(entrants: [Entrant; 2], config: MatchConfig) -> Result<Self, MatchReport> {
        Self::entrants_with_clock(entrants, config, SystemClock::new())
    }
}

impl<C: Clock> Duel<C> {
    /// Starts a match whose VM reads T0 from `clock`.
    pub fn with_clock(mut fighters: [Fighter; 2], config: MatchConfig, clock: C) -> Self {
        for fighter in fighters.iter_mut() {
            fighter.reset(config.max_health);
        }
        Self {
            fighters,
            vm: VM::with_clock(clock, config.step_limit),
            config,
            round: 0,
        }
    }

    /// Like [`Duel::from_entrants`], with the VM reading T0 from `clock`.
    pub fn entrants_with_clock(
        entrants: [Entrant; 2],
        config: MatchConfig,
        clock: C,
    ) -> Result<Self, MatchReport> {
        match entrants {
            [
                Entrant { fighter: Ok(first), .. },
                Entrant { fighter: Ok(second), .. },
            ] => Ok(Self::with_clock([first, second], config, clock)),
            [first, second] => {
                for entrant in [&first, &second] {
                    if let Err(err) = &entrant.fighter {
                        error!("{} forfeits: {err}", entrant.name);
                    }
                }
                let rejected = [first.is_rejected(), second.is_rejected()];
                let report =
                    MatchReport::forfeit([first.name, second.name], rejected, config.max_health);
                info!("{report}");
                Err(report)
            }
        }
    }

    pub fn fighters(&self) -> &[Fighter; 2] {
        &self.fighters
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Rounds played so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// True once a fighter is down or the round cap is reached.
    pub fn is_over(&self) -> bool {
        self.fighters.iter().any(|f| !f.is_alive()) || self.round >= self.config.max_rounds
    }

    /// Runs one fighter's program against the health values captured at the
    /// start of the round.
    fn choose(&mut self, side: usize, health: [Word; 2]) -> (Intent, Option<VMError>) {
        if !self.config.share_flags {
            self.vm.reset_flags();
        }
        let fighter = &self.fighters[side];
        let (intent, fault) = match self.vm.run(fighter.program(), health[side], health[1 - side]) {
            Ok(intent) => (intent, None),
            Err(err) => {
                warn!("{}: {err}; defending this round", fighter.name());
                (Intent::Defend, Some(err))
            }
        };
        debug!(
            "{} ran {} instructions, flags {}",
            fighter.name(),
            self.vm.steps_used(),
            self.vm.flags()
        );
        info!("{} has chosen to {}.", fighter.name(), intent);
        self.fighters[side].set_last_intent(intent);
        (intent, fault)
    }

    /// Plays a single round.
    pub fn play_round<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> RoundReport {
        self.round += 1;
        let health = [self.fighters[0].health(), self.fighters[1].health()];

        let (first, first_fault) = self.choose(0, health);
        let (second, second_fault) = self.choose(1, health);

        let outcome = resolve_round(&mut self.fighters, [first, second], rng);
        for (i, fighter) in self.fighters.iter().enumerate() {
            if outcome.chosen[i] == Intent::Gamble {
                let result = if outcome.gamble_won[i] { "won" } else { "lost" };
                info!(
                    "{} {} the gamble and will {}.",
                    fighter.name(),
                    result,
                    outcome.resolved[i]
                );
            }
            info!("{} takes {} damage.", fighter.name(), outcome.damage[i]);
        }

        RoundReport {
            round: self.round,
            outcome,
            faults: [first_fault, second_fault],
            health: [self.fighters[0].health(), self.fighters[1].health()],
            strength: [self.fighters[0].strength(), self.fighters[1].strength()],
        }
    }

    /// Plays rounds until the match is over and returns the final report.
    pub fn run<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> MatchReport {
        while !self.is_over() {
            let report = self.play_round(rng);
            debug!(
                "round {}: {} hp / {} hp",
                report.round, report.health[0], report.health[1]
            );
        }
        let report = self.report();
        info!("{report}");
        report
    }

    /// Current standing of the match.
    pub fn report(&self) -> MatchReport {
        let alive = [self.fighters[0].is_alive(), self.fighters[1].is_alive()];
        let verdict = match alive {
            [true, false] => Verdict::Knockout { winner: 0 },
            [false, true] => Verdict::Knockout { winner: 1 },
            [false, false] => Verdict::DoubleKnockout,
            [true, true] => Verdict::RoundLimit,
        };
        MatchReport {
            rounds: self.round,
            verdict,
            names: [
                self.fighters[0].name().to_string(),
                self.fighters[1].name().to_string(),
            ],
            health: [self.fighters[0].health(), self.fighters[1].health()],
            strength: [self.fighters[0].strength(), self.fighters[1].strength()],
        }
    }
}
