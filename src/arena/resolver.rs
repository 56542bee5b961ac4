//! Round resolution: Gamble draws, the damage matrix and health updates.

use crate::arena::fighter::Fighter;
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::vm::Intent;
use rand_core::RngCore;

/// A Gamble wins when the 1..=100 draw is strictly above this value.
pub const GAMBLE_WIN_THRESHOLD: u32 = 90;

/// One entry of the damage matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DamageRow {
    /// Resolved intents of the first and second fighter.
    pub intents: (Intent, Intent),
    /// Base damage dealt to the first and second fighter.
    pub damage: (Word, Word),
}

/// Base damage per pair of resolved intents, before strength is applied.
///
/// Gamble never appears: it is resolved to Attack or Defend first.
pub const DAMAGE_TABLE: [DamageRow; 4] = [
    DamageRow {
        intents: (Intent::Attack, Intent::Attack),
        damage: (5, 5),
    },
    DamageRow {
        intents: (Intent::Defend, Intent::Attack),
        damage: (1, 0),
    },
    DamageRow {
        intents: (Intent::Attack, Intent::Defend),
        damage: (0, 1),
    },
    DamageRow {
        intents: (Intent::Defend, Intent::Defend),
        damage: (0, 0),
    },
];

/// Looks up the base damage for a pair of resolved intents.
pub fn base_damage(a: Intent, b: Intent) -> Option<(Word, Word)> {
    DAMAGE_TABLE
        .iter()
        .find(|row| row.intents == (a, b))
        .map(|row| row.damage)
}

/// Draws an integer uniformly from `1..=100`.
///
/// Raw values from the top partial bucket of the `u32` range are rejected, so
/// every outcome has the same probability.
pub fn draw_percent<R: RngCore + ?Sized>(rng: &mut R) -> u32 {
    const ZONE: u32 = u32::MAX - u32::MAX % 100;
    loop {
        let raw = rng.next_u32();
        if raw < ZONE {
            return raw % 100 + 1;
        }
    }
}

/// What happened in one round.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundOutcome {
    /// Intents returned by the programs.
    pub chosen: [Intent; 2],
    /// Intents after Gamble resolution; never Gamble.
    pub resolved: [Intent; 2],
    /// Whether each side won its Gamble draw.
    pub gamble_won: [bool; 2],
    /// Damage actually subtracted from each side.
    pub damage: [Word; 2],
}

/// Resolves one round between two fighters.
///
/// Each Gamble is drawn in fighter order: a win turns into Attack and raises
/// that fighter's strength by one, a loss turns into Defend. The damage row
/// for the resolved pair is then scaled by the opponent's strength and
/// subtracted from each fighter's health, which stops at zero.
pub fn resolve_round<R: RngCore + ?Sized>(
    fighters: &mut [Fighter; 2],
    chosen: [Intent; 2],
    rng: &mut R,
) -> RoundOutcome {
    let mut resolved = chosen;
    let mut gamble_won = [false; 2];
    for (i, fighter) in fighters.iter_mut().enumerate() {
        if chosen[i] != Intent::Gamble {
            continue;
        }
        if draw_percent(rng) > GAMBLE_WIN_THRESHOLD {
            resolved[i] = Intent::Attack;
            gamble_won[i] = true;
            fighter.gain_strength();
        } else {
            resolved[i] = Intent::Defend;
        }
    }

    let (base_a, base_b) = base_damage(resolved[0], resolved[1]).unwrap_or((0, 0));
    let damage = [
        base_a.saturating_mul(fighters[1].strength()),
        base_b.saturating_mul(fighters[0].strength()),
    ];
    for (fighter, amount) in fighters.iter_mut().zip(damage) {
        fighter.take_damage(amount);
    }

    RoundOutcome {
        chosen,
        resolved,
        gamble_won,
        damage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::fighter::MAX_HEALTH;
    use rand_core::impls;

    /// Replays a fixed list of raw values, cycling when exhausted.
    struct ScriptedRng {
        values: Vec<u32>,
        next: usize,
    }

    impl ScriptedRng {
        fn new(values: &[u32]) -> Self {
            Self {
                values: values.to_vec(),
                next: 0,
            }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let value = self.values[self.next % self.values.len()];
            self.next += 1;
            value
        }

        fn next_u64(&mut self) -> u64 {
            impls::next_u64_via_u32(self)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            impls::fill_bytes_via_next(self, dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    /// xorshift64*, enough for statistical checks.
    struct XorShift(u64);

    impl RngCore for XorShift {
        fn next_u32(&mut self) -> u32 {
            (self.next_u64() >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0 ^= self.0 >> 12;
            self.0 ^= self.0 << 25;
            self.0 ^= self.0 >> 27;
            self.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            impls::fill_bytes_via_next(self, dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    // Raw values mapping to a draw of 96 (win) and 1 (loss).
    const WIN: u32 = 95;
    const LOSS: u32 = 0;

    fn pair() -> [Fighter; 2] {
        [
            Fighter::from_source("a", "RET").unwrap(),
            Fighter::from_source("b", "RET").unwrap(),
        ]
    }

    fn health(fighters: &[Fighter; 2]) -> [Word; 2] {
        [fighters[0].health(), fighters[1].health()]
    }

    #[test]
    fn damage_matrix_rows() {
        let cases = [
            ([Intent::Attack, Intent::Attack], [5, 5]),
            ([Intent::Defend, Intent::Attack], [1, 0]),
            ([Intent::Attack, Intent::Defend], [0, 1]),
            ([Intent::Defend, Intent::Defend], [0, 0]),
        ];
        for (intents, damage) in cases {
            let mut fighters = pair();
            let outcome = resolve_round(&mut fighters, intents, &mut ScriptedRng::new(&[LOSS]));
            assert_eq!(outcome.damage, damage, "{intents:?}");
            assert_eq!(outcome.resolved, intents);
            assert_eq!(
                health(&fighters),
                [MAX_HEALTH - damage[0], MAX_HEALTH - damage[1]]
            );
        }
    }

    #[test]
    fn gamble_never_in_table() {
        assert_eq!(base_damage(Intent::Gamble, Intent::Attack), None);
        assert_eq!(base_damage(Intent::Defend, Intent::Gamble), None);
        assert_eq!(base_damage(Intent::Attack, Intent::Attack), Some((5, 5)));
    }

    #[test]
    fn damage_scales_with_opponent_strength() {
        let mut fighters = pair();
        fighters[0].gain_strength();
        fighters[0].gain_strength();
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Attack, Intent::Attack],
            &mut ScriptedRng::new(&[LOSS]),
        );
        // A has strength 3, B has strength 1.
        assert_eq!(outcome.damage, [5, 15]);
        assert_eq!(health(&fighters), [MAX_HEALTH - 5, MAX_HEALTH - 15]);
    }

    #[test]
    fn winning_gamble_attacks_with_new_strength() {
        let mut fighters = pair();
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Gamble, Intent::Attack],
            &mut ScriptedRng::new(&[WIN]),
        );
        assert_eq!(outcome.resolved, [Intent::Attack, Intent::Attack]);
        assert_eq!(outcome.gamble_won, [true, false]);
        assert_eq!(fighters[0].strength(), 2);
        assert_eq!(fighters[1].strength(), 1);
        assert_eq!(outcome.damage, [5, 10]);
    }

    #[test]
    fn losing_gamble_defends() {
        let mut fighters = pair();
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Attack, Intent::Gamble],
            &mut ScriptedRng::new(&[LOSS]),
        );
        assert_eq!(outcome.chosen, [Intent::Attack, Intent::Gamble]);
        assert_eq!(outcome.resolved, [Intent::Attack, Intent::Defend]);
        assert_eq!(outcome.gamble_won, [false, false]);
        assert_eq!(fighters[1].strength(), 1);
        assert_eq!(outcome.damage, [0, 1]);
    }

    #[test]
    fn gambles_draw_in_fighter_order() {
        let mut fighters = pair();
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Gamble, Intent::Gamble],
            &mut ScriptedRng::new(&[LOSS, WIN]),
        );
        assert_eq!(outcome.resolved, [Intent::Defend, Intent::Attack]);
        assert_eq!(fighters[1].strength(), 2);
        // Defend/Attack row, B's strength scales A's damage only.
        assert_eq!(outcome.damage, [2, 0]);
    }

    #[test]
    fn threshold_boundary() {
        // Raw 89 draws 90, which does not win; raw 90 draws 91, which does.
        assert_eq!(draw_percent(&mut ScriptedRng::new(&[89])), 90);
        assert_eq!(draw_percent(&mut ScriptedRng::new(&[90])), 91);
        let mut fighters = pair();
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Gamble, Intent::Defend],
            &mut ScriptedRng::new(&[89]),
        );
        assert_eq!(outcome.resolved[0], Intent::Defend);
    }

    #[test]
    fn health_clamps_at_zero() {
        let mut fighters = pair();
        fighters[0].reset(3);
        let outcome = resolve_round(
            &mut fighters,
            [Intent::Attack, Intent::Attack],
            &mut ScriptedRng::new(&[LOSS]),
        );
        assert_eq!(outcome.damage, [5, 5]);
        assert_eq!(fighters[0].health(), 0);
        assert_eq!(fighters[1].health(), MAX_HEALTH - 5);
    }

    #[test]
    fn draw_rejects_biased_zone() {
        let mut rng = ScriptedRng::new(&[u32::MAX, u32::MAX - 50, 41]);
        assert_eq!(draw_percent(&mut rng), 42);
        assert_eq!(rng.next, 3);
    }

    #[test]
    fn draw_stays_in_range() {
        let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
        for _ in 0..10_000 {
            let draw = draw_percent(&mut rng);
            assert!((1..=100).contains(&draw));
        }
    }

    #[test]
    fn gamble_win_rate_converges_to_ten_percent() {
        let mut rng = XorShift(0x243f_6a88_85a3_08d3);
        let trials = 100_000;
        let wins = (0..trials)
            .filter(|_| draw_percent(&mut rng) > GAMBLE_WIN_THRESHOLD)
            .count();
        let rate = wins as f64 / trials as f64;
        assert!((0.09..0.11).contains(&rate), "win rate {rate}");
    }

    #[test]
    fn strength_never_decreases() {
        let mut fighters = pair();
        let mut rng = XorShift(7);
        let mut last = [1, 1];
        for _ in 0..1_000 {
            resolve_round(&mut fighters, [Intent::Gamble, Intent::Gamble], &mut rng);
            let now = [fighters[0].strength(), fighters[1].strength()];
            assert!(now[0] >= last[0] && now[1] >= last[1]);
            assert!(fighters.iter().all(|f| f.health() >= 0));
            last = now;
        }
    }
}
