//! Runs a match between two fighter programs.
//!
//! # Usage
//! ```text
//! fightvm <first.asm> <second.asm> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `first.asm`, `second.asm`: Assembly sources of the two fighters
//!
//! # Options
//! - `--step-limit <n>`: Instructions allowed per program run
//! - `--max-rounds <n>`: Rounds played before the match is a draw
//! - `--max-health <n>`: Starting health of both fighters (at most 1000)
//! - `--isolated-flags`: Lower the comparison flags before every run
//! - `-v, --verbose` / `-q, --quiet`: Log debug output / only errors
//!
//! `FIGHTVM_STEP_LIMIT`, `FIGHTVM_MAX_ROUNDS` and `FIGHTVM_LOG` are read first;
//! command-line options take precedence.
//!
//! Both programs are always loaded and every diagnostic is logged. A rejected
//! program forfeits; the summary is printed like any other match result.

use fightvm::arena::config::{ConfigError, MatchConfig, parse_count};
use fightvm::arena::duel::Duel;
use fightvm::arena::fighter::Entrant;
use fightvm::utils::log::{self, Level};
use fightvm::virtual_machine::isa::Word;
use fightvm::{error, info};
use rand_core::OsRng;
use std::env;
use std::process;

fn main() {
    if let Err(e) = log::init_from_env() {
        error!("{}: {e}", log::LOG_ENV);
        process::exit(1);
    }

    let args: Vec<String> = env::args().collect();

    let wants_help = args.get(1).is_some_and(|a| a == "--help" || a == "-h");
    if args.len() < 3 || wants_help {
        print_usage(&args[0]);
        process::exit(if wants_help { 0 } else { 1 });
    }

    let mut config = MatchConfig::from_env().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1)
    });

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--step-limit" | "--max-rounds" | "--max-health") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                if let Err(e) = apply_option(&mut config, k, &args[i]) {
                    error!("{e}");
                    process::exit(1);
                }
                i += 1;
            }
            "--isolated-flags" => {
                config.share_flags = false;
                i += 1;
            }
            "--verbose" | "-v" => {
                log::set_min_level(Level::Debug);
                i += 1;
            }
            "--quiet" | "-q" => {
                log::set_min_level(Level::Error);
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        process::exit(1);
    }

    let entrants = [Entrant::load(&args[1]), Entrant::load(&args[2])];

    let report = match Duel::from_entrants(entrants, config) {
        Ok(mut duel) => {
            let [first, second] = duel.fighters();
            let config = duel.config();
            info!(
                "{} vs {} ({} hp, step limit {}, up to {} rounds)",
                first.name(),
                second.name(),
                config.max_health,
                config.step_limit,
                config.max_rounds
            );
            duel.run(&mut OsRng)
        }
        Err(forfeit) => forfeit,
    };

    println!("{report}");
    for i in 0..2 {
        println!(
            "  {}: {} hp, strength {}",
            report.names[i], report.health[i], report.strength[i]
        );
    }
}

/// Applies one numeric command-line option to `config`.
fn apply_option(config: &mut MatchConfig, option: &str, value: &str) -> Result<(), ConfigError> {
    let count = parse_count(option, value)?;
    match option {
        "--step-limit" => config.step_limit = count,
        "--max-rounds" => config.max_rounds = count,
        _ => {
            config.max_health = Word::try_from(count).map_err(|_| ConfigError::NotANumber {
                setting: option.to_string(),
                value: value.to_string(),
            })?
        }
    }
    Ok(())
}

const USAGE: &str = "\
Fighter program arena

USAGE:
    {program} <first.asm> <second.asm> [OPTIONS]

ARGS:
    <first.asm>     Assembly source of the first fighter
    <second.asm>    Assembly source of the second fighter

OPTIONS:
    --step-limit <n>    Instructions allowed per program run (default 100000)
    --max-rounds <n>    Rounds before the match is declared a draw (default 10000)
    --max-health <n>    Starting health of both fighters, 1 to 1000 (default 1000)
    --isolated-flags    Lower the comparison flags before every program run
    -v, --verbose       Log every program run
    -q, --quiet         Only log errors
    -h, --help          Print this help message

ENVIRONMENT:
    FIGHTVM_STEP_LIMIT, FIGHTVM_MAX_ROUNDS    Defaults for the options above
    FIGHTVM_LOG                               debug, info, warn or error

EXAMPLES:
    {program} programs/tactician.asm programs/berserker.asm
    {program} a.asm b.asm --max-rounds 500 --isolated-flags -q
";

fn usage(program: &str) -> String {
    USAGE.replace("{program}", program)
}

/// Prints usage information to stderr, whatever the log level.
fn print_usage(program: &str) {
    eprintln!("{}", usage(program));
}
