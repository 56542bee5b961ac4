//! Fighter program assembler CLI.
//!
//! Assembles one source file and prints its bytecode listing and label table.
//! Optionally runs the program once to show the intent it picks.
//!
//! # Usage
//! ```text
//! assembler <input.asm> [OPTIONS]
//! ```
//!
//! # Options
//! - `-r, --run`: Execute the program once after assembling it
//! - `--health <own> <enemy>`: Health values seeded into C0 and E0 (default 1000 1000)
//! - `--step-limit <n>`: Instructions allowed for the run
//!
//! # Examples
//! ```text
//! assembler programs/tactician.asm
//! assembler programs/tactician.asm --run --health 300 800
//! ```

use fightvm::arena::config::parse_count;
use fightvm::arena::fighter::MAX_HEALTH;
use fightvm::virtual_machine::assembler::assemble_file;
use fightvm::virtual_machine::isa::Word;
use fightvm::virtual_machine::program::Program;
use fightvm::virtual_machine::vm::{DEFAULT_STEP_LIMIT, VM};
use fightvm::{error, info};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut run = false;
    let mut health = (MAX_HEALTH, MAX_HEALTH);
    let mut step_limit = DEFAULT_STEP_LIMIT;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--run" | "-r" => {
                run = true;
                i += 1;
            }
            "--health" => {
                if i + 2 >= args.len() {
                    error!("--health requires two arguments");
                    process::exit(1);
                }
                health = (parse_health(&args[i + 1]), parse_health(&args[i + 2]));
                i += 3;
            }
            k @ "--step-limit" => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                step_limit = parse_count(k, &args[i]).unwrap_or_else(|e| {
                    error!("{e}");
                    process::exit(1)
                });
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    // Compile errors are rendered by assemble_file itself.
    let program = assemble_file(input_path).unwrap_or_else(|_| process::exit(1));

    info!(
        "Assembled {} ({} words, {} labels)",
        input_path,
        program.len(),
        program.labels.iter().count()
    );
    print_listing(&program);

    if run {
        let mut vm = VM::new(step_limit);
        match vm.run(&program, health.0, health.1) {
            Ok(intent) => {
                println!();
                println!("Intent: {} ({})", intent, intent.word());
                println!("Steps:  {}", vm.steps_used());
                println!("Flags:  {}", vm.flags());
                println!("Registers:");
                for (reg, value) in vm.registers().iter() {
                    println!("  {:<2} = {}", reg.name(), value);
                }
            }
            Err(e) => {
                error!("{e}");
                process::exit(1);
            }
        }
    }
}

fn parse_health(value: &str) -> Word {
    match value.parse::<Word>() {
        Ok(health) if (0..=MAX_HEALTH).contains(&health) => health,
        _ => {
            error!("Invalid health: '{value}' (expected 0 to {MAX_HEALTH})");
            process::exit(1)
        }
    }
}

fn print_listing(program: &Program) {
    println!("Bytecode:");
    print!("{}", program.disassemble());
    if program.labels.iter().next().is_some() {
        println!("Labels:");
        for (id, index) in program.labels.iter() {
            println!("  {id} -> {index:04} (resumes at {:04})", index + 1);
        }
    }
}

const USAGE: &str = "\
Fighter Program Assembler

USAGE:
    {program} <input.asm> [OPTIONS]

ARGS:
    <input.asm>    Assembly source file to compile

OPTIONS:
    -r, --run                 Execute the program once and print its intent
    --health <own> <enemy>    Health seeded into C0 and E0 (default 1000 1000)
    --step-limit <n>          Instructions allowed for the run (default 100000)
    -h, --help                Print this help message

EXAMPLES:
    # Print the bytecode listing
    {program} programs/tactician.asm

    # Listing plus one run while behind on health
    {program} programs/tactician.asm --run --health 300 800
";

fn usage(program: &str) -> String {
    USAGE.replace("{program}", program)
}

/// Prints usage information to stderr, whatever the log level.
fn print_usage(program: &str) {
    eprintln!("{}", usage(program));
}
