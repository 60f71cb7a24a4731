//! Command-line front end for the evolutionary sorter.
//!
//! # Usage
//! ```text
//! evosort <COMMAND> [OPTIONS]
//! ```
//!
//! # Commands
//! - `generate`: create a fresh population (slot 0 is the no-op baseline)
//! - `test`: report mean scores over repeated random arrays
//! - `evolve`: run evolutionary rounds and write the population back
//! - `print`: pretty-print one program
//!
//! All state lives in the population file; there is no other configuration
//! source. Any precondition failure (missing flag, unreadable or corrupt
//! file, bad index) prints a message and exits nonzero.

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use evosort::evolve::engine::{Engine, EvolveConfig};
use evosort::evolve::fitness::ScoreRule;
use evosort::evolve::population::Vocabulary;
use evosort::store;
use evosort::utils::log::{set_min_level, Level};
use evosort::{error, info};

const USAGE: &str = "\
Evolutionary sorter

USAGE:
    {program} <COMMAND> [OPTIONS]

COMMANDS:
    generate    Create a population of random programs (slot 0 is a no-op)
    test        Report mean scores over repeated random test arrays
    evolve      Run evolutionary rounds, report before/after, write back
    print       Pretty-print one program

OPTIONS:
    --file <path>            Population file (required)
    --count <n>              generate: population size           [default: 100]
    --length <n>             generate: instructions per program  [default: 30]
    --rounds <n>             evolve: rounds to run               [default: 100]
    --samples <n>            test/evolve: arrays per measurement [default: 100]
    --index <i>              test/print: restrict to one program
    --array-len <n>          Test array length                   [default: 10]
    --mem-len <n>            Machine memory cells                [default: 16]
    --steps <n>              Interpreter step budget             [default: 1000]
    --values <n>             Array values drawn from 0..n        [default: 10]
    --learning-rate <f>      Population fraction replaced        [default: 0.2]
    --mutation-rate <f>      Instruction slots re-rolled         [default: 0.1]
    --preserving             Score with the value-preserving rule
    --fixed-array            Reuse one test array for the whole run
    --full-isa               Generate/mutate over the entire instruction set
    --quiet                  Only log warnings and errors
    -h, --help               Print this help message

EXAMPLES:
    # Seed a population and evolve it
    {program} generate --file pop.evo --count 200
    {program} evolve --file pop.evo --rounds 2000

    # Inspect the champion
    {program} test --file pop.evo --index 0
    {program} print --file pop.evo --index 0
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}

/// Parsed command-line options; one struct shared by every command.
struct Options {
    file: Option<PathBuf>,
    count: usize,
    length: usize,
    rounds: usize,
    samples: usize,
    index: Option<usize>,
    array_len: usize,
    mem_len: usize,
    steps: u64,
    values: i64,
    learning_rate: f64,
    mutation_rate: f64,
    preserving: bool,
    fixed_array: bool,
    full_isa: bool,
    quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        let cfg = EvolveConfig::default();
        Self {
            file: None,
            count: cfg.population_size,
            length: cfg.program_len,
            rounds: 100,
            samples: 100,
            index: None,
            array_len: cfg.array_len,
            mem_len: cfg.mem_len,
            steps: cfg.step_budget,
            values: cfg.value_range,
            learning_rate: cfg.learning_rate,
            mutation_rate: cfg.mutation_rate,
            preserving: false,
            fixed_array: false,
            full_isa: false,
            quiet: false,
        }
    }
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut opts = Options::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--file" => opts.file = Some(PathBuf::from(value_of(args, &mut i)?)),
                "--count" => opts.count = parsed(args, &mut i)?,
                "--length" => opts.length = parsed(args, &mut i)?,
                "--rounds" => opts.rounds = parsed(args, &mut i)?,
                "--samples" => opts.samples = parsed(args, &mut i)?,
                "--index" => opts.index = Some(parsed(args, &mut i)?),
                "--array-len" => opts.array_len = parsed(args, &mut i)?,
                "--mem-len" => opts.mem_len = parsed(args, &mut i)?,
                "--steps" => opts.steps = parsed(args, &mut i)?,
                "--values" => opts.values = parsed(args, &mut i)?,
                "--learning-rate" => opts.learning_rate = parsed(args, &mut i)?,
                "--mutation-rate" => opts.mutation_rate = parsed(args, &mut i)?,
                "--preserving" => opts.preserving = true,
                "--fixed-array" => opts.fixed_array = true,
                "--full-isa" => opts.full_isa = true,
                "--quiet" => opts.quiet = true,
                other => return Err(format!("unexpected argument: {other}")),
            }
            i += 1;
        }
        Ok(opts)
    }

    fn file(&self) -> Result<&PathBuf, String> {
        self.file.as_ref().ok_or_else(|| "--file is required".into())
    }

    fn config(&self, population_size: usize) -> EvolveConfig {
        EvolveConfig {
            population_size,
            program_len: self.length,
            array_len: self.array_len,
            mem_len: self.mem_len,
            value_range: self.values,
            step_budget: self.steps,
            learning_rate: self.learning_rate,
            mutation_rate: self.mutation_rate,
            rule: if self.preserving {
                ScoreRule::Preserving
            } else {
                ScoreRule::Inversions
            },
            randomize_each_round: !self.fixed_array,
            vocabulary: if self.full_isa {
                Vocabulary::full()
            } else {
                Vocabulary::default()
            },
        }
    }
}

/// Returns the value following a flag, advancing the cursor past it.
fn value_of<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

/// Parses the value following a flag.
fn parsed<T: FromStr>(args: &[String], i: &mut usize) -> Result<T, String> {
    let flag = args[*i].clone();
    let value = value_of(args, i)?;
    value
        .parse()
        .map_err(|_| format!("invalid value for {flag}: {value}"))
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let opts = match Options::parse(&args[2..]) {
        Ok(opts) => opts,
        Err(message) => {
            eprintln!("{message}\n");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if opts.quiet {
        set_min_level(Level::Warn);
    }

    let result = match args[1].as_str() {
        "generate" => cmd_generate(&opts),
        "test" => cmd_test(&opts).await,
        "evolve" => cmd_evolve(&opts).await,
        "print" => cmd_print(&opts),
        other => {
            eprintln!("unknown command: {other}\n");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(message) = result {
        error!("{message}");
        process::exit(1);
    }
}

fn cmd_generate(opts: &Options) -> Result<(), String> {
    let path = opts.file()?;
    if opts.count == 0 {
        return Err("--count must be at least 1".into());
    }
    let mut engine = Engine::new(opts.config(opts.count)).map_err(|e| e.to_string())?;
    let population = engine.seed_population();
    store::save(path, &population).map_err(|e| e.to_string())?;
    info!(
        "wrote {} programs of {} instructions to {}",
        population.len(),
        opts.length,
        path.display()
    );
    Ok(())
}

async fn cmd_test(opts: &Options) -> Result<(), String> {
    let path = opts.file()?;
    let population = store::load(path).map_err(|e| e.to_string())?;
    if population.is_empty() {
        return Err(format!("{} holds no programs", path.display()));
    }
    let mut engine = Engine::new(opts.config(population.len())).map_err(|e| e.to_string())?;

    match opts.index {
        Some(index) => {
            let program = population
                .get(index)
                .ok_or_else(|| format!("no program at index {index}"))?;
            let means = engine
                .measure(std::slice::from_ref(program), opts.samples)
                .await
                .map_err(|e| e.to_string())?;
            println!("program {index}: mean score {:.3}", means[0]);
        }
        None => {
            let summary = engine
                .summary(&population, opts.samples)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{} programs: best {:.3}, mean {:.3}",
                population.len(),
                summary.best,
                summary.mean
            );
        }
    }
    Ok(())
}

async fn cmd_evolve(opts: &Options) -> Result<(), String> {
    let path = opts.file()?;
    let mut population = store::load(path).map_err(|e| e.to_string())?;
    if population.is_empty() {
        return Err(format!("{} holds no programs", path.display()));
    }
    let mut engine = Engine::new(opts.config(population.len())).map_err(|e| e.to_string())?;

    let before = engine
        .summary(&population, opts.samples)
        .await
        .map_err(|e| e.to_string())?;
    info!("before: best {:.3}, mean {:.3}", before.best, before.mean);

    for round in 0..opts.rounds {
        engine
            .round(&mut population)
            .await
            .map_err(|e| e.to_string())?;
        if !opts.quiet {
            eprint!("\rRound: {}", round + 1);
            let _ = std::io::stderr().flush();
        }
    }
    if !opts.quiet && opts.rounds > 0 {
        eprintln!();
    }

    let after = engine
        .summary(&population, opts.samples)
        .await
        .map_err(|e| e.to_string())?;
    info!("after:  best {:.3}, mean {:.3}", after.best, after.mean);

    store::save(path, &population).map_err(|e| e.to_string())?;
    info!("wrote {} programs back to {}", population.len(), path.display());
    Ok(())
}

fn cmd_print(opts: &Options) -> Result<(), String> {
    let path = opts.file()?;
    let index = opts.index.ok_or("--index is required for print")?;
    let population = store::load(path).map_err(|e| e.to_string())?;
    let program = population
        .get(index)
        .ok_or_else(|| format!("no program at index {index}"))?;
    print!("{program}");
    Ok(())
}
