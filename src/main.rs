//! Dispersion GRASP - Command Line Interface
//!
//! Bi-objective (MaxSum / MaxMin) dispersion solver under cost and capacity constraints.

use anyhow::{ensure, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use dispersion_grasp::config::GraspConfig;
use dispersion_grasp::heuristics::{Grasp, GraspResult};
use dispersion_grasp::instance::Instance;
use dispersion_grasp::results::ResultCollector;
use dispersion_grasp::solution::Solution;
use indicatif::{ProgressBar, ProgressStyle};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dispersion-grasp")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Biased-randomized GRASP for the bi-objective dispersion problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance, or every instance of a directory
    Solve {
        /// Instance file (JSON) or directory of instance files
        #[arg(short, long)]
        instance: PathBuf,

        /// Configuration file (JSON); defaults are used when absent
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of GRASP iterations
        #[arg(long)]
        iterations: Option<usize>,

        /// Override the number of repeated runs
        #[arg(long)]
        experiments: Option<u32>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Run the iterations on every core
        #[arg(short, long)]
        parallel: bool,

        /// Root directory of the result files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Execution number of the first run; later experiments count up from it
        #[arg(short, long, default_value = "1")]
        execution: u32,

        /// Print every non-dominated solution
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rebuild a solution from its node ids and report its objectives
    Evaluate {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Selected node ids, e.g. "3 - 7 - 12" or "3,7,12"
        #[arg(short, long)]
        nodes: String,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve {
            instance,
            config,
            iterations,
            experiments,
            seed,
            parallel,
            output,
            execution,
            verbose,
        } => load_config(config.as_deref(), iterations, experiments, seed)
            .and_then(|config| solve_path(&instance, &config, &output, execution, parallel, verbose)),

        Commands::Evaluate { instance, nodes } => evaluate_solution(&instance, &nodes),

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<&Path>,
    iterations: Option<usize>,
    experiments: Option<u32>,
    seed: Option<u64>,
) -> Result<GraspConfig> {
    let mut config = match path {
        Some(path) => GraspConfig::from_file(path)?,
        None => GraspConfig::default(),
    };
    if let Some(iterations) = iterations {
        config = config.with_iterations(iterations);
    }
    if let Some(experiments) = experiments {
        config = config.with_experiments(experiments);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    config.validate()?;
    Ok(config)
}

/// Instance files to solve: the path itself, or the `.json` files of a directory
fn instance_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("cannot read directory {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();
    ensure!(!files.is_empty(), "no instance file found in {}", path.display());
    Ok(files)
}

/// Run every experiment of `config` on every instance of `path`.
///
/// Experiment `e` is saved under execution number `first_execution + e`.
fn solve_path(
    path: &Path,
    config: &GraspConfig,
    output: &Path,
    first_execution: u32,
    parallel: bool,
    verbose: bool,
) -> Result<()> {
    let mut instances = Vec::new();
    for file in instance_files(path)? {
        println!("Loading instance from {:?}...", file);
        instances.push(Instance::from_file(&file)?);
    }

    for experiment in 0..config.experiments {
        let execution = first_execution
            .checked_add(experiment)
            .context("execution number overflows")?;
        let grasp = Grasp::new(config.for_experiment(experiment));
        let collector = ResultCollector::new(output, config.label(), execution);
        log::info!(
            "Experiment {}/{} saved as execution {}",
            experiment + 1,
            config.experiments,
            execution
        );

        for instance in &instances {
            let started_at = Local::now();
            let result = solve_instance(&grasp, instance, parallel)?;
            print_summary(instance, &result, verbose);
            let saved = collector.save(&instance.name, &result, started_at)?;
            println!("Results written to {}", saved.display());
        }
    }
    Ok(())
}

fn solve_instance<'a>(grasp: &Grasp, instance: &'a Instance, parallel: bool) -> Result<GraspResult<'a>> {
    let iterations = grasp.config().iterations;
    if parallel {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("{} ({} iterations in parallel)", instance.name, iterations));
        spinner.enable_steady_tick(Duration::from_millis(120));
        let result = grasp.run_parallel(instance);
        spinner.finish_and_clear();
        Ok(result)
    } else {
        let progress = ProgressBar::new(iterations as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})")?.progress_chars("=> "),
        );
        progress.set_message(instance.name.clone());
        let result = grasp.run_with_progress(instance, |_| progress.inc(1));
        progress.finish_and_clear();
        Ok(result)
    }
}

fn print_summary(instance: &Instance, result: &GraspResult, verbose: bool) {
    println!("\n========== {} ==========", instance.name);
    println!("Iterations: {}", result.iterations);
    println!("Execution time: {:.2}s", result.elapsed.as_secs_f64());
    println!("Solutions: {} ({} after construction)", result.solutions.len(), result.constructed.len());
    println!("Non-dominated: {}", result.front_size());

    if verbose {
        println!("\n{:>10} {:>10} {:>8} {:>8}  Nodes", "MaxSum", "MaxMin", "Cost", "Capacity");
        println!("{}", "-".repeat(60));
        let mut front: Vec<&Solution> = result.front().collect();
        front.sort_by(|a, b| b.max_sum().total_cmp(&a.max_sum()));
        for s in front {
            println!(
                "{:>10.2} {:>10.2} {:>8.2} {:>8.2}  {}",
                s.max_sum(),
                s.objectives().max_min,
                s.total_cost(),
                s.total_capacity(),
                s.node_list()
            );
        }
    }
}

/// Parse node ids separated by `-`, `,` or whitespace
fn parse_nodes(text: &str) -> Result<Vec<usize>> {
    text.split(|c: char| c == '-' || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<usize>()
                .with_context(|| format!("invalid node id {:?}", token))
        })
        .collect()
}

fn evaluate_solution(path: &Path, nodes: &str) -> Result<()> {
    let instance = Instance::from_file(path)?;
    let nodes = parse_nodes(nodes)?;

    let mut seen = BTreeSet::new();
    for &u in &nodes {
        ensure!(u < instance.len(), "node {} is out of range (instance has {} nodes)", u, instance.len());
        ensure!(seen.insert(u), "node {} is listed twice", u);
    }

    let solution = Solution::from_nodes(&instance, &nodes);
    println!("{}", solution);
    if !solution.satisfies_cost(&[], &[]) {
        println!(
            "Cost constraint violated: {:.2} >= {:.2}",
            solution.total_cost(),
            instance.cost_limit()
        );
    }
    if !solution.satisfies_capacity(&[], &[]) {
        println!(
            "Capacity constraint violated: {:.2} <= {:.2}",
            solution.total_capacity(),
            instance.capacity_floor()
        );
    }
    Ok(())
}

fn analyze_instance(path: &Path) -> Result<()> {
    let instance = Instance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let cheapest: f64 = {
        let mut costs = instance.costs().to_vec();
        costs.sort_by(|a, b| a.total_cmp(b));
        costs.iter().take(2).sum()
    };
    println!("Cheapest pair cost: {:.2} (ceiling {:.2})", cheapest, instance.cost_limit());
    if cheapest >= instance.cost_limit() {
        println!("No pair of nodes fits under the cost ceiling");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispersion_grasp::results::read_summaries;

    #[test]
    fn test_parse_nodes() {
        assert_eq!(parse_nodes("3 - 7 - 12").unwrap(), vec![3, 7, 12]);
        assert_eq!(parse_nodes("3,7,12").unwrap(), vec![3, 7, 12]);
        assert!(parse_nodes("3 - x").is_err());
    }

    #[test]
    fn test_experiments_get_consecutive_execution_numbers() {
        let dir = std::env::temp_dir().join(format!("dispersion-grasp-cli-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let instance_path = dir.join("square.json");
        std::fs::write(
            &instance_path,
            r#"{"n": 4, "d": [[0, 1, 2, 3], [1, 0, 4, 5], [2, 4, 0, 6], [3, 5, 6, 0]],
               "a": [1, 1, 1, 1], "c": [1, 1, 1, 1], "K": 3, "B": 1}"#,
        )
        .unwrap();
        let output = dir.join("output");
        let config = GraspConfig::default().with_iterations(4).with_experiments(3);

        solve_path(&instance_path, &config, &output, 5, false, false).unwrap();

        let instance_dir = output.join(format!("B-GRASP_{}", config.label())).join("square");
        for execution in 5..=7 {
            assert!(instance_dir.join(format!("results_{}.csv", execution)).is_file());
        }
        let summaries = read_summaries(&instance_dir.join("add_data.csv")).unwrap();
        let numbers: Vec<u32> = summaries.iter().map(|s| s.ex_number).collect();
        assert_eq!(numbers, vec![5, 6, 7]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
