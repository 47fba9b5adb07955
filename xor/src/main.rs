use neatkit::genomics::Genome;
use neatkit::logging::Stats;
use neatkit::networks::{NeuralNet, UpdateType};
use neatkit::{GenAlg, Params};

use std::error::Error;
use std::{env, fs};

use rayon::prelude::*;

const ERROR_MARGIN: f64 = 0.3;
const MAX_GENERATIONS: usize = 100;
const ITERATIONS: u64 = 200;

const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn evaluate_xor(network: &mut NeuralNet) -> f64 {
    let error: f64 = CASES
        .iter()
        .map(|(input, expected)| match network.update(input, UpdateType::Snapshot) {
            Ok(output) => (output[0] - expected).abs(),
            Err(_) => 1.0,
        })
        .map(|e| if e < ERROR_MARGIN { 0.0 } else { e })
        .sum();
    (4.0 - error).powi(2)
}

fn solved(fitness: f64) -> bool {
    (fitness - 16.0).abs() < f64::EPSILON
}

/// Runs a population until some genome solves XOR,
/// returning it along with the generation it was found in.
fn evolve(params: &Params, seed: u64) -> Result<Option<(usize, Genome)>, Box<dyn Error>> {
    let mut ga = GenAlg::from_seed(2, 1, params.clone(), seed)?;
    let mut networks = ga.create_neural_networks();
    for _ in 0..MAX_GENERATIONS {
        let scores: Vec<f64> = networks.iter_mut().map(evaluate_xor).collect();
        if let Some(winner) = scores.iter().position(|s| solved(*s)) {
            return Ok(Some((ga.generation(), ga.genomes()[winner].clone())));
        }
        networks = ga.epoch(&scores)?;
    }
    Ok(None)
}

fn main() -> Result<(), Box<dyn Error>> {
    let params = match env::args().nth(1) {
        Some(path) => ron::from_str(&fs::read_to_string(path)?)?,
        None => Params::default(),
    };
    params.validate()?;

    stress_test(&params);
    serde_test(&params)
}

fn stress_test(params: &Params) {
    let generations: Vec<Option<usize>> = (0..ITERATIONS)
        .into_par_iter()
        .map(|seed| match evolve(params, seed) {
            Ok(run) => run.map(|(generation, _)| generation),
            Err(e) => {
                eprintln!("run {} aborted: {}", seed, e);
                None
            }
        })
        .collect();

    println!(
        "Successful run generation count {:?}, {}% failure rate over {} iterations",
        Stats::from(generations.iter().flatten().map(|g| *g as f64)),
        generations.iter().filter(|g| g.is_none()).count() as f64 * 100.0 / ITERATIONS as f64,
        ITERATIONS
    );
}

fn serde_test(params: &Params) -> Result<(), Box<dyn Error>> {
    let champion = match (0..ITERATIONS).find_map(|seed| evolve(params, seed).ok().flatten()) {
        Some((_, champion)) => champion,
        None => {
            eprintln!("no run solved XOR");
            return Ok(());
        }
    };
    let serialized = ron::to_string(&champion)?;
    println!("{}", serialized);

    let restored: Genome = ron::from_str(&serialized)?;
    let fitness = evaluate_xor(&mut NeuralNet::new(&restored));
    println!("restored champion fitness: {}", fitness);
    println!("{}", restored);
    Ok(())
}
