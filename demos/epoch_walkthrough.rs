//! Build a dataset from synthetic blocks, calibrate it and walk one epoch of
//! every split, printing batch shapes.
//!
//! Run with `cargo run --release --example epoch_walkthrough`.

use pointbatch::{Cloud, Dataset, DatasetConfig, LabelMap, Split, SplitTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_block(name: &str, table: &SplitTable, n: usize, seed: u64) -> pointbatch::Result<Cloud> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(n);
    let mut colors = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let x = rng.gen_range(0.0f32..60.0);
        let y = rng.gen_range(0.0f32..60.0);
        let building = (x / 15.0).fract() < 0.4 && (y / 15.0).fract() < 0.4;
        let z = if building {
            rng.gen_range(0.0f32..12.0)
        } else {
            rng.gen_range(0.0f32..0.3)
        };
        points.push([x, y, z]);
        colors.push(if building { [0.6, 0.6, 0.6] } else { [0.2, 0.5, 0.2] });
        labels.push(if building { 1 } else { 0 });
    }
    let split = table.assign(name);
    Cloud::new(name, split, points, colors, split.is_labelled().then_some(labels))
}

fn main() -> pointbatch::Result<()> {
    let table = SplitTable::new(vec!["block_val".into()], vec!["block_test".into()]);
    let clouds = ["block_a", "block_b", "block_val", "block_test"]
        .iter()
        .enumerate()
        .map(|(i, name)| synthetic_block(name, &table, 60_000, i as u64))
        .collect::<pointbatch::Result<Vec<_>>>()?;

    let config = DatasetConfig {
        in_radius: 5.0,
        epoch_steps: 20,
        validation_size: 5,
        ..DatasetConfig::default()
    };
    let mut dataset = Dataset::new(clouds, LabelMap::identity(2), config)?;

    let calibration = dataset.calibrate(0)?;
    println!(
        "point budget {:.0} (estimate {:.2} regions/batch, converged: {})",
        calibration.budget.limit, calibration.budget.estimate, calibration.budget.converged
    );
    println!("neighborhood limits {:?}", calibration.neighbors.limits);

    let pipeline = dataset.pipeline()?;
    for split in Split::ALL {
        let batches: Vec<_> = dataset.epoch(split, 1)?.collect();
        let inputs = pipeline.prepare_all(&batches, 1);
        let points: usize = batches.iter().map(|b| b.len()).sum();
        println!("{split}: {} batches, {points} points", batches.len());
        if let Some(first) = inputs.first() {
            for (i, layer) in first.hierarchy.layers.iter().enumerate() {
                println!(
                    "  layer {i}: {} points, neighbors {}x{}",
                    layer.points.len(),
                    layer.neighbors.rows(),
                    layer.neighbors.width()
                );
            }
        }
    }
    Ok(())
}
