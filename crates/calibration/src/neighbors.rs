use pointbatch_core::{DatasetConfig, Result, Split, Timed};
use pointbatch_hierarchy::{Hierarchy, InputPipeline};
use pointbatch_sampling::{BatchGenerator, IndexedCloud, RegionSampler};
use pointbatch_spatial::NeighborMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Per-layer histograms of self-neighbor counts.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborHistogram {
    bins: usize,
    counts: Vec<Vec<u64>>,
}

impl NeighborHistogram {
    pub fn new(layers: usize, bins: usize) -> Self {
        Self {
            bins,
            counts: vec![vec![0; bins]; layers],
        }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn layer(&self, layer: usize) -> &[u64] {
        &self.counts[layer]
    }

    /// Count the neighbors of every row. Counts at or above the bin range
    /// are dropped.
    pub fn add_matrix(&mut self, layer: usize, neighbors: &NeighborMatrix) {
        let hist = &mut self.counts[layer];
        for count in neighbors.neighbor_counts() {
            if count < self.bins {
                hist[count] += 1;
            }
        }
    }

    pub fn add_hierarchy(&mut self, hierarchy: &Hierarchy) {
        for (layer, l) in hierarchy.layers.iter().enumerate().take(self.counts.len()) {
            self.add_matrix(layer, &l.neighbors);
        }
    }

    pub fn totals(&self) -> Vec<u64> {
        self.counts.iter().map(|h| h.iter().sum()).collect()
    }

    pub fn min_total(&self) -> u64 {
        self.totals().into_iter().min().unwrap_or(0)
    }

    pub fn limits(&self, keep_ratio: f64) -> Vec<usize> {
        limits_from_histograms(&self.counts, keep_ratio)
    }
}

/// Number of leading buckets whose cumulative mass stays below
/// `keep_ratio` of the total: the first bucket reaching it.
pub fn limit_from_histogram(hist: &[u64], keep_ratio: f64) -> usize {
    let total: u64 = hist.iter().sum();
    let threshold = keep_ratio * total as f64;
    let mut acc = 0u64;
    hist.iter()
        .take_while(|&&c| {
            acc += c;
            (acc as f64) < threshold
        })
        .count()
}

pub fn limits_from_histograms(hists: &[Vec<u64>], keep_ratio: f64) -> Vec<usize> {
    hists
        .iter()
        .map(|h| limit_from_histogram(h, keep_ratio))
        .collect()
}

/// Result of neighbor-limit calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborCalibration {
    pub limits: Vec<usize>,
    pub histogram: NeighborHistogram,
    pub batches: usize,
}

/// Run one pass over `split` through the full input map with unclipped
/// neighbor matrices, and keep per layer the count covering `keep_ratio`
/// of the observed neighborhoods.
///
/// Stops at the end of the pass or once every layer holds
/// `samples_threshold` counts. A layer that saw no neighborhood at all
/// keeps its default limit.
pub fn calibrate_neighbor_limits(
    clouds: Arc<[IndexedCloud]>,
    split: Split,
    config: &DatasetConfig,
    budget: f64,
    seed: u64,
) -> Result<NeighborCalibration> {
    let _t = Timed::info("neighbor limit calibration");
    let cal = &config.calibration;
    let bins = config.max_neighbor_count();
    let pipeline = InputPipeline::new(config, vec![bins; config.num_layers])?;

    let sampler = RegionSampler::new(clouds, split, config.in_radius)?;
    let state = sampler.new_state(seed);
    let generator = BatchGenerator::new(sampler, state, budget, config.draws_per_pass(split))?;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    let mut histogram = NeighborHistogram::new(config.num_layers, bins);
    let mut batches = 0;
    for batch in generator {
        let inputs = pipeline.prepare(&batch, &mut rng);
        histogram.add_hierarchy(&inputs.hierarchy);
        batches += 1;
        if batches % 100 == 0 {
            log::debug!("neighbor calibration: {} batches, totals {:?}", batches, histogram.totals());
        }
        if histogram.min_total() >= cal.samples_threshold as u64 {
            break;
        }
    }

    let defaults = config.default_neighbor_limits();
    let limits: Vec<usize> = histogram
        .limits(cal.keep_ratio)
        .into_iter()
        .zip(histogram.totals())
        .zip(defaults)
        .enumerate()
        .map(|(layer, ((limit, total), default))| {
            if total == 0 {
                log::warn!("no neighborhoods observed on layer {layer}, keeping limit {default}");
                default
            } else {
                limit
            }
        })
        .collect();

    log::info!("neighborhood limits {:?} from {} batches", limits, batches);
    Ok(NeighborCalibration {
        limits,
        histogram,
        batches,
    })
}
