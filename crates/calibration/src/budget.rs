use pointbatch_core::{DatasetConfig, PointBatchError, Result, Timed};
use pointbatch_sampling::IndexedCloud;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Controller estimate farther than this from the target counts as not
/// converged.
pub const CONVERGENCE_TOLERANCE: f64 = 1.0;

/// Estimate window of the controller's running mean.
const SMOOTHING_WINDOW: usize = 100;

/// Result of point-budget calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetCalibration {
    /// Point budget handed to batch assembly.
    pub limit: f64,
    /// Smoothed number of regions fitting under `limit`.
    pub estimate: f64,
    pub target: usize,
    /// Region sizes the controller drew from.
    pub samples: usize,
    pub converged: bool,
}

/// Region sizes around randomly picked, jittered points of every cloud.
///
/// Roughly `total_samples` queries are spread evenly across clouds; a cloud
/// smaller than its share is queried at every point.
pub fn region_sizes<R: Rng + ?Sized>(
    clouds: &[IndexedCloud],
    radius: f32,
    total_samples: usize,
    noise_std: f32,
    rng: &mut R,
) -> Result<Vec<usize>> {
    if clouds.is_empty() {
        return Ok(Vec::new());
    }
    let noise = Normal::new(0.0f32, noise_std)
        .map_err(|e| PointBatchError::Config(format!("calibration noise: {e}")))?;
    let per_cloud = total_samples / clouds.len() + 1;

    let mut sizes = Vec::with_capacity(per_cloud * clouds.len());
    for cloud in clouds {
        let points = cloud.points();
        let picks = index::sample(rng, points.len(), per_cloud.min(points.len()));
        for i in picks.iter() {
            let p = points[i];
            let q = [
                p[0] + noise.sample(rng),
                p[1] + noise.sample(rng),
                p[2] + noise.sample(rng),
            ];
            sizes.push(cloud.tree.radius_search(&q, radius).len());
        }
    }
    Ok(sizes)
}

/// Find the point budget under which `target` regions fit in a batch on
/// average, by proportional control over random draws of `sizes`.
///
/// Starts from `max(sizes) * target` and, at every iteration, counts how
/// many regions of a random draw fit cumulatively under the current limit,
/// smooths that count, and moves the limit by `gain` times the gap to the
/// target.
pub fn calibrate_budget_from_sizes<R: Rng + ?Sized>(
    sizes: &[usize],
    target: usize,
    iterations: usize,
    gain: f64,
    rng: &mut R,
) -> Result<BudgetCalibration> {
    if sizes.is_empty() {
        return Err(PointBatchError::Config(
            "no region sizes to calibrate the point budget from".to_string(),
        ));
    }
    if target == 0 {
        return Err(PointBatchError::Config("target batch size must be >= 1".to_string()));
    }

    let mut sorted = sizes.to_vec();
    sorted.sort_unstable();
    let largest = sorted[sorted.len() - 1];
    let mut lim = (largest * target) as f64;

    // Draw size: the most sorted sizes that could ever fit under the
    // starting limit.
    let mut acc = 0.0;
    let draw = sorted
        .iter()
        .position(|&s| {
            acc += s as f64;
            acc > lim
        })
        .unwrap_or(sorted.len());

    let target_f = target as f64;
    let mut estimate = 0.0;
    for i in 0..iterations {
        let picks = index::sample(rng, sorted.len(), draw);
        let mut cumsum = 0.0;
        let mut fitting = 0usize;
        for j in picks.iter() {
            cumsum += sorted[j] as f64;
            if cumsum < lim {
                fitting += 1;
            }
        }

        estimate += (fitting as f64 - estimate) / (i + 1).min(SMOOTHING_WINDOW) as f64;
        lim += gain * (target_f - estimate);
    }

    let converged = (estimate - target_f).abs() <= CONVERGENCE_TOLERANCE;
    if !converged {
        log::warn!(
            "point budget did not converge: estimate {:.2} regions per batch, target {} (limit {:.0})",
            estimate,
            target,
            lim
        );
    }

    Ok(BudgetCalibration {
        limit: lim,
        estimate,
        target,
        samples: sorted.len(),
        converged,
    })
}

/// Calibrate the point budget over `clouds` with the settings of `config`.
pub fn calibrate_point_budget(
    clouds: &[IndexedCloud],
    config: &DatasetConfig,
    seed: u64,
) -> Result<BudgetCalibration> {
    let _t = Timed::info("point budget calibration");
    let cal = &config.calibration;
    let mut rng = StdRng::seed_from_u64(seed);

    let sizes = region_sizes(
        clouds,
        config.in_radius,
        cal.budget_samples,
        config.in_radius * cal.budget_noise_ratio,
        &mut rng,
    )?;
    let result = calibrate_budget_from_sizes(
        &sizes,
        config.batch_size,
        cal.budget_iterations,
        cal.budget_gain,
        &mut rng,
    )?;

    log::info!(
        "point budget {:.0} ({:.2} regions per batch from {} sampled regions)",
        result.limit,
        result.estimate,
        result.samples
    );
    Ok(result)
}
