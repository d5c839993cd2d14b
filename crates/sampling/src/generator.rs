use crate::batch::{Batch, BatchAssembler};
use crate::potential::SamplingState;
use crate::region::RegionSampler;
use pointbatch_core::{PointBatchError, Result, Split};

/// One pass of batch generation over a split.
///
/// Pull-based: every `next` draws regions until a batch closes. After the
/// configured number of draws the remainder is flushed and the iterator
/// returns `None`; a new pass needs a new generator over a fresh
/// [`SamplingState`].
#[derive(Debug, Clone)]
pub struct BatchGenerator {
    sampler: RegionSampler,
    state: SamplingState,
    assembler: BatchAssembler,
    remaining: usize,
    drawn: usize,
    emitted: usize,
    finished: bool,
}

/// Floor a calibrated point budget, rejecting values below one point.
pub fn floor_budget(budget: f64) -> Result<usize> {
    if !(budget.is_finite() && budget >= 1.0) {
        return Err(PointBatchError::InvalidBudget(budget));
    }
    Ok(budget.floor() as usize)
}

impl BatchGenerator {
    pub fn new(sampler: RegionSampler, state: SamplingState, budget: f64, draws: usize) -> Result<Self> {
        if state.split() != sampler.split() || state.fields().len() != sampler.clouds().len() {
            return Err(PointBatchError::Config(format!(
                "sampling state of {} ({} clouds) does not match sampler of {} ({} clouds)",
                state.split(),
                state.fields().len(),
                sampler.split(),
                sampler.clouds().len()
            )));
        }
        let budget = floor_budget(budget)?;
        log::debug!(
            "{} pass: {} draws, budget {} points",
            sampler.split(),
            draws,
            budget
        );

        Ok(Self {
            sampler,
            state,
            assembler: BatchAssembler::new(budget),
            remaining: draws,
            drawn: 0,
            emitted: 0,
            finished: false,
        })
    }

    pub fn split(&self) -> Split {
        self.sampler.split()
    }

    pub fn budget(&self) -> usize {
        self.assembler.budget()
    }

    pub fn state(&self) -> &SamplingState {
        &self.state
    }

    pub fn into_state(self) -> SamplingState {
        self.state
    }

    pub fn regions_drawn(&self) -> usize {
        self.drawn
    }

    pub fn remaining_draws(&self) -> usize {
        self.remaining
    }

    pub fn batches_emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.finished
    }

    fn emit(&mut self, batch: Batch) -> Option<Batch> {
        self.emitted += 1;
        Some(batch)
    }
}

impl Iterator for BatchGenerator {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.finished {
            return None;
        }

        let budget = self.assembler.budget();
        while self.remaining > 0 {
            let region = self.sampler.sample(&mut self.state, budget);
            self.remaining -= 1;
            self.drawn += 1;
            if let Some(batch) = self.assembler.push(region) {
                return self.emit(batch);
            }
        }

        self.finished = true;
        let last = self.assembler.flush();
        log::debug!(
            "{} pass exhausted after {} draws, {} batches",
            self.split(),
            self.drawn,
            self.emitted + usize::from(last.is_some())
        );
        match last {
            Some(batch) => self.emit(batch),
            None => None,
        }
    }
}
