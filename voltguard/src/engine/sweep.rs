//! What-if sweeps.
//!
//! A sweep varies one parameter of a base circuit (conductor size or
//! length), turns every variant into an independent job, and evaluates the
//! jobs with a concurrency cap. Jobs share nothing mutable. Results come
//! back in job order no matter which job finished first.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::compliance::voltage_drop::{
    CalcError, CalculationResult, Evaluator, VoltageDropCalculator,
};
use crate::config::BatchConfig;
use crate::ucs::schema::CalculationInputs;

/// Upper bound on the number of variants one sweep may generate
pub const MAX_SWEEP_VARIANTS: usize = 10_000;

/// Strategies that cannot be turned into jobs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error("Sweep would generate {requested} variants; the limit is {max}")]
    TooManyVariants { requested: usize, max: usize },

    #[error("Length range {start_m} m to {end_m} m is not finite")]
    InvalidRange { start_m: f64, end_m: f64 },
}

/// How to derive variants from the base circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStrategy {
    /// One variant per listed conductor size
    ConductorSizes(Vec<String>),
    /// `steps` evenly spaced lengths from `start_m` to `end_m`, both ends
    /// included. One step yields `start_m` only; zero steps yield nothing.
    LengthRange { start_m: f64, end_m: f64, steps: usize },
}

impl SweepStrategy {
    /// Number of variants this strategy generates
    pub fn variant_count(&self) -> usize {
        match self {
            SweepStrategy::ConductorSizes(sizes) => sizes.len(),
            SweepStrategy::LengthRange { steps, .. } => *steps,
        }
    }

    /// Reject strategies too large or malformed to run
    pub fn validate(&self) -> Result<(), SweepError> {
        let requested = self.variant_count();
        if requested > MAX_SWEEP_VARIANTS {
            return Err(SweepError::TooManyVariants {
                requested,
                max: MAX_SWEEP_VARIANTS,
            });
        }
        if let SweepStrategy::LengthRange { start_m, end_m, .. } = *self {
            if !start_m.is_finite() || !end_m.is_finite() {
                return Err(SweepError::InvalidRange { start_m, end_m });
            }
        }
        Ok(())
    }

    /// Lengths produced by a `LengthRange`, empty for other strategies
    pub fn lengths(&self) -> Result<Vec<f64>, SweepError> {
        self.validate()?;
        let lengths = match *self {
            SweepStrategy::LengthRange {
                start_m,
                end_m,
                steps,
            } => match steps {
                0 => Vec::new(),
                1 => vec![start_m],
                n => {
                    let step = (end_m - start_m) / (n - 1) as f64;
                    (0..n)
                        .map(|i| {
                            if i == n - 1 {
                                end_m
                            } else {
                                start_m + step * i as f64
                            }
                        })
                        .collect()
                }
            },
            SweepStrategy::ConductorSizes(_) => Vec::new(),
        };
        Ok(lengths)
    }
}

/// One variant to evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Position in the sweep, starting at 0
    pub job_id: usize,
    /// Human-readable variant, e.g. "4 AWG" or "35.00 m"
    pub label: String,
    pub inputs: CalculationInputs,
}

/// A finished job paired with its result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub job_id: usize,
    pub label: String,
    pub result: CalculationResult,
}

/// Summary of a finished sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total_jobs: usize,
    /// Successful jobs, ordered by job id
    pub results: Vec<BatchResult>,
    /// Jobs that produced no result
    pub failed_job_ids: Vec<usize>,
    /// First result in job order that is compliant and ampacity-adequate
    pub best_compliant: Option<BatchResult>,
}

impl BatchReport {
    fn from_results(total_jobs: usize, results: Vec<BatchResult>) -> Self {
        let mut failed_job_ids = Vec::new();
        let mut next = results.iter().map(|r| r.job_id).peekable();
        for job_id in 0..total_jobs {
            if next.peek() == Some(&job_id) {
                next.next();
            } else {
                failed_job_ids.push(job_id);
            }
        }

        let best_compliant = results.iter().find(|r| r.result.is_acceptable()).cloned();

        Self {
            total_jobs,
            results,
            failed_job_ids,
            best_compliant,
        }
    }
}

/// Build one job per variant of `base`
pub fn generate_jobs(
    base: &CalculationInputs,
    strategy: &SweepStrategy,
) -> Result<Vec<BatchJob>, SweepError> {
    strategy.validate()?;
    let jobs = match strategy {
        SweepStrategy::ConductorSizes(sizes) => sizes
            .iter()
            .enumerate()
            .map(|(job_id, size)| BatchJob {
                job_id,
                label: size.clone(),
                inputs: base.with_conductor_size(size.clone()),
            })
            .collect(),
        SweepStrategy::LengthRange { .. } => strategy
            .lengths()?
            .into_iter()
            .enumerate()
            .map(|(job_id, length_m)| BatchJob {
                job_id,
                label: format!("{:.2} m", length_m),
                inputs: base.with_length(length_m),
            })
            .collect(),
    };
    Ok(jobs)
}

/// Concurrency-capped batch evaluator
pub struct BatchProcessor {
    evaluator: Arc<dyn Evaluator>,
    max_concurrency: usize,
}

impl BatchProcessor {
    pub fn new(evaluator: Arc<dyn Evaluator>, config: &BatchConfig) -> Self {
        Self {
            evaluator,
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Evaluate `jobs`, reporting every completion as it happens. Results
    /// keep the order of `jobs`.
    ///
    /// `on_progress(completed, total)` fires for every job, failed or not.
    /// `on_job_complete` fires only for jobs that produced a result.
    pub async fn run<P, C>(
        &self,
        jobs: Vec<BatchJob>,
        mut on_progress: P,
        mut on_job_complete: C,
    ) -> Vec<BatchResult>
    where
        P: FnMut(usize, usize),
        C: FnMut(&BatchResult),
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<(usize, BatchJob, Result<CalculationResult, CalcError>)> =
            JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let evaluator = Arc::clone(&self.evaluator);
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => evaluator.evaluate(&job.inputs),
                    Err(e) => Err(CalcError::Other(format!("Batch cancelled: {}", e))),
                };
                (index, job, outcome)
            });
        }

        let mut slots: Vec<Option<BatchResult>> = vec![None; total];
        let mut completed = 0;

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok((index, job, Ok(result))) => {
                    debug!("Sweep job {} ({}) finished", job.job_id, job.label);
                    let batch_result = BatchResult {
                        job_id: job.job_id,
                        label: job.label,
                        result,
                    };
                    on_job_complete(&batch_result);
                    slots[index] = Some(batch_result);
                }
                Ok((_, job, Err(e))) => {
                    warn!("Sweep job {} ({}) failed: {}", job.job_id, job.label, e)
                }
                Err(e) => warn!("Sweep job task failed: {}", e),
            }
            on_progress(completed, total);
        }

        let results: Vec<BatchResult> = slots.into_iter().flatten().collect();
        info!(
            "Sweep finished: {}/{} job(s) succeeded in {:?}",
            results.len(),
            total,
            started.elapsed()
        );
        results
    }

    /// Generate the variants of `base`, run them, and summarize
    pub async fn sweep<P, C>(
        &self,
        base: &CalculationInputs,
        strategy: &SweepStrategy,
        on_progress: P,
        on_job_complete: C,
    ) -> Result<BatchReport, SweepError>
    where
        P: FnMut(usize, usize),
        C: FnMut(&BatchResult),
    {
        let jobs = generate_jobs(base, strategy)?;
        let total = jobs.len();
        info!("Sweeping circuit {} over {} variant(s)", base.id(), total);
        let results = self.run(jobs, on_progress, on_job_complete).await;
        Ok(BatchReport::from_results(total, results))
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(Arc::new(VoltageDropCalculator::default()), &BatchConfig::default())
    }
}
