//! Optimization of a model's flat parameter vector against training data.
//!
//! A [`Training`] is the [`Objective`] handed to the minimizers: every cost call writes the
//! candidate parameters into the model, runs it on the current batch and evaluates the
//! error function under the output mask. Counters and histories live in a
//! [`TrainingHistory`] that is updated only from `cost` and from the iteration callback.

pub mod history;

use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

use bincode::{deserialize, serialize};
use log::{debug, info, warn};
use ndarray::{Array2, Array3, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{OptPlan, TrainingConfig};
use crate::data::{demask, DataSet, TrainData};
use crate::error::{Result, TenbilacError};
use crate::loss::ErrorFunction;
use crate::model::Model;
use crate::optimizer::{
    Algorithm, Bfgs, ConjugateGradient, Objective, OptimizationResult, Optimizer,
};

pub use history::TrainingHistory;

/// Gradient tolerance of the BFGS passes of [`Training::minibatch_bfgs`].
pub const MINIBATCH_GTOL: f64 = 1e-8;

/// Demasked inputs, output mask and targets, ready for the cost function.
#[derive(Clone, Debug)]
struct Batch {
    inputs: Array3<f64>,
    outputs_mask: Option<Array3<bool>>,
    targets: Array2<f64>,
}

impl Batch {
    fn new(set: &DataSet, no: usize) -> Result<Self> {
        let (inputs, outputs_mask) = demask(&set.inputs, no)?;
        Ok(Batch {
            inputs,
            outputs_mask,
            targets: set.targets.clone(),
        })
    }

    fn nrea(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    fn ncases(&self) -> usize {
        self.targets.ncols()
    }

    fn select_cases(&self, cases: &[usize]) -> Batch {
        Batch {
            inputs: self.inputs.select(Axis(2), cases),
            outputs_mask: self.outputs_mask.as_ref().map(|m| m.select(Axis(2), cases)),
            targets: self.targets.select(Axis(1), cases),
        }
    }

    fn error<M: Model>(&self, model: &M, errfct: ErrorFunction) -> Result<f64> {
        let outputs = model.run3(self.inputs.view())?;
        Ok(errfct.evaluate(
            outputs.view(),
            self.targets.view(),
            self.outputs_mask.as_ref().map(|m| m.view()),
        ))
    }
}

/// What [`Training::save`] writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<M> {
    pub model: M,
    pub history: TrainingHistory,
    pub errfctname: String,
}

#[derive(Serialize)]
struct CheckpointRef<'a, M> {
    model: &'a M,
    history: &'a TrainingHistory,
    errfctname: &'a str,
}

impl<M: DeserializeOwned> Checkpoint<M> {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = fs::File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(deserialize(&buffer)?)
    }
}

pub struct Training<M> {
    model: M,
    errfct: ErrorFunction,
    config: TrainingConfig,
    full: Batch,
    minibatch: Option<Batch>,
    val: Option<Batch>,
    history: TrainingHistory,
    rng: StdRng,
    iteration_start: Instant,
}

impl<M: Model + Serialize> Training<M> {
    /// Set up a training of `model` on `data`.
    ///
    /// The inputs are demasked once here. With an `itersavepath`, the training is saved
    /// right away so that a bad path fails before any optimization.
    pub fn new(model: M, data: TrainData, config: TrainingConfig) -> Result<Self> {
        let errfct = config.validate()?;
        if data.nfeatures() != model.ni() {
            return Err(TenbilacError::dimension_mismatch(
                format!("{} input features", model.ni()),
                format!("{} input features", data.nfeatures()),
            ));
        }
        errfct.check_arity(model.no(), data.ntargets())?;

        info!(
            "Setting up the training with {} cases and {} realizations...",
            data.ncases(),
            data.nrea()
        );

        let full = Batch::new(&data.train, model.no())?;
        let val = data
            .val
            .as_ref()
            .map(|set| Batch::new(set, model.no()))
            .transpose()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let training = Training {
            model,
            errfct,
            config,
            full,
            minibatch: None,
            val,
            history: TrainingHistory::new(),
            rng,
            iteration_start: Instant::now(),
        };

        if let Some(path) = &training.config.itersavepath {
            training.save(path)?;
        }
        Ok(training)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn errfct(&self) -> ErrorFunction {
        self.errfct
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Number of cases in the current batch.
    pub fn batch_ncases(&self) -> usize {
        self.batch().ncases()
    }

    fn batch(&self) -> &Batch {
        self.minibatch.as_ref().unwrap_or(&self.full)
    }

    /// Train on all cases again.
    pub fn fullbatch(&mut self) {
        if self.minibatch.take().is_some() {
            self.history.record_batch_change();
        }
    }

    /// Train on `size` cases drawn without replacement from the full set.
    pub fn random_minibatch(&mut self, size: usize) -> Result<()> {
        let ncases = self.full.ncases();
        if size > ncases {
            return Err(TenbilacError::MinibatchTooLarge { size, ncases });
        }
        info!("Randomly selecting new minibatch of {} among {} cases...", size, ncases);
        let mut cases: Vec<usize> = (0..ncases).collect();
        cases.shuffle(&mut self.rng);
        cases.truncate(size);
        self.minibatch = Some(self.full.select_cases(&cases));
        self.history.record_batch_change();
        Ok(())
    }

    /// Write `p` into the model and return the error on the current batch.
    pub fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
        let mut params = self.model.flat_parameters();
        if params.len() != p.len() {
            return Err(TenbilacError::dimension_mismatch(
                format!("{} parameters", params.len()),
                format!("{} parameters", p.len()),
            ));
        }
        params.assign(&p);

        let batch = self.minibatch.as_ref().unwrap_or(&self.full);
        let err = batch.error(&self.model, self.errfct)?;
        self.history.record_call(err);

        if self.config.verbose {
            debug!(
                "Iteration {:4}, call number {:8}: cost = {:.8e}",
                self.history.iteration, self.history.calls, err
            );
            debug!("\n{}", self.model.report());
        }
        Ok(err)
    }

    /// Cost of the parameters the model currently holds.
    pub fn currentcost(&mut self) -> Result<f64> {
        let p = self.model.parameters().to_owned();
        self.cost(p.view())
    }

    /// Call the cost function once and log how long it took.
    pub fn testcost(&mut self) -> Result<f64> {
        info!("Testing cost function call...");
        let start = Instant::now();
        let err = self.currentcost()?;
        info!(
            "Done in {:.4} seconds. Current state: {} = {:.8e}",
            start.elapsed().as_secs_f64(),
            self.errfct,
            err
        );
        Ok(err)
    }

    /// Error of the current parameters on the validation set, if any.
    pub fn valcost(&self) -> Result<Option<f64>> {
        self.val
            .as_ref()
            .map(|val| val.error(&self.model, self.errfct))
            .transpose()
    }

    pub fn bfgs(&mut self, maxiter: usize, gtol: f64) -> Result<OptimizationResult> {
        self.optimize(&Algorithm::Bfgs(Bfgs::new(maxiter, gtol)))
    }

    pub fn cg(&mut self, maxiter: usize, gtol: f64) -> Result<OptimizationResult> {
        self.optimize(&Algorithm::Cg(ConjugateGradient::new(maxiter, gtol)))
    }

    /// `nloops` short BFGS runs, each on a new random minibatch of `size` cases.
    pub fn minibatch_bfgs(&mut self, size: usize, nloops: usize, maxiter: usize) -> Result<()> {
        let algo = Algorithm::Bfgs(Bfgs::new(maxiter, MINIBATCH_GTOL));
        self.minibatch_loops(&algo, size, nloops)
    }

    fn minibatch_loops(&mut self, algo: &Algorithm, size: usize, nloops: usize) -> Result<()> {
        for _ in 0..nloops {
            self.random_minibatch(size)?;
            self.optimize(algo)?;
        }
        Ok(())
    }

    /// Run an optimization plan: full batch, or repeated minibatches if the plan has a
    /// minibatch size.
    pub fn opt(&mut self, plan: &OptPlan) -> Result<()> {
        let algo = plan.algorithm()?;
        match plan.minibatch_size(self.full.ncases())? {
            Some(size) => self.minibatch_loops(&algo, size, plan.mbloops),
            None => self.optimize(&algo).map(|_| ()),
        }
    }

    /// Minimize the error from the current parameters, leaving the model at the optimum found.
    pub fn optimize(&mut self, algo: &Algorithm) -> Result<OptimizationResult> {
        self.start()?;
        info!(
            "Starting {} for {} iterations (maximum)...",
            algo.name().to_uppercase(),
            algo.maxiter()
        );

        let x0 = self.model.parameters().to_owned();
        let result = algo.minimize(&mut *self, x0)?;
        self.cost(result.x.view())?;

        if result.success() {
            info!(
                "Done with optimization ({}), {} func_calls and {} grad_calls",
                result.status, result.func_calls, result.grad_calls
            );
        } else {
            warn!(
                "Optimization stopped early: {} after {} iterations",
                result.status, result.iterations
            );
        }
        self.end();
        Ok(result)
    }

    fn start(&mut self) -> Result<()> {
        self.testcost()?;
        self.iteration_start = Instant::now();
        self.history.reset_iteration_calls();
        Ok(())
    }

    fn end(&mut self) {
        self.history.reset_iteration_calls();
        info!("Total training time: {:.2} s", self.history.total_time());
    }

    /// Save the model, the history and the error function name with bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let checkpoint = CheckpointRef {
            model: &self.model,
            history: &self.history,
            errfctname: self.errfct.name(),
        };
        let serialized = serialize(&checkpoint)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        Ok(())
    }
}

impl<M: Model + Serialize> Objective for Training<M> {
    fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
        Training::cost(self, p)
    }

    fn iteration(&mut self, p: ArrayView1<f64>) -> Result<()> {
        let now = Instant::now();
        let seconds = now.duration_since(self.iteration_start).as_secs_f64();
        let val_error = self.valcost()?;
        let calls = self.history.record_iteration(p.to_owned(), seconds, val_error);

        info!(
            "Iteration {:4}, {} = {:.8e}, took {:.4} s for {} calls ({:.4} s per call)",
            self.history.iteration,
            self.errfct,
            self.history.current_error.unwrap_or(f64::INFINITY),
            seconds,
            calls,
            seconds / calls.max(1) as f64
        );
        if let Some(err) = val_error {
            info!("Validation {} = {:.8e}", self.errfct, err);
        }

        if let Some(path) = &self.config.itersavepath {
            self.save(path)?;
        }
        self.iteration_start = now;
        Ok(())
    }
}

impl<M> fmt::Display for Training<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Training using {} on {} cases with {} realizations",
            self.errfct,
            self.full.ncases(),
            self.full.nrea()
        )
    }
}
