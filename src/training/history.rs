use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Counters and histories of a training, updated once per cost call and once per iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Completed iterations, over all optimizer runs
    pub iteration: usize,
    /// Cost function calls, over all optimizer runs
    pub calls: usize,
    /// Cost function calls since the last iteration
    pub iteration_calls: usize,
    /// Error of the latest cost function call
    pub current_error: Option<f64>,

    /// Error at each call
    pub call_errors: Vec<f64>,
    /// Error at each iteration
    pub iteration_errors: Vec<f64>,
    /// Validation error at each iteration, if there is a validation set
    pub iteration_val_errors: Vec<f64>,
    /// Parameters reached at each iteration
    pub iteration_params: Vec<Array1<f64>>,
    /// Total call count at each iteration
    pub iteration_call_counts: Vec<usize>,
    /// Seconds taken by each iteration
    pub iteration_times: Vec<f64>,
    /// Iteration counts at which a new batch was selected
    pub batch_change_iterations: Vec<usize>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        TrainingHistory {
            iteration: 0,
            calls: 0,
            iteration_calls: 0,
            current_error: None,
            call_errors: Vec::new(),
            iteration_errors: Vec::new(),
            iteration_val_errors: Vec::new(),
            iteration_params: Vec::new(),
            iteration_call_counts: Vec::new(),
            iteration_times: Vec::new(),
            batch_change_iterations: Vec::new(),
        }
    }

    pub fn record_call(&mut self, error: f64) {
        self.current_error = Some(error);
        self.calls += 1;
        self.iteration_calls += 1;
        self.call_errors.push(error);
    }

    /// Close an iteration and return the number of calls it took.
    pub fn record_iteration(&mut self, params: Array1<f64>, seconds: f64, val_error: Option<f64>) -> usize {
        self.iteration += 1;
        self.iteration_times.push(seconds);
        self.iteration_errors.push(self.current_error.unwrap_or(f64::INFINITY));
        self.iteration_call_counts.push(self.calls);
        self.iteration_params.push(params);
        if let Some(err) = val_error {
            self.iteration_val_errors.push(err);
        }
        std::mem::replace(&mut self.iteration_calls, 0)
    }

    pub fn record_batch_change(&mut self) {
        self.batch_change_iterations.push(self.iteration);
    }

    pub fn reset_iteration_calls(&mut self) {
        self.iteration_calls = 0;
    }

    pub fn total_time(&self) -> f64 {
        self.iteration_times.iter().sum()
    }

    /// Iteration (counted from 1) with the lowest validation error, or training error
    /// without validation set.
    pub fn best_iteration(&self) -> Option<usize> {
        let errors = if self.iteration_val_errors.is_empty() {
            &self.iteration_errors
        } else {
            &self.iteration_val_errors
        };
        errors
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i + 1)
    }

    /// Save the history to a JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self::new()
    }
}
