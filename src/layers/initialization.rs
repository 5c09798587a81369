use ndarray::{s, Array1, ArrayViewMut1};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;

use super::dense::Layer;
use crate::error::{Result, TenbilacError};

impl Layer {
    /// Add independent Gaussian noise to the weights (scale `wscale`) and biases (scale `bscale`).
    pub fn addnoise<R: Rng + ?Sized>(
        &self,
        mut params: ArrayViewMut1<f64>,
        wscale: f64,
        bscale: f64,
        rng: &mut R,
    ) -> Result<()> {
        let wdist = normal(wscale, "wscale")?;
        let bdist = normal(bscale, "bscale")?;
        let wnoise = Array1::random_using(self.nn * self.ni, wdist, rng);
        let bnoise = Array1::random_using(self.nn, bdist, rng);
        let mut weights = self.flat_weights_mut(params.view_mut());
        weights += &wnoise;
        let mut biases = self.biases_mut(params);
        biases += &bnoise;
        Ok(())
    }

    /// Set all weights and biases to zero.
    pub fn zero(&self, mut params: ArrayViewMut1<f64>) {
        log::info!("Setting {}-layer '{}' parameters to zero...", self.mode, self.name);
        self.flat_weights_mut(params.view_mut()).fill(0.0);
        self.biases_mut(params).fill(0.0);
    }

    /// Initialise the layer so that neuron `i` passes input `i` through, for the first
    /// `min(nn, ni)` neurons (or only the first `only_n` of them). All other weights and all
    /// biases are zero.
    ///
    /// This holds for both modes: a product unit with a single unit exponent is the identity too.
    pub fn set_identity(&self, mut params: ArrayViewMut1<f64>, only_n: Option<usize>) {
        let mut n = self.nn.min(self.ni);
        if let Some(only_n) = only_n {
            n = n.min(only_n);
        }
        let mut weights = self.flat_weights_mut(params.view_mut());
        weights.fill(0.0);
        for i in 0..n {
            weights[i * self.ni + i] = 1.0;
        }
        self.biases_mut(params).fill(0.0);
    }
}

impl Layer {
    fn flat_weights_mut<'a>(&self, params: ArrayViewMut1<'a, f64>) -> ArrayViewMut1<'a, f64> {
        let range = self.weight_range();
        params.slice_move(s![range.start..range.end])
    }
}

fn normal(scale: f64, name: &str) -> Result<Normal<f64>> {
    Normal::new(0.0, scale).map_err(|e| {
        TenbilacError::invalid_parameter(name.to_string(), format!("{} ({})", e, scale))
    })
}
