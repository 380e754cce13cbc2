//! The user-facing estimator and its train/query lifecycle.

use crate::common_types::Coordinate;
use crate::error::{Error, Result};
use crate::kde::config::KdeConfig;
use crate::kde::model::DensityModel;
use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;

/// Lifecycle of a [`KernelDensity`] estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No samples yet.
    Untrained,
    /// A model is available for queries.
    Trained,
    /// A configuration change was rejected; the previous model is gone and
    /// the next successful `train` recovers.
    Failed,
}

#[derive(Debug, Clone)]
enum Lifecycle<F> {
    Untrained,
    Trained(Arc<DensityModel<F>>),
    Failed,
}

/// Tree-accelerated kernel density estimator.
///
/// ```
/// use tree_kde::{KdeConfig, KernelDensity};
///
/// let mut kde = KernelDensity::new(KdeConfig::default().with_bandwidth(0.5))?;
/// kde.train(&[vec![1.0], vec![1.1], vec![8.0], vec![8.2]])?;
/// let log_density = kde.get_log_density(&[vec![1.05], vec![4.5]])?;
/// assert!(log_density[0] > log_density[1]);
/// # Ok::<(), tree_kde::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct KernelDensity<F> {
    config: KdeConfig,
    lifecycle: Lifecycle<F>,
}

impl<F: Coordinate> Default for KernelDensity<F> {
    fn default() -> Self {
        KernelDensity {
            config: KdeConfig::default(),
            lifecycle: Lifecycle::Untrained,
        }
    }
}

impl<F: Coordinate> KernelDensity<F> {
    pub fn new(config: KdeConfig) -> Result<Self> {
        config.validate()?;
        Ok(KernelDensity {
            config,
            lifecycle: Lifecycle::Untrained,
        })
    }

    pub fn state(&self) -> State {
        match self.lifecycle {
            Lifecycle::Untrained => State::Untrained,
            Lifecycle::Trained(_) => State::Trained,
            Lifecycle::Failed => State::Failed,
        }
    }

    /// Current configuration. A trained model answers with this configuration.
    pub fn config(&self) -> &KdeConfig {
        &self.config
    }

    pub fn dimension(&self) -> Option<usize> {
        self.trained().ok().map(|model| model.dimension())
    }

    pub fn num_samples(&self) -> Option<usize> {
        self.trained().ok().map(|model| model.num_samples())
    }

    /// Builds a new model over `samples`, replacing any previous one.
    ///
    /// On failure the estimator keeps its previous state and model.
    pub fn train(&mut self, samples: &[Vec<F>]) -> Result<()> {
        let model = DensityModel::fit(samples, self.config.clone())?;
        info!(
            "trained {} estimator on {} samples of dimension {} ({} tree nodes)",
            self.config.mode,
            model.num_samples(),
            model.dimension(),
            model.tree().nodes().len()
        );
        self.lifecycle = Lifecycle::Trained(Arc::new(model));
        Ok(())
    }

    /// Natural-log density estimate at each query point, in query order.
    pub fn get_log_density(&self, queries: &[Vec<F>]) -> Result<Vec<f64>> {
        let model = self.trained()?;
        debug!(
            "evaluating {} queries with {} (abs_tol {}, rel_tol {})",
            queries.len(),
            self.config.mode,
            self.config.abs_tol,
            self.config.rel_tol
        );
        model.log_density(queries)
    }

    /// Sum of the log-densities at `queries`.
    pub fn score(&self, queries: &[Vec<F>]) -> Result<f64> {
        self.trained()?.score(queries)
    }

    /// Draws `n` points from the trained density.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<Vec<F>>> {
        self.trained()?.sample(n, rng)
    }

    /// Snapshot of the trained model. It stays valid, and keeps answering
    /// with the old samples, after the estimator is retrained.
    pub fn model(&self) -> Result<Arc<DensityModel<F>>> {
        self.trained().map(Arc::clone)
    }

    /// Changes one option by name (see [`KdeConfig::set_option`]).
    ///
    /// A trained estimator is reconfigured in place, reusing its tree where
    /// possible. A rejected value moves the estimator to [`State::Failed`].
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match self.with_option(key, value) {
            Ok((config, model)) => {
                if let Some(model) = model {
                    self.lifecycle = Lifecycle::Trained(model);
                }
                self.config = config;
                Ok(())
            }
            Err(err) => {
                warn!("rejected option {key} = {value:?}: {err}; estimator must be retrained");
                self.lifecycle = Lifecycle::Failed;
                Err(err)
            }
        }
    }

    /// The configuration after setting `key`, and the reconfigured model if
    /// the estimator is trained. Leaves `self` untouched.
    fn with_option(&self, key: &str, value: &str) -> Result<(KdeConfig, Option<Arc<DensityModel<F>>>)> {
        let mut config = self.config.clone();
        config.set_option(key, value)?;
        let model = match &self.lifecycle {
            Lifecycle::Trained(model) => Some(Arc::new(model.reconfigure(config.clone())?)),
            Lifecycle::Untrained | Lifecycle::Failed => None,
        };
        Ok((config, model))
    }

    fn trained(&self) -> Result<&Arc<DensityModel<F>>> {
        match &self.lifecycle {
            Lifecycle::Trained(model) => Ok(model),
            Lifecycle::Untrained => Err(Error::InvalidState("estimator has not been trained")),
            Lifecycle::Failed => Err(Error::InvalidState(
                "estimator is in the failed state after a rejected option; train it again",
            )),
        }
    }
}
