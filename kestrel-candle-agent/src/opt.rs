//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::{
    adam::{Adam, ParamsAdam},
    esgd::{ParamsSGD, SGD},
    Decay, Momentum,
};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training neural networks.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        /// Decay rate of the first moment.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Decay rate of the second moment.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Term added to the denominator.
        #[serde(default = "default_eps")]
        eps: f64,
        /// Decoupled weight decay.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    /// Stochastic gradient descent with momentum and L2 weight decay.
    Sgd {
        /// Learning rate.
        lr: f64,
        /// Momentum factor, no momentum buffer is kept if zero.
        #[serde(default)]
        momentum: f64,
        /// L2 penalty added to the gradients.
        #[serde(default)]
        weight_decay: f64,
        /// Uses Nesterov momentum.
        #[serde(default)]
        nesterov: bool,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// SGD with momentum and weight decay as used for ImageNet classifiers.
    pub fn sgd(lr: f64, momentum: f64, weight_decay: f64) -> Self {
        Self::Sgd {
            lr,
            momentum,
            weight_decay,
            nesterov: false,
        }
    }

    /// Constructs the optimizer over the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
            OptimizerConfig::Sgd {
                lr,
                momentum,
                weight_decay,
                nesterov,
            } => {
                let momentum = match (*momentum > 0.0, *nesterov) {
                    (false, _) => None,
                    (true, false) => Some(Momentum::Classical(*momentum)),
                    (true, true) => Some(Momentum::Nesterov(*momentum)),
                };
                let params = ParamsSGD {
                    lr: *lr,
                    weight_decay: (*weight_decay > 0.0).then(|| Decay::WeightDecay(*weight_decay)),
                    momentum,
                    dampening: 0.0,
                };
                let opt = SGD::new(vars, params)?;
                Ok(Optimizer::Sgd(opt))
            }
        }
    }

    /// Returns the learning rate.
    pub fn get_learning_rate(&self) -> f64 {
        match self {
            Self::AdamW { lr, .. } | Self::Adam { lr } | Self::Sgd { lr, .. } => *lr,
        }
    }

    /// Override learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        match &mut self {
            Self::AdamW { lr, .. } | Self::Adam { lr } | Self::Sgd { lr, .. } => *lr = v,
        }
        self
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let params = ParamsAdamW::default();
        Self::AdamW {
            lr: params.lr,
            beta1: params.beta1,
            beta2: params.beta2,
            eps: params.eps,
            weight_decay: params.weight_decay,
        }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of optimizers implementing [`candle_nn::Optimizer`].
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),

    /// SGD optimizer.
    Sgd(SGD),
}

impl Optimizer {
    /// Applies a backward step pass.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
            Self::Sgd(opt) => Ok(opt.backward_step(loss)?),
        }
    }

    /// Updates the variables with precomputed gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.step(grads)?),
            Self::Adam(opt) => Ok(opt.step(grads)?),
            Self::Sgd(opt) => Ok(opt.step(grads)?),
        }
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::AdamW(opt) => opt.learning_rate(),
            Self::Adam(opt) => opt.learning_rate(),
            Self::Sgd(opt) => opt.learning_rate(),
        }
    }

    /// Sets the learning rate.
    pub fn set_learning_rate(&mut self, lr: f64) {
        match self {
            Self::AdamW(opt) => opt.set_learning_rate(lr),
            Self::Adam(opt) => opt.set_learning_rate(lr),
            Self::Sgd(opt) => opt.set_learning_rate(lr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{Init, VarMap};

    #[test]
    fn test_serde_optimizer_config() -> Result<()> {
        let config = OptimizerConfig::sgd(0.1, 0.9, 1e-4);
        let yaml = serde_yaml::to_string(&config)?;
        let config_: OptimizerConfig = serde_yaml::from_str(&yaml)?;
        assert_eq!(config, config_);
        assert_eq!(config.learning_rate(0.01).get_learning_rate(), 0.01);
        Ok(())
    }

    #[test]
    fn test_sgd_decreases_quadratic() -> Result<()> {
        let vm = VarMap::new();
        let w = vm.get((3,), "w", Init::Const(1.0), DType::F32, &Device::Cpu)?;
        let mut opt = OptimizerConfig::sgd(0.1, 0.9, 0.0).build(vm.all_vars())?;

        let loss0 = w.sqr()?.sum_all()?.to_scalar::<f32>()?;
        for _ in 0..5 {
            let loss = w.sqr()?.sum_all()?;
            opt.backward_step(&loss)?;
        }
        let loss1 = w.sqr()?.sum_all()?.to_scalar::<f32>()?;
        assert!(loss1 < loss0);

        opt.set_learning_rate(0.01);
        assert!((opt.learning_rate() - 0.01).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_nesterov_sgd_with_weight_decay() -> Result<()> {
        let vm = VarMap::new();
        let w = vm.get((2, 2), "w", Init::Const(2.0), DType::F32, &Device::Cpu)?;
        let config = OptimizerConfig::Sgd {
            lr: 0.05,
            momentum: 0.9,
            weight_decay: 1e-4,
            nesterov: true,
        };
        let mut opt = config.build(vm.all_vars())?;
        assert!(matches!(opt, Optimizer::Sgd(_)));

        let loss0 = w.sqr()?.sum_all()?.to_scalar::<f32>()?;
        for _ in 0..5 {
            let loss = w.sqr()?.sum_all()?;
            opt.backward_step(&loss)?;
        }
        let loss1 = w.sqr()?.sum_all()?.to_scalar::<f32>()?;
        assert!(loss1 < loss0);
        assert!((opt.learning_rate() - 0.05).abs() < 1e-12);
        Ok(())
    }
}
