use super::{ClassifierTrainerConfig, PlateauScheduler, TrainingContext};
use anyhow::Result;
use kestrel_core::record::{Record, RecordValue, Recorder};
use log::info;
use std::time::Instant;

/// Runs the epochs of an image classifier.
///
/// Each epoch trains on every image of the training split, then measures the
/// accuracy on the test split. The parameters are saved once all epochs are done.
pub struct ClassifierTrainer {
    config: ClassifierTrainerConfig,
    scheduler: Option<PlateauScheduler>,
}

impl ClassifierTrainer {
    /// Constructs a trainer.
    pub fn build(config: ClassifierTrainerConfig) -> Self {
        let scheduler = config.plateau.clone().map(PlateauScheduler::new);
        Self { config, scheduler }
    }

    /// Trains the network in `ctx`, writing one record per epoch to `recorder`.
    ///
    /// Returns the test accuracy of the last epoch.
    pub fn train(&mut self, ctx: &mut TrainingContext, recorder: &mut dyn Recorder) -> Result<f32> {
        let mut accuracy = 0f32;

        for epoch in 0..self.config.epochs {
            let tic = Instant::now();
            let train_loss = ctx.train_epoch()?;
            accuracy = ctx.evaluate()?;
            let elapsed = tic.elapsed().as_secs_f32();
            let lr = ctx.learning_rate();

            info!(
                "Epoch {}: Test accuracy {:.3}, Time {:.3} (s)",
                epoch, accuracy, elapsed
            );
            recorder.write(Record::from_slice(&[
                ("epoch", RecordValue::Scalar(epoch as f32)),
                ("train_loss", RecordValue::Scalar(train_loss)),
                ("test_accuracy", RecordValue::Scalar(accuracy)),
                ("lr", RecordValue::Scalar(lr as f32)),
                ("elapsed_secs", RecordValue::Scalar(elapsed)),
            ]));

            if let Some(scheduler) = self.scheduler.as_mut() {
                if let Some(new_lr) = scheduler.step(accuracy, lr) {
                    info!("Reduce learning rate to {:e}", new_lr);
                    ctx.set_learning_rate(new_lr);
                }
            }
        }
        recorder.flush();

        ctx.save(&self.config.checkpoint)?;
        Ok(accuracy)
    }
}
