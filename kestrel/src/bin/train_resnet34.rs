use anyhow::Result;
use clap::Parser;
use kestrel::{
    core::record::NullRecorder,
    imagenet::{
        ClassifierTrainer, ClassifierTrainerConfig, ImageFolder, ImageFolderConfig,
        TrainingContext,
    },
};
use log::info;
use std::path::PathBuf;

/// Train ResNet-34 on a directory of labeled images
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Trainer configuration (yaml); defaults are used if not given
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset root containing one directory per split
    #[arg(long)]
    data: PathBuf,

    /// Name of the training split
    #[arg(long, default_value = "train")]
    train_split: String,

    /// Name of the test split
    #[arg(long, default_value = "test")]
    test_split: String,

    /// Number of images taken from the head of each split
    #[arg(long, default_value_t = 100)]
    sample_size: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ClassifierTrainerConfig::load(path)?,
        None => ClassifierTrainerConfig::default(),
    };
    info!("Trainer config:\n{}", serde_yaml::to_string(&config)?);

    let open = |split: &str| {
        let config =
            ImageFolderConfig::new(&args.data, split).sample_size(Some(args.sample_size));
        ImageFolder::open(&config)
    };
    let train = open(&args.train_split)?;
    let test = open(&args.test_split)?;

    let mut ctx = TrainingContext::build(&config, Box::new(train), Box::new(test))?;
    let mut trainer = ClassifierTrainer::build(config);
    let accuracy = trainer.train(&mut ctx, &mut NullRecorder::new())?;
    info!("Final test accuracy {:.3}", accuracy);

    Ok(())
}
