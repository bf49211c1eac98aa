use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};
use kestrel_candle_agent::{
    cnn::{Cnn, CnnConfig},
    dqn::{DqnModel, DqnModelConfig},
    opt::OptimizerConfig,
};
use kestrel_core::{ReplayBuffer, ReplayBufferConfig, Transition};

const N_ACTIONS: i64 = 4;
const BATCH_SIZE: usize = 8;
const GAMMA: f64 = 0.99;

fn frame(device: &Device) -> Result<Tensor> {
    Ok(Tensor::rand(0f32, 1f32, (4, 44, 44), device)?)
}

#[test]
fn test_gradient_step_from_sampled_batch() -> Result<()> {
    let device = Device::Cpu;
    let config = DqnModelConfig::default()
        .q_config(CnnConfig::new(4, N_ACTIONS))
        .opt_config(OptimizerConfig::Adam { lr: 1e-3 });
    let mut qnet = DqnModel::<Cnn>::build(config, device.clone())?;
    let target = qnet.try_clone()?;

    let mut buffer = ReplayBuffer::build(&ReplayBufferConfig::default().capacity(32))?;
    for i in 0..40 {
        let next = if i % 10 == 9 { None } else { Some(frame(&device)?) };
        buffer.push(Transition::new(frame(&device)?, i % N_ACTIONS as usize, next, 1.0));
    }
    assert_eq!(buffer.len(), 32);

    let batch = buffer.sample(BATCH_SIZE)?;
    let obs = Tensor::stack(&batch.iter().map(|t| t.state()).collect::<Vec<_>>(), 0)?;
    let act = Tensor::from_vec(
        batch.iter().map(|t| t.action() as u32).collect::<Vec<_>>(),
        (BATCH_SIZE, 1),
        &device,
    )?;
    let zeros = Tensor::zeros((4, 44, 44), DType::F32, &device)?;
    let next_obs = Tensor::stack(
        &batch
            .iter()
            .map(|t| t.next_state().unwrap_or(&zeros))
            .collect::<Vec<_>>(),
        0,
    )?;
    let not_done = Tensor::from_vec(
        batch
            .iter()
            .map(|t| if t.is_terminal() { 0f32 } else { 1f32 })
            .collect::<Vec<_>>(),
        (BATCH_SIZE,),
        &device,
    )?;
    let reward = Tensor::from_vec(
        batch.iter().map(|t| t.reward()).collect::<Vec<_>>(),
        (BATCH_SIZE,),
        &device,
    )?;

    let loss = |qnet: &DqnModel<Cnn>| -> Result<Tensor> {
        let q = qnet.forward(&obs)?.gather(&act, 1)?.squeeze(1)?;
        let q_next = target.forward(&next_obs)?.max(D::Minus1)?.detach();
        let y = (reward.clone() + ((q_next * not_done.clone())? * GAMMA)?)?;
        Ok((q - y)?.sqr()?.mean_all()?)
    };

    let before = loss(&qnet)?.to_scalar::<f32>()?;
    for _ in 0..20 {
        let l = loss(&qnet)?;
        qnet.backward_step(&l)?;
    }
    let after = loss(&qnet)?.to_scalar::<f32>()?;
    assert!(after < before, "loss did not decrease: {} -> {}", before, after);
    Ok(())
}
