use anyhow::Result;
use kestrel_core::{
    ExperienceBufferBase, KestrelError, ReplayBuffer, ReplayBufferBase, ReplayBufferConfig,
    Transition,
};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Frame {
    A,
    B,
    C,
    D,
}

fn step(state: Frame, action: usize) -> Transition<Frame> {
    Transition::new(state, action, None, 1.0)
}

#[test]
fn test_capacity_three_keeps_latest() -> Result<()> {
    let config = ReplayBufferConfig::default().capacity(3).seed(42);
    let mut buffer = ReplayBuffer::build(&config)?;

    for (i, frame) in [Frame::A, Frame::B, Frame::C, Frame::D].into_iter().enumerate() {
        buffer.push(step(frame, i));
    }

    let contents: Vec<Frame> = buffer.iter().map(|tr| tr.state().clone()).collect();
    assert_eq!(contents, vec![Frame::B, Frame::C, Frame::D]);

    let batch = buffer.sample(2)?;
    let sampled: HashSet<Frame> = batch.iter().map(|tr| tr.state().clone()).collect();
    assert_eq!(sampled.len(), 2);
    assert!(sampled.iter().all(|f| *f != Frame::A));

    match buffer.sample(4) {
        Err(KestrelError::InsufficientSamples {
            requested,
            available,
        }) => {
            assert_eq!(requested, 4);
            assert_eq!(available, 3);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_through_trait_seam() -> Result<()> {
    fn fill<B: ExperienceBufferBase<Item = Transition<u32>>>(buffer: &mut B) -> Result<()> {
        for s in 0..10 {
            buffer.push(Transition::new(s, 0, Some(s + 1), 0.0))?;
        }
        Ok(())
    }

    let config = ReplayBufferConfig::default().capacity(8);
    let mut buffer = <ReplayBuffer<u32> as ReplayBufferBase>::build(&config)?;
    fill(&mut buffer)?;
    assert_eq!(ExperienceBufferBase::len(&buffer), 8);

    let batch = ReplayBufferBase::batch(&mut buffer, 8)?;
    assert_eq!(batch.len(), 8);
    let err = ReplayBufferBase::batch(&mut buffer, 9).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KestrelError>(),
        Some(KestrelError::InsufficientSamples { .. })
    ));
    Ok(())
}

#[test]
fn test_terminal_transition() {
    let tr = Transition::new(vec![0f32; 4], 2, None, -1.0);
    assert!(tr.is_terminal());
    assert_eq!(tr.action(), 2);
    let (_, _, next_state, reward) = tr.into_parts();
    assert!(next_state.is_none());
    assert_eq!(reward, -1.0);
}
