use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use qlearn_candle_agent::{
    cnn::{Cnn, CnnConfig},
    dqn::{DqnModel, DqnModelConfig, DqnTrainerConfig, EpsilonGreedy, OffPolicyTrainer, OnPolicyTrainer},
    filter::{AddBatchDim, FrameStack, Scale},
    mlp::{Mlp, MlpConfig},
    opt::OptimizerConfig,
    runner::{Runner, RunnerConfig},
    TensorReplayBuffer,
};
use qlearn_core::{
    filter::{FilterChain, FilteredEnv},
    record::BufferedRecorder,
    replay_buffer::{EvictionPolicy, SimpleReplayBufferConfig},
    Env, ExperienceBufferBase, ReplayBufferBase, Step,
};

const CORRIDOR_LEN: usize = 6;
const N_ACTIONS: usize = 2;
const REPLAY_BUFFER_CAPACITY: usize = 50;
const BATCH_SIZE: usize = 8;
const MAX_EPISODES: usize = 20;
const MAX_STEPS_PER_EPISODE: usize = 30;

/// The agent starts at the left end of a corridor and gets a reward at the
/// right end. Observations are one-hot positions without a batch dimension.
struct Corridor {
    len: usize,
    pos: usize,
}

impl Corridor {
    fn obs(&self) -> Result<Tensor> {
        let mut v = vec![0f32; self.len];
        v[self.pos] = 1.0;
        Ok(Tensor::from_vec(v, self.len, &Device::Cpu)?)
    }
}

impl Env for Corridor {
    type Config = usize;
    type Obs = Tensor;
    type Act = Tensor;

    fn build(config: &usize, _seed: i64) -> Result<Self> {
        Ok(Self {
            len: *config,
            pos: 0,
        })
    }

    fn reset(&mut self) -> Result<Tensor> {
        self.pos = 0;
        self.obs()
    }

    fn step(&mut self, a: &Tensor) -> Result<Step<Self>> {
        let a = a.flatten_all()?.to_vec1::<i64>()?[0];
        self.pos = match a {
            0 => self.pos.saturating_sub(1),
            _ => (self.pos + 1).min(self.len - 1),
        };
        let is_done = self.pos == self.len - 1;
        let reward = if is_done { 1.0 } else { -0.01 };
        Ok(Step::new(self.obs()?, reward, is_done))
    }

    fn size(&self) -> (Vec<usize>, usize) {
        (vec![self.len], N_ACTIONS)
    }
}

/// Same corridor rendered as a 12x12 single-channel image.
struct ImageCorridor {
    inner: Corridor,
}

impl ImageCorridor {
    fn render(&self) -> Result<Tensor> {
        let mut v = vec![0f32; 144];
        for row in 0..12 {
            v[row * 12 + 2 * self.inner.pos] = 255.0;
        }
        Ok(Tensor::from_vec(v, (1, 1, 12, 12), &Device::Cpu)?)
    }
}

impl Env for ImageCorridor {
    type Config = usize;
    type Obs = Tensor;
    type Act = Tensor;

    fn build(config: &usize, seed: i64) -> Result<Self> {
        Ok(Self {
            inner: Corridor::build(config, seed)?,
        })
    }

    fn reset(&mut self) -> Result<Tensor> {
        self.inner.reset()?;
        self.render()
    }

    fn step(&mut self, a: &Tensor) -> Result<Step<Self>> {
        let step = self.inner.step(a)?;
        Ok(Step::new(self.render()?, step.reward, step.is_done))
    }

    fn size(&self) -> (Vec<usize>, usize) {
        (vec![1, 1, 12, 12], N_ACTIONS)
    }
}

fn create_env() -> Result<FilteredEnv<Corridor>> {
    let env = Corridor::build(&CORRIDOR_LEN, 0)?;
    Ok(FilteredEnv::new(env, FilterChain::new().push(AddBatchDim)))
}

fn create_qnet(in_dim: usize) -> Result<DqnModel<Mlp>> {
    let config = DqnModelConfig::default()
        .q_config(MlpConfig::new(in_dim, vec![32, 32], N_ACTIONS, false))
        .opt_config(OptimizerConfig::Adam { lr: 0.001 });
    DqnModel::build(config, Device::Cpu)
}

fn create_buffer(eviction: EvictionPolicy) -> Result<TensorReplayBuffer> {
    let config = SimpleReplayBufferConfig::default()
        .capacity(REPLAY_BUFFER_CAPACITY)
        .seed(1)
        .eviction(eviction);
    TensorReplayBuffer::build(&config)
}

fn trainer_config() -> DqnTrainerConfig {
    DqnTrainerConfig::default()
        .batch_size(BATCH_SIZE)
        .discount_factor(0.9)
        .steps_per_update(2)
        .swap_interval(10)
}

fn runner_config() -> RunnerConfig {
    RunnerConfig::default()
        .max_episodes(MAX_EPISODES)
        .max_steps_per_episode(MAX_STEPS_PER_EPISODE)
        .record_interval(1)
        .mean_window(5)
}

#[test]
fn test_dqn_corridor_off_policy() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut env = create_env()?;
    let (shape, n_actions) = env.size();
    assert_eq!(shape, vec![1, CORRIDOR_LEN]);
    assert_eq!(n_actions, N_ACTIONS);

    let mut qnet = create_qnet(shape[1])?;
    let mut buffer = create_buffer(EvictionPolicy::Fifo)?;
    let mut explorer = EpsilonGreedy::new(1.0, 0.1, 200);
    let mut trainer = OffPolicyTrainer::off_policy(trainer_config())?;
    let mut recorder = BufferedRecorder::new();
    let mut runner = Runner::build(runner_config())?;

    let stats = runner.run(
        &mut env,
        &mut qnet,
        &mut explorer,
        &mut trainer,
        &mut buffer,
        &mut recorder,
    )?;

    let total_steps = trainer.steps();
    assert!(total_steps >= MAX_EPISODES * (CORRIDOR_LEN - 1));
    assert_eq!(explorer.counter(), total_steps);
    assert_eq!(buffer.len(), total_steps.min(REPLAY_BUFFER_CAPACITY));
    assert!(trainer.n_updates() > 0);
    assert!(trainer.n_updates() <= total_steps / 2);
    assert_eq!(stats.n_episodes(), MAX_EPISODES);

    assert_eq!(recorder.len(), MAX_EPISODES);
    for (i, record) in recorder.iter().enumerate() {
        assert!(record.get_scalar("episode_loss")?.is_finite());
        assert!(record.get_scalar("episode_steps")? <= MAX_STEPS_PER_EPISODE as f32);
        assert!((0.1..=1.0).contains(&record.get_scalar("epsilon")?));
        let recent = record.get_array1("recent_rewards")?;
        assert_eq!(recent.len(), (i + 1).min(5));
        assert_eq!(recent.last(), Some(&record.get_scalar("episode_reward")?));
    }

    // The batch used by the trainer is a copy of stored rows
    let batch = buffer.batch(BATCH_SIZE)?;
    let obs = batch.obs.into_tensor()?;
    assert_eq!(obs.dims(), &[BATCH_SIZE, CORRIDOR_LEN]);
    let row_sums: Vec<f32> = obs.sum(1)?.to_vec1()?;
    assert!(row_sums.iter().all(|&s| s == 1.0));
    Ok(())
}

#[test]
fn test_dqn_corridor_on_policy_random_eviction() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut env = create_env()?;
    let mut qnet = create_qnet(CORRIDOR_LEN)?;
    let mut buffer = create_buffer(EvictionPolicy::Random)?;
    let mut explorer = EpsilonGreedy::new(1.0, 0.1, 200);
    let mut trainer = OnPolicyTrainer::on_policy(trainer_config())?;
    let mut recorder = BufferedRecorder::new();
    let mut runner = Runner::build(runner_config().record_interval(5))?;

    runner.run(
        &mut env,
        &mut qnet,
        &mut explorer,
        &mut trainer,
        &mut buffer,
        &mut recorder,
    )?;

    assert_eq!(buffer.len(), REPLAY_BUFFER_CAPACITY);
    assert_eq!(recorder.len(), MAX_EPISODES / 5);
    Ok(())
}

#[test]
fn test_dqn_image_corridor_with_frame_stack() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let n_stack = 2;

    let chain = FilterChain::new()
        .push(Scale::new(1.0 / 255.0))
        .push(FrameStack::new(n_stack)?);
    let mut env = FilteredEnv::new(ImageCorridor::build(&CORRIDOR_LEN, 0)?, chain);
    let (shape, n_actions) = env.size();
    assert_eq!(shape, vec![1, n_stack, 12, 12]);

    let q_config = CnnConfig::new(shape[1], shape[2], shape[3], n_actions).channels(vec![8]);
    let config = DqnModelConfig::default()
        .q_config(q_config)
        .opt_config(OptimizerConfig::Adam { lr: 0.001 });
    let mut qnet = DqnModel::<Cnn>::build(config, Device::Cpu)?;
    let mut buffer = create_buffer(EvictionPolicy::Fifo)?;
    let mut explorer = EpsilonGreedy::new(1.0, 0.1, 100);
    let mut trainer = OffPolicyTrainer::off_policy(trainer_config())?;
    let mut recorder = BufferedRecorder::new();
    let mut runner = Runner::build(runner_config().max_episodes(3))?;

    runner.run(
        &mut env,
        &mut qnet,
        &mut explorer,
        &mut trainer,
        &mut buffer,
        &mut recorder,
    )?;

    let batch = buffer.batch(4)?;
    let obs = batch.obs.into_tensor()?;
    assert_eq!(obs.dims(), &[4, n_stack, 12, 12]);
    assert_eq!(obs.dtype(), DType::F32);
    assert!(trainer.n_updates() > 0);
    Ok(())
}
