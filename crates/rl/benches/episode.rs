use criterion::{criterion_group, criterion_main, Criterion};
use ml::{Env, LinearAgent, LinearAgentConfig, LinkageEnv};
use rl::{CheckpointConfig, TrainConfig, Trainer};

fn bench_episode(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = TrainConfig {
        run_id: Some("bench".into()),
        episodes: usize::MAX,
        max_total_steps: None,
        checkpoint: CheckpointConfig {
            every_episodes: None,
            every_steps: None,
            model_dir: dir.path().join("models"),
            results_dir: dir.path().join("results"),
        },
        ..TrainConfig::default()
    };
    let env = LinkageEnv::new(config.env.clone(), None).expect("valid env");
    let obs_dim = env.obs_size() * config.buffer.window_length;
    let agent = LinearAgent::new(obs_dim, env.action_size(), LinearAgentConfig::default());
    let mut trainer = Trainer::new(config, env, agent).expect("valid config");
    c.bench_function("episode_200_steps", |b| b.iter(|| trainer.run_episode()));
}

criterion_group!(benches, bench_episode);
criterion_main!(benches);
