use criterion::{criterion_group, criterion_main, Criterion};
use ml::{BufferConfig, ExperienceBuffer, Transition};

fn filled(limit: usize, window_length: usize) -> ExperienceBuffer {
    let mut buffer = ExperienceBuffer::new(&BufferConfig { limit, window_length, allow_replacement: false })
        .expect("valid buffer config");
    for i in 0..limit * 2 {
        buffer.push(Transition {
            obs: vec![i as f32; 4],
            action: vec![0.0; 2],
            reward: 0.0,
            next_obs: vec![i as f32 + 1.0; 4],
            done: i % 200 == 199,
        });
    }
    buffer
}

fn bench_sample(c: &mut Criterion) {
    let buffer = filled(1000, 2);
    let mut rng = fastrand::Rng::with_seed(0);
    c.bench_function("sample_32_window_2", |b| {
        b.iter(|| buffer.sample(32, &mut rng).expect("enough data"));
    });
}

fn bench_push(c: &mut Criterion) {
    let mut buffer = filled(1000, 1);
    let t = Transition { obs: vec![0.0; 4], action: vec![0.0; 2], reward: 0.0, next_obs: vec![0.0; 4], done: false };
    c.bench_function("push_full", |b| b.iter(|| buffer.push(t.clone())));
}

criterion_group!(benches, bench_sample, bench_push);
criterion_main!(benches);
