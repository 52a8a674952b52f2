/// Adam over flat parameter slices, with optional global-norm gradient
/// clipping.
#[derive(Clone, Debug)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    clip_norm: Option<f32>,
    t: u32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
}

impl Adam {
    /// One moment buffer per parameter group, sized by `sizes`.
    #[must_use]
    pub fn new(sizes: &[usize], lr: f32, clip_norm: Option<f32>) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            clip_norm,
            t: 0,
            m: sizes.iter().map(|&n| vec![0.0; n]).collect(),
            v: sizes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Apply one update. `grads[i]` must have the shape of `params[i]`.
    pub fn step(&mut self, params: &mut [&mut [f32]], grads: &[&[f32]]) {
        debug_assert_eq!(params.len(), grads.len());
        self.t += 1;
        let t = i32::try_from(self.t).unwrap_or(i32::MAX);
        let lr_t = self.lr * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));

        let norm = grads.iter().flat_map(|g| g.iter()).map(|g| g * g).sum::<f32>().sqrt();
        let scale = match self.clip_norm {
            Some(max) if norm > max && norm > 0.0 => max / norm,
            _ => 1.0,
        };

        for (i, p) in params.iter_mut().enumerate() {
            let grad = grads[i];
            for j in 0..p.len() {
                let g = grad[j] * scale;
                self.m[i][j] = self.beta1 * self.m[i][j] + (1.0 - self.beta1) * g;
                self.v[i][j] = self.beta2 * self.v[i][j] + (1.0 - self.beta2) * g.powi(2);
                p[j] -= lr_t * self.m[i][j] / (self.v[i][j].sqrt() + self.eps);
            }
        }
    }
}
