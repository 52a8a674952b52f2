use std::collections::VecDeque;

/// The last `window_length` observations, as the agent sees them.
///
/// Matches the layout of [`crate::Experience::obs`]: frames stacked oldest
/// first. After [`reset`](Self::reset) the window is filled with copies of the
/// initial observation.
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: VecDeque<Vec<f32>>,
    window_length: usize,
}

impl FrameStack {
    #[must_use]
    pub fn new(window_length: usize) -> Self {
        let window_length = window_length.max(1);
        Self { frames: VecDeque::with_capacity(window_length), window_length }
    }

    pub fn reset(&mut self, initial: &[f32]) {
        self.frames.clear();
        for _ in 0..self.window_length {
            self.frames.push_back(initial.to_vec());
        }
    }

    pub fn push(&mut self, obs: &[f32]) {
        if self.frames.len() == self.window_length {
            self.frames.pop_front();
        }
        self.frames.push_back(obs.to_vec());
    }

    #[must_use]
    pub fn stacked(&self) -> Vec<f32> {
        self.frames.iter().flatten().copied().collect()
    }

    /// Most recent single observation.
    #[must_use]
    pub fn latest(&self) -> Option<&[f32]> {
        self.frames.back().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_repeats_initial_frame() {
        let mut stack = FrameStack::new(2);
        stack.reset(&[1.0, 2.0]);
        assert_eq!(stack.stacked(), vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn push_drops_oldest() {
        let mut stack = FrameStack::new(2);
        stack.reset(&[0.0]);
        stack.push(&[1.0]);
        stack.push(&[2.0]);
        assert_eq!(stack.stacked(), vec![1.0, 2.0]);
        assert_eq!(stack.latest(), Some(&[2.0][..]));
    }
}
