use crate::error::PhysicsError;

/// Generalized coordinates followed by generalized velocities.
///
/// For an `n`-link chain the backing vector has `2 * n` entries: joint
/// angles `q_0..q_{n-1}` then angular velocities `u_0..u_{n-1}`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkState {
    values: Vec<f32>,
}

impl LinkState {
    /// Builds a state from a flat `[q.., u..]` vector.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::DimensionMismatch`] for odd-length input and
    /// [`PhysicsError::NonFiniteState`] if any entry is NaN or infinite.
    pub fn from_vec(values: Vec<f32>) -> Result<Self, PhysicsError> {
        if values.is_empty() || values.len() % 2 != 0 {
            return Err(PhysicsError::DimensionMismatch {
                what: "state",
                expected: 2 * (values.len() / 2).max(1),
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::NonFiniteState);
        }
        Ok(Self { values })
    }

    /// A chain at rest with every angle set to zero.
    #[must_use]
    pub fn zeros(n_links: usize) -> Self {
        Self { values: vec![0.0; 2 * n_links] }
    }

    #[must_use]
    pub fn n_links(&self) -> usize {
        self.values.len() / 2
    }

    /// Joint angles.
    #[must_use]
    pub fn q(&self) -> &[f32] {
        &self.values[..self.n_links()]
    }

    /// Joint angular velocities.
    #[must_use]
    pub fn u(&self) -> &[f32] {
        &self.values[self.n_links()..]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// `self + scale * rate`, element-wise. Used by the integrators.
    pub(crate) fn offset(&self, rate: &[f32], scale: f32) -> Self {
        let values = self
            .values
            .iter()
            .zip(rate)
            .map(|(x, dx)| x + scale * dx)
            .collect();
        Self { values }
    }
}

/// Physical constants of the chain: `[g, l_0, m_0, l_1, m_1, ...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkParams {
    pub gravity: f32,
    pub lengths: Vec<f32>,
    pub masses: Vec<f32>,
}

impl LinkParams {
    /// Unpacks the flat parameter vector used in configuration files.
    ///
    /// # Errors
    ///
    /// Fails if the vector does not hold `1 + 2 * n_links` finite values, or
    /// if any length or mass is not strictly positive.
    pub fn from_values(n_links: usize, values: &[f32]) -> Result<Self, PhysicsError> {
        let expected = 1 + 2 * n_links;
        if n_links == 0 || values.len() != expected {
            return Err(PhysicsError::DimensionMismatch {
                what: "parameter vector",
                expected,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidParameter("parameters must be finite".into()));
        }
        let gravity = values[0];
        let mut lengths = Vec::with_capacity(n_links);
        let mut masses = Vec::with_capacity(n_links);
        for (i, pair) in values[1..].chunks_exact(2).enumerate() {
            if pair[0] <= 0.0 {
                return Err(PhysicsError::InvalidParameter(format!(
                    "length of link {i} must be positive, got {}",
                    pair[0]
                )));
            }
            if pair[1] <= 0.0 {
                return Err(PhysicsError::InvalidParameter(format!(
                    "mass of link {i} must be positive, got {}",
                    pair[1]
                )));
            }
            lengths.push(pair[0]);
            masses.push(pair[1]);
        }
        Ok(Self { gravity, lengths, masses })
    }

    #[must_use]
    pub fn n_links(&self) -> usize {
        self.lengths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_unpack_pairs() {
        let p = LinkParams::from_values(2, &[9.81, 0.4, 1.0, 0.5, 2.0]).unwrap();
        assert_eq!(p.gravity, 9.81);
        assert_eq!(p.lengths, vec![0.4, 0.5]);
        assert_eq!(p.masses, vec![1.0, 2.0]);
    }

    #[test]
    fn params_reject_wrong_length_and_non_positive_mass() {
        assert!(LinkParams::from_values(2, &[9.81, 0.4, 1.0]).is_err());
        assert!(LinkParams::from_values(1, &[9.81, 0.4, 0.0]).is_err());
        assert!(LinkParams::from_values(1, &[9.81, -0.4, 1.0]).is_err());
    }

    #[test]
    fn state_rejects_nan() {
        assert!(LinkState::from_vec(vec![0.0, f32::NAN]).is_err());
        assert!(LinkState::from_vec(vec![0.0, 1.0, 2.0]).is_err());
    }
}
