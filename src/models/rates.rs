use serde::{Deserialize, Serialize};

/// Callers quote vital rates per ten thousand population.
pub const RATE_SCALE: f64 = 10_000.0;

/// Annual vital rates as fractions of population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalRates {
    pub birth: f64,
    pub death: f64,
    pub emigration: f64,
    pub immigration: f64,
}

impl VitalRates {
    /// Build rates from parts-per-ten-thousand figures.
    ///
    /// # Examples
    ///
    /// ```
    /// use population_forecaster::models::VitalRates;
    ///
    /// let rates = VitalRates::from_per_ten_thousand(2200.0, 700.0, 100.0, 50.0);
    /// assert!((rates.net_growth() - 0.145).abs() < 1e-12);
    /// ```
    pub fn from_per_ten_thousand(birth: f64, death: f64, emigration: f64, immigration: f64) -> Self {
        Self {
            birth: birth / RATE_SCALE,
            death: death / RATE_SCALE,
            emigration: emigration / RATE_SCALE,
            immigration: immigration / RATE_SCALE,
        }
    }

    /// Net annual growth fraction. May be negative.
    pub fn net_growth(&self) -> f64 {
        self.birth - self.death + self.immigration - self.emigration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        let r = VitalRates::from_per_ten_thousand(10_000.0, 0.0, 5_000.0, 2_500.0);
        assert_eq!(r.birth, 1.0);
        assert_eq!(r.emigration, 0.5);
        assert_eq!(r.immigration, 0.25);
    }

    #[test]
    fn test_negative_net_growth_allowed() {
        let r = VitalRates::from_per_ten_thousand(100.0, 300.0, 50.0, 0.0);
        assert!((r.net_growth() - -0.025).abs() < 1e-12);
    }
}
