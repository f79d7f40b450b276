/// Rolling mean over the last `window` values using a ring buffer.
///
/// Emits from the very first sample (partial windows average what is there),
/// matching how the training data's moving averages were computed.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    buffer: Vec<f64>,
    head: usize,
    count: usize,
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "rolling window must be > 0");
        Self {
            window,
            buffer: vec![0.0; window],
            head: 0,
            count: 0,
            sum: 0.0,
        }
    }

    /// Push a value, return the mean over the values currently in the window.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.count >= self.window {
            self.sum -= self.buffer[self.head];
        }
        self.buffer[self.head] = value;
        self.sum += value;
        self.head = (self.head + 1) % self.window;
        if self.count < self.window {
            self.count += 1;
        }
        self.sum / self.count as f64
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Rolling sample standard deviation (ddof = 1) over the last `window`
/// values. Returns 0.0 until two samples exist.
#[derive(Debug, Clone)]
pub struct RollingStd {
    window: usize,
    buffer: Vec<f64>,
    head: usize,
    count: usize,
}

impl RollingStd {
    pub fn new(window: usize) -> Self {
        assert!(window > 1, "std window must be > 1");
        Self {
            window,
            buffer: vec![0.0; window],
            head: 0,
            count: 0,
        }
    }

    /// Push a value, return the sample std over the values currently held.
    pub fn push(&mut self, value: f64) -> f64 {
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % self.window;
        if self.count < self.window {
            self.count += 1;
        }

        if self.count < 2 {
            return 0.0;
        }
        let held = &self.buffer[..self.count];
        let mean = held.iter().sum::<f64>() / self.count as f64;
        let var = held.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / (self.count - 1) as f64;
        var.max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_emits_from_first_sample() {
        let mut m = RollingMean::new(3);
        assert!((m.push(4.0) - 4.0).abs() < f64::EPSILON);
        assert!((m.push(8.0) - 6.0).abs() < f64::EPSILON);
        assert!((m.push(0.0) - 4.0).abs() < f64::EPSILON);
        // window full, oldest value drops out
        assert!((m.push(10.0) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_matches_naive_over_long_series() {
        let mut m = RollingMean::new(7);
        let mut naive: Vec<f64> = Vec::new();
        for i in 0..5_000u64 {
            let v = (i as f64) * 0.3 - 11.0;
            let ring = m.push(v);
            naive.push(v);
            if naive.len() > 7 {
                naive.remove(0);
            }
            let expect = naive.iter().sum::<f64>() / naive.len() as f64;
            assert!((ring - expect).abs() < 1e-8, "drift at i={i}");
        }
    }

    #[test]
    fn std_is_zero_until_two_samples() {
        let mut s = RollingStd::new(24);
        assert!((s.push(0.5) - 0.0).abs() < f64::EPSILON);
        assert!(s.push(1.5) > 0.0);
    }

    #[test]
    fn std_matches_sample_formula() {
        let mut s = RollingStd::new(3);
        s.push(2.0);
        s.push(4.0);
        let got = s.push(6.0);
        // mean 4, squared deviations 4 + 0 + 4, ddof 1 -> var 4, std 2
        assert!((got - 2.0).abs() < 1e-12);
        // window slides, evenly spaced values keep std at 2
        let got = s.push(8.0);
        assert!((got - 2.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "rolling window must be > 0")]
    fn zero_window_panics() {
        RollingMean::new(0);
    }
}
