//! Fixed-step classical Runge-Kutta integration.
//!
//! The right-hand side writes `dy/dt` for state `y` into `out`. Scratch
//! buffers are owned by [`Rk4`] so repeated steps do not allocate.

/// Reusable RK4 stepper for systems of a fixed dimension.
#[derive(Debug, Clone)]
pub struct Rk4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    tmp: Vec<f64>,
}

impl Rk4 {
    /// Create a stepper for a system with `dim` state variables.
    pub fn new(dim: usize) -> Self {
        Rk4 {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            tmp: vec![0.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.k1.len()
    }

    /// Advance `y` in place by one step of size `h`.
    ///
    /// # Panics
    ///
    /// Panics if `y.len()` differs from the stepper dimension.
    pub fn step<F>(&mut self, rhs: &F, y: &mut [f64], h: f64)
    where
        F: Fn(&[f64], &mut [f64]),
    {
        assert_eq!(y.len(), self.dim(), "state dimension mismatch");

        rhs(y, &mut self.k1);

        for i in 0..y.len() {
            self.tmp[i] = y[i] + 0.5 * h * self.k1[i];
        }
        rhs(&self.tmp, &mut self.k2);

        for i in 0..y.len() {
            self.tmp[i] = y[i] + 0.5 * h * self.k2[i];
        }
        rhs(&self.tmp, &mut self.k3);

        for i in 0..y.len() {
            self.tmp[i] = y[i] + h * self.k3[i];
        }
        rhs(&self.tmp, &mut self.k4);

        for i in 0..y.len() {
            y[i] += h / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }
    }
}
