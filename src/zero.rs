/// Bounded one-dimensional search over a closed interval.
///
/// Higher-level solvers (speed-to-fly optimisation, best-MC search, cruise
/// efficiency, isoline crossings) all reduce to finding a root or a minimum
/// of a scalar objective over a known domain. Both searches here are capped
/// at a fixed iteration budget so a single aircraft-state update can never
/// stall the calculation thread, and both always return the best abscissa
/// sampled so far -- the caller decides whether that answer is acceptable.
#[derive(Debug, Clone, Copy)]
pub struct ZeroFinder {
    xmin: f64,
    xmax: f64,
    tolerance: f64,
}

const MAX_ITERATIONS: usize = 100;

/// Golden section ratio, `(3 - sqrt(5)) / 2`.
const GOLDEN: f64 = 0.381_966_011_250_105_2;

impl ZeroFinder {
    /// Search domain `[xmin, xmax]` with the given x tolerance.
    ///
    /// `xmin < xmax` and a positive tolerance are expected; the bounds are
    /// swapped and the tolerance floored rather than rejected, since every
    /// caller in the engine constructs these from compile-time constants.
    #[must_use]
    pub fn new(xmin: f64, xmax: f64, tolerance: f64) -> Self {
        let (xmin, xmax) = if xmin <= xmax { (xmin, xmax) } else { (xmax, xmin) };
        Self {
            xmin,
            xmax,
            tolerance: tolerance.max(f64::EPSILON),
        }
    }

    /// Finds the x minimizing `f` over the domain by golden-section search.
    ///
    /// Converges to the global minimum for unimodal objectives; for anything
    /// else it still terminates within the iteration budget and returns a
    /// local minimizer.
    #[must_use]
    pub fn find_min(&self, mut f: impl FnMut(f64) -> f64) -> f64 {
        let mut a = self.xmin;
        let mut b = self.xmax;
        let mut x1 = a + GOLDEN * (b - a);
        let mut x2 = b - GOLDEN * (b - a);
        let mut f1 = f(x1);
        let mut f2 = f(x2);

        for _ in 0..MAX_ITERATIONS {
            if (b - a).abs() <= self.tolerance {
                break;
            }
            if f1 < f2 {
                b = x2;
                x2 = x1;
                f2 = f1;
                x1 = a + GOLDEN * (b - a);
                f1 = f(x1);
            } else {
                a = x1;
                x1 = x2;
                f1 = f2;
                x2 = b - GOLDEN * (b - a);
                f2 = f(x2);
            }
        }

        if f1 < f2 {
            x1
        } else {
            x2
        }
    }

    /// Finds an x where `f` crosses zero, by bisection with a secant
    /// (false-position) refinement step.
    ///
    /// If `f` has the same sign at both domain ends there is nothing to
    /// bracket; the end with the smaller magnitude is returned and the caller
    /// must validate the result before using it.
    #[must_use]
    pub fn find_zero(&self, mut f: impl FnMut(f64) -> f64) -> f64 {
        let mut a = self.xmin;
        let mut b = self.xmax;
        let mut fa = f(a);
        let mut fb = f(b);

        if fa == 0.0 {
            return a;
        }
        if fb == 0.0 {
            return b;
        }
        if fa.signum() == fb.signum() {
            // no bracket; best-effort answer
            return if fa.abs() < fb.abs() { a } else { b };
        }

        for _ in 0..MAX_ITERATIONS {
            if (b - a).abs() <= self.tolerance {
                break;
            }

            // secant candidate, falling back to the midpoint when it is
            // outside the bracket or numerically useless
            let mut x = if (fb - fa).abs() > f64::EPSILON {
                b - fb * (b - a) / (fb - fa)
            } else {
                (a + b) / 2.
            };
            let mid = (a + b) / 2.;
            if !(a..=b).contains(&x) || (x - mid).abs() > (b - a) / 2. {
                x = mid;
            }
            // keep the step from collapsing against a bracket end
            let tol = self.tolerance / 2.;
            x = x.clamp(a + tol, b - tol);

            let fx = f(x);
            if fx == 0.0 {
                return x;
            }
            if fx.signum() == fa.signum() {
                a = x;
                fa = fx;
            } else {
                b = x;
                fb = fx;
            }
        }

        if fa.abs() < fb.abs() {
            a
        } else {
            b
        }
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
