//! Piecewise-constant sampling distributions, used for importance
//! sampling environment maps.

use glint_math::Vec2;

/// A 1D piecewise-constant distribution over `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Distribution1D {
    /// Unnormalized function values per cell.
    func: Vec<f32>,
    /// Cumulative distribution, `func.len() + 1` entries from 0 to 1.
    cdf: Vec<f32>,
    /// Integral of `func` over [0, 1).
    integral: f32,
}

impl Distribution1D {
    pub fn new(func: &[f32]) -> Self {
        let n = func.len().max(1);
        let func: Vec<f32> = if func.is_empty() {
            vec![1.0]
        } else {
            func.iter().map(|v| v.max(0.0)).collect()
        };

        let mut cdf = Vec::with_capacity(n + 1);
        cdf.push(0.0);
        for (i, f) in func.iter().enumerate() {
            cdf.push(cdf[i] + f / n as f32);
        }

        let integral = cdf[n];
        if integral > 0.0 {
            for c in cdf.iter_mut() {
                *c /= integral;
            }
        } else {
            // Degenerate all-zero function: fall back to uniform.
            for (i, c) in cdf.iter_mut().enumerate() {
                *c = i as f32 / n as f32;
            }
        }

        Self {
            func,
            cdf,
            integral,
        }
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Sample a continuous coordinate in `[0, 1)`.
    ///
    /// Returns `(x, pdf, cell)` where the pdf is relative to the uniform
    /// density on `[0, 1)`.
    pub fn sample(&self, u: f32) -> (f32, f32, usize) {
        let n = self.func.len();
        // Largest cdf entry <= u.
        let cell = match self
            .cdf
            .partition_point(|c| *c <= u)
        {
            0 => 0,
            i => (i - 1).min(n - 1),
        };

        let lo = self.cdf[cell];
        let hi = self.cdf[cell + 1];
        let frac = if hi > lo { (u - lo) / (hi - lo) } else { 0.0 };

        let x = (cell as f32 + frac) / n as f32;
        (x.min(1.0 - f32::EPSILON), self.pdf_at(cell), cell)
    }

    /// Density (relative to uniform) of the cell containing `x`.
    pub fn pdf(&self, x: f32) -> f32 {
        let n = self.func.len();
        let cell = ((x * n as f32) as usize).min(n - 1);
        self.pdf_at(cell)
    }

    fn pdf_at(&self, cell: usize) -> f32 {
        if self.integral > 0.0 {
            self.func[cell] / self.integral
        } else {
            1.0
        }
    }
}

/// A 2D piecewise-constant distribution over `[0, 1)^2`: a marginal over
/// rows, pre-integrated per row, and one conditional distribution per
/// row over columns.
#[derive(Debug, Clone)]
pub struct Distribution2D {
    conditional: Vec<Distribution1D>,
    marginal: Distribution1D,
}

impl Distribution2D {
    /// Build from row-major weights (`rows` slices of equal length).
    pub fn new(rows: &[Vec<f32>]) -> Self {
        let conditional: Vec<Distribution1D> =
            rows.iter().map(|r| Distribution1D::new(r)).collect();
        let row_integrals: Vec<f32> =
            conditional.iter().map(|d| d.integral()).collect();
        let marginal = Distribution1D::new(&row_integrals);
        Self {
            conditional,
            marginal,
        }
    }

    /// Sample a point in `[0, 1)^2`; the pdf is relative to the uniform
    /// density on the unit square.
    pub fn sample(&self, u: Vec2) -> (Vec2, f32) {
        let (y, pdf_y, row) = self.marginal.sample(u.y);
        let (x, pdf_x, _) = self.conditional[row].sample(u.x);
        (Vec2::new(x, y), pdf_x * pdf_y)
    }

    /// Density at a point in `[0, 1)^2`.
    pub fn pdf(&self, p: Vec2) -> f32 {
        let rows = self.conditional.len();
        let row = ((p.y * rows as f32) as usize).min(rows - 1);
        self.marginal.pdf(p.y) * self.conditional[row].pdf(p.x)
    }
}
