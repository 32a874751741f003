//! Reconstruction filters for the sample accumulator.

use glint_core::RenderParams;

/// A separable 2D reconstruction kernel with finite support.
#[derive(Debug, Clone, Copy)]
pub enum Filter {
    Box { radius: f32 },
    Triangle { radius: f32 },
    Gauss { radius: f32, alpha: f32 },
    Mitchell { radius: f32, b: f32, c: f32 },
}

impl Default for Filter {
    /// Mitchell-Netravali with B = C = 1/3.
    fn default() -> Self {
        Filter::Mitchell {
            radius: 2.0,
            b: 1.0 / 3.0,
            c: 1.0 / 3.0,
        }
    }
}

impl Filter {
    /// Parse a `--filter` spec: a kernel name optionally followed by
    /// `.KEY=VALUE,...` options. Returns None for `none` (point
    /// sampling via a tiny box).
    pub fn from_spec(spec: &str) -> Result<Option<Filter>, String> {
        let (name, opts) = match spec.split_once('.') {
            Some((n, o)) => (n, o),
            None => (spec, ""),
        };
        let mut params = RenderParams::new();
        params.parse(opts)?;

        let filter = match name {
            "none" => return Ok(None),
            "box" => Filter::Box {
                radius: params.get_float("width,radius", 0.5),
            },
            "triangle" => Filter::Triangle {
                radius: params.get_float("width,radius", 2.0),
            },
            "gauss" => Filter::Gauss {
                radius: params.get_float("width,radius", 2.0),
                alpha: params.get_float("alpha", 2.0),
            },
            "mitchell" => Filter::Mitchell {
                radius: params.get_float("width,radius", 2.0),
                b: params.get_float("b", 1.0 / 3.0),
                c: params.get_float("c", 1.0 / 3.0),
            },
            other => return Err(format!("{other}: unknown output filter type")),
        };
        Ok(Some(filter))
    }

    /// Support radius in pixels; samples splat into every pixel whose
    /// center is within it.
    pub fn radius(&self) -> f32 {
        match self {
            Filter::Box { radius }
            | Filter::Triangle { radius }
            | Filter::Gauss { radius, .. }
            | Filter::Mitchell { radius, .. } => *radius,
        }
    }

    /// Kernel weight at offset `(x, y)` from the sample position.
    pub fn eval(&self, x: f32, y: f32) -> f32 {
        match self {
            Filter::Box { radius } => {
                if x.abs() <= *radius && y.abs() <= *radius {
                    1.0
                } else {
                    0.0
                }
            }
            Filter::Triangle { radius } => {
                (radius - x.abs()).max(0.0) * (radius - y.abs()).max(0.0)
            }
            Filter::Gauss { radius, alpha } => {
                gauss_1d(x, *radius, *alpha) * gauss_1d(y, *radius, *alpha)
            }
            Filter::Mitchell { radius, b, c } => {
                // The Mitchell kernel is defined on [-2, 2]; rescale the
                // support radius onto it.
                mitchell_1d(2.0 * x / radius, *b, *c) * mitchell_1d(2.0 * y / radius, *b, *c)
            }
        }
    }
}

fn gauss_1d(x: f32, radius: f32, alpha: f32) -> f32 {
    let tail = (-alpha * radius * radius).exp();
    ((-alpha * x * x).exp() - tail).max(0.0)
}

fn mitchell_1d(x: f32, b: f32, c: f32) -> f32 {
    let x = x.abs();
    let x2 = x * x;
    let x3 = x2 * x;
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x3
            + (-18.0 + 12.0 * b + 6.0 * c) * x2
            + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x3
            + (6.0 * b + 30.0 * c) * x2
            + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Riemann sum of the kernel over its support, normalized by its
    /// value as a discrete partition: sum over a dense lattice times the
    /// cell area approximates the continuous integral.
    fn integral(filter: &Filter) -> f32 {
        let r = filter.radius();
        let n = 200;
        let step = 2.0 * r / n as f32;
        let mut total = 0.0;
        for i in 0..n {
            let x = -r + (i as f32 + 0.5) * step;
            for j in 0..n {
                let y = -r + (j as f32 + 0.5) * step;
                total += filter.eval(x, y) * step * step;
            }
        }
        total
    }

    #[test]
    fn test_filters_have_positive_integral() {
        for filter in [
            Filter::Box { radius: 0.5 },
            Filter::Triangle { radius: 2.0 },
            Filter::Gauss {
                radius: 2.0,
                alpha: 2.0,
            },
            Filter::default(),
        ] {
            let integral = integral(&filter);
            assert!(integral > 0.1, "{filter:?} integrates to {integral}");
        }
    }

    #[test]
    fn test_box_integral_exact() {
        let b = Filter::Box { radius: 0.5 };
        assert!((integral(&b) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_mitchell_properties() {
        let m = Filter::default();
        // Peak at the center, zero at the support edge.
        assert!(m.eval(0.0, 0.0) > m.eval(0.5, 0.0));
        assert!(m.eval(2.0, 0.0).abs() < 1e-6);
        // The 1D kernel has small negative lobes.
        assert!(mitchell_1d(1.2, 1.0 / 3.0, 1.0 / 3.0) < 0.0);
        // And unit DC response: sum over integer offsets is 1.
        let sum: f32 = (-2..=2).map(|i| mitchell_1d(i as f32, 1.0 / 3.0, 1.0 / 3.0)).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_spec() {
        assert!(matches!(
            Filter::from_spec("mitchell").unwrap(),
            Some(Filter::Mitchell { .. })
        ));
        assert!(Filter::from_spec("none").unwrap().is_none());

        match Filter::from_spec("gauss.width=1.5,alpha=4").unwrap() {
            Some(Filter::Gauss { radius, alpha }) => {
                assert_eq!(radius, 1.5);
                assert_eq!(alpha, 4.0);
            }
            other => panic!("parsed {other:?}"),
        }

        assert!(Filter::from_spec("sinc").is_err());
    }
}
