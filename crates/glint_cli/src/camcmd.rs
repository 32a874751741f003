//! The camera-command mini-language.
//!
//! A comma-separated command list: `g POS` move-to, `t POS` target-to,
//! `z FLOAT` zoom, `m {u|d|l|r|f|b|x|y|z} DIST` move-along,
//! `r AXIS ANGLE` rotate, `o AXIS ANGLE` orbit around the target.
//! Positions are written `(x,y,z)`; angles are in degrees.

use std::iter::Peekable;
use std::str::Chars;

use glint_math::{Quat, Vec3};
use glint_renderer::Camera;

/// Apply a command string to `camera`; errors name the offending spot.
pub fn apply(camera: &mut Camera, cmds: &str) -> Result<(), String> {
    let mut p = Parser::new(cmds);
    p.skip_ws();
    while !p.at_end() {
        let cmd = p.require("gtzmro", "command")?;
        match cmd {
            'g' => {
                let pos = p.read_pos()?;
                camera.move_to(pos);
            }
            't' => {
                let target = p.read_pos()?;
                camera.point(target);
            }
            'z' => {
                let factor = p.read_float("zoom factor")?;
                camera.zoom(factor);
            }
            'm' => {
                let dir = p.require("udlrfbxyz", "movement direction/axis")?;
                let dist = p.read_float("movement distance")?;
                let offset = match dir {
                    'u' => camera.up * dist,
                    'd' => -camera.up * dist,
                    'l' => -camera.right * dist,
                    'r' => camera.right * dist,
                    'f' => camera.forward * dist,
                    'b' => -camera.forward * dist,
                    'x' => Vec3::new(dist, 0.0, 0.0),
                    'y' => Vec3::new(0.0, dist, 0.0),
                    _ => Vec3::new(0.0, 0.0, dist),
                };
                camera.move_by(offset);
            }
            'r' => {
                let rot = p.read_rotation(camera)?;
                camera.rotate(rot);
            }
            'o' => {
                let rot = p.read_rotation(camera)?;
                camera.orbit(rot.inverse());
            }
            _ => unreachable!(),
        }
        p.eat(",;/");
        p.skip_ws();
    }
    Ok(())
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            chars: s.chars().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.chars.peek().is_none()
    }

    /// Consume one of `choices` if present.
    fn eat(&mut self, choices: &str) -> Option<char> {
        self.skip_ws();
        match self.chars.peek() {
            Some(&c) if choices.contains(c) => {
                self.chars.next();
                Some(c)
            }
            _ => None,
        }
    }

    /// Consume one of `choices`, or fail naming what was expected.
    fn require(&mut self, choices: &str, desc: &str) -> Result<char, String> {
        self.eat(choices).ok_or_else(|| {
            let found = self
                .chars
                .peek()
                .map(|c| format!("`{c}'"))
                .unwrap_or_else(|| "end of input".to_string());
            let want: Vec<String> = choices.chars().map(|c| format!("`{c}'")).collect();
            format!("invalid {desc} {found}; expected one of {}", want.join(", "))
        })
    }

    fn read_float(&mut self, desc: &str) -> Result<f32, String> {
        self.skip_ws();
        let mut text = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()
            || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            text.push(self.chars.next().unwrap());
        }
        text.parse()
            .map_err(|_| format!("missing/invalid {desc}"))
    }

    fn read_angle(&mut self, desc: &str) -> Result<f32, String> {
        Ok(self.read_float(desc)?.to_radians())
    }

    /// `(x,y,z)` with any of `(<[{` as the bracket (or none).
    fn read_pos(&mut self) -> Result<Vec3, String> {
        let open = self.eat("(<[{");
        let x = self.read_float("x coord")?;
        self.require(",", "comma")?;
        let y = self.read_float("y coord")?;
        self.require(",", "comma")?;
        let z = self.read_float("z coord")?;
        if let Some(open) = open {
            let close = match open {
                '(' => ")",
                '<' => ">",
                '[' => "]",
                _ => "}",
            };
            self.require(close, "close bracket")?;
        }
        Ok(Vec3::new(x, y, z))
    }

    /// An axis letter plus an angle, as a rotation about a camera or
    /// world axis.
    fn read_rotation(&mut self, camera: &Camera) -> Result<Quat, String> {
        let axis = self.require("udlraxyz", "direction/axis")?;
        let angle = self.read_angle("angle")?;
        let (axis, angle) = match axis {
            'u' => (camera.right, -angle),
            'd' => (camera.right, angle),
            'l' => (camera.up, -angle),
            'r' => (camera.up, angle),
            'a' => (camera.forward, angle),
            'x' => (Vec3::X, angle),
            'y' => (Vec3::Y, angle),
            _ => (Vec3::Z, angle),
        };
        Ok(Quat::from_axis_angle(axis.normalize(), angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_and_target() {
        let mut camera = Camera::new();
        apply(&mut camera, "g (1,2,5), t (1,2,0)").unwrap();

        assert_eq!(camera.pos, Vec3::new(1.0, 2.0, 5.0));
        assert!((camera.forward - -Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_move_along_axes() {
        let mut camera = Camera::new();
        apply(&mut camera, "m x 2, m y 3, m z -1").unwrap();
        assert_eq!(camera.pos, Vec3::new(2.0, 3.0, -1.0));

        // Camera-relative moves use the current basis.
        apply(&mut camera, "m f 5").unwrap();
        assert_eq!(camera.pos, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_zoom_and_orbit() {
        let mut camera = Camera::new();
        apply(&mut camera, "g (0,0,5), t (0,0,0), z 2, o y 90").unwrap();
        // Orbit keeps the distance to the target.
        assert!((camera.pos.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_bracket_styles() {
        for cmds in ["g (1,1,1)", "g <1,1,1>", "g [1,1,1]", "g {1,1,1}", "g 1,1,1"] {
            let mut camera = Camera::new();
            apply(&mut camera, cmds).unwrap();
            assert_eq!(camera.pos, Vec3::ONE, "parsing {cmds:?}");
        }
    }

    #[test]
    fn test_errors_name_the_problem() {
        let mut camera = Camera::new();

        let err = apply(&mut camera, "q 1").unwrap_err();
        assert!(err.contains("command"), "{err}");

        let err = apply(&mut camera, "m q 1").unwrap_err();
        assert!(err.contains("movement direction"), "{err}");

        let err = apply(&mut camera, "g (1,2").unwrap_err();
        assert!(err.contains("close bracket") || err.contains("comma"), "{err}");

        let err = apply(&mut camera, "z").unwrap_err();
        assert!(err.contains("zoom factor"), "{err}");
    }
}
