//! Interpolation kernels for stacked band outlines.
//!
//! Each kernel is a small state machine fed one point at a time, matching the classic
//! d3-shape curve family so paths look the same as in browser renderings.

use crate::error::{ConfigError, ConfigResult};
use crate::surface::fmt_num;
use std::fmt;
use std::str::FromStr;

const EPSILON: f64 = 1e-12;

pub const DEFAULT_CARDINAL_TENSION: f64 = 0.0;
pub const DEFAULT_CATMULL_ROM_ALPHA: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Curve {
    Basis,
    Cardinal { tension: f64 },
    CatmullRom { alpha: f64 },
    #[default]
    Linear,
    MonotoneX,
    MonotoneY,
    Step,
    StepAfter,
    StepBefore,
}

impl Curve {
    /// Resolves a curve name plus its optional parameters.
    ///
    /// Names are accepted in both camelCase (`catmullRom`) and kebab-case (`catmull-rom`).
    pub fn from_name(name: &str, tension: Option<f64>, alpha: Option<f64>) -> ConfigResult<Self> {
        let curve = match name.trim() {
            "basis" => Curve::Basis,
            "cardinal" => Curve::Cardinal {
                tension: tension.unwrap_or(DEFAULT_CARDINAL_TENSION),
            },
            "catmullRom" | "catmull-rom" => Curve::CatmullRom {
                alpha: alpha.unwrap_or(DEFAULT_CATMULL_ROM_ALPHA),
            },
            "linear" => Curve::Linear,
            "monotoneX" | "monotone-x" => Curve::MonotoneX,
            "monotoneY" | "monotone-y" => Curve::MonotoneY,
            "step" => Curve::Step,
            "stepAfter" | "step-after" => Curve::StepAfter,
            "stepBefore" | "step-before" => Curve::StepBefore,
            other => return Err(ConfigError::UnknownCurve(other.to_string())),
        };
        Ok(curve)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Curve::Basis => "basis",
            Curve::Cardinal { .. } => "cardinal",
            Curve::CatmullRom { .. } => "catmull-rom",
            Curve::Linear => "linear",
            Curve::MonotoneX => "monotone-x",
            Curve::MonotoneY => "monotone-y",
            Curve::Step => "step",
            Curve::StepAfter => "step-after",
            Curve::StepBefore => "step-before",
        }
    }

    /// Traces one polyline. `joined` continues an open path with a line instead of a move;
    /// `reversed` marks the return edge of an area, which mirrors the step position.
    pub fn trace(&self, points: &[(f64, f64)], path: &mut PathBuilder, joined: bool, reversed: bool) {
        let mut kernel: Box<dyn Kernel> = match *self {
            Curve::Basis => Box::new(Basis::new(joined)),
            Curve::Cardinal { tension } => Box::new(Cardinal::new(tension, joined)),
            Curve::CatmullRom { alpha } if alpha.abs() < EPSILON => {
                Box::new(Cardinal::new(0.0, joined))
            }
            Curve::CatmullRom { alpha } => Box::new(CatmullRom::new(alpha, joined)),
            Curve::Linear => Box::new(Linear::new(joined)),
            Curve::MonotoneX => Box::new(Monotone::new(false, joined)),
            Curve::MonotoneY => Box::new(Monotone::new(true, joined)),
            Curve::Step => Box::new(Step::new(0.5, joined)),
            Curve::StepAfter => Box::new(Step::new(if reversed { 0.0 } else { 1.0 }, joined)),
            Curve::StepBefore => Box::new(Step::new(if reversed { 1.0 } else { 0.0 }, joined)),
        };
        for &(x, y) in points {
            kernel.point(path, x, y);
        }
        kernel.line_end(path);
    }
}

impl FromStr for Curve {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Curve::from_name(name, None, None)
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed area outline: `lower` forward, then `upper` backward.
///
/// Both slices are in the same (chronological) order.
pub fn area_path(curve: Curve, lower: &[(f64, f64)], upper: &[(f64, f64)]) -> String {
    if lower.is_empty() {
        return String::new();
    }
    let mut path = PathBuilder::default();
    curve.trace(lower, &mut path, false, false);
    let upper_back: Vec<(f64, f64)> = upper.iter().rev().copied().collect();
    curve.trace(&upper_back, &mut path, true, true);
    path.close_path();
    path.finish()
}

#[derive(Debug, Default, Clone)]
pub struct PathBuilder {
    d: String,
}

impl PathBuilder {
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.d.push_str(&format!("M{},{}", fmt_num(x), fmt_num(y)));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.d.push_str(&format!("L{},{}", fmt_num(x), fmt_num(y)));
    }

    pub fn bezier_curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.d.push_str(&format!(
            "C{},{},{},{},{},{}",
            fmt_num(x1),
            fmt_num(y1),
            fmt_num(x2),
            fmt_num(y2),
            fmt_num(x),
            fmt_num(y)
        ));
    }

    pub fn close_path(&mut self) {
        self.d.push('Z');
    }

    pub fn finish(self) -> String {
        self.d
    }
}

trait Kernel {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64);
    fn line_end(&mut self, path: &mut PathBuilder);
}

fn start(path: &mut PathBuilder, joined: bool, x: f64, y: f64) {
    if joined {
        path.line_to(x, y);
    } else {
        path.move_to(x, y);
    }
}

struct Linear {
    joined: bool,
    started: bool,
}

impl Linear {
    fn new(joined: bool) -> Self {
        Self {
            joined,
            started: false,
        }
    }
}

impl Kernel for Linear {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        if self.started {
            path.line_to(x, y);
        } else {
            self.started = true;
            start(path, self.joined, x, y);
        }
    }

    fn line_end(&mut self, _path: &mut PathBuilder) {}
}

struct Step {
    t: f64,
    joined: bool,
    count: usize,
    x: f64,
    y: f64,
}

impl Step {
    fn new(t: f64, joined: bool) -> Self {
        Self {
            t,
            joined,
            count: 0,
            x: f64::NAN,
            y: f64::NAN,
        }
    }
}

impl Kernel for Step {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        if self.count == 0 {
            start(path, self.joined, x, y);
        } else if self.t <= 0.0 {
            path.line_to(self.x, y);
            path.line_to(x, y);
        } else {
            let x1 = self.x * (1.0 - self.t) + x * self.t;
            path.line_to(x1, self.y);
            path.line_to(x1, y);
        }
        self.count += 1;
        self.x = x;
        self.y = y;
    }

    fn line_end(&mut self, path: &mut PathBuilder) {
        if 0.0 < self.t && self.t < 1.0 && self.count >= 2 {
            path.line_to(self.x, self.y);
        }
    }
}

struct Basis {
    joined: bool,
    count: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Basis {
    fn new(joined: bool) -> Self {
        Self {
            joined,
            count: 0,
            x0: f64::NAN,
            y0: f64::NAN,
            x1: f64::NAN,
            y1: f64::NAN,
        }
    }

    fn segment(&self, path: &mut PathBuilder, x: f64, y: f64) {
        path.bezier_curve_to(
            (2.0 * self.x0 + self.x1) / 3.0,
            (2.0 * self.y0 + self.y1) / 3.0,
            (self.x0 + 2.0 * self.x1) / 3.0,
            (self.y0 + 2.0 * self.y1) / 3.0,
            (self.x0 + 4.0 * self.x1 + x) / 6.0,
            (self.y0 + 4.0 * self.y1 + y) / 6.0,
        );
    }
}

impl Kernel for Basis {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        match self.count {
            0 => start(path, self.joined, x, y),
            1 => {}
            2 => {
                path.line_to(
                    (5.0 * self.x0 + self.x1) / 6.0,
                    (5.0 * self.y0 + self.y1) / 6.0,
                );
                self.segment(path, x, y);
            }
            _ => self.segment(path, x, y),
        }
        self.count += 1;
        self.x0 = self.x1;
        self.x1 = x;
        self.y0 = self.y1;
        self.y1 = y;
    }

    fn line_end(&mut self, path: &mut PathBuilder) {
        if self.count >= 3 {
            self.segment(path, self.x1, self.y1);
        }
        if self.count >= 2 {
            path.line_to(self.x1, self.y1);
        }
    }
}

struct Cardinal {
    k: f64,
    joined: bool,
    count: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl Cardinal {
    fn new(tension: f64, joined: bool) -> Self {
        Self {
            k: (1.0 - tension) / 6.0,
            joined,
            count: 0,
            x0: f64::NAN,
            y0: f64::NAN,
            x1: f64::NAN,
            y1: f64::NAN,
            x2: f64::NAN,
            y2: f64::NAN,
        }
    }

    fn segment(&self, path: &mut PathBuilder, x: f64, y: f64) {
        path.bezier_curve_to(
            self.x1 + self.k * (self.x2 - self.x0),
            self.y1 + self.k * (self.y2 - self.y0),
            self.x2 + self.k * (self.x1 - x),
            self.y2 + self.k * (self.y1 - y),
            self.x2,
            self.y2,
        );
    }
}

impl Kernel for Cardinal {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        match self.count {
            0 => start(path, self.joined, x, y),
            1 => {
                // Seeds the reflected first control point.
                self.x1 = x;
                self.y1 = y;
            }
            _ => self.segment(path, x, y),
        }
        self.count += 1;
        self.x0 = self.x1;
        self.x1 = self.x2;
        self.x2 = x;
        self.y0 = self.y1;
        self.y1 = self.y2;
        self.y2 = y;
    }

    fn line_end(&mut self, path: &mut PathBuilder) {
        match self.count {
            0 | 1 => {}
            2 => path.line_to(self.x2, self.y2),
            _ => self.segment(path, self.x1, self.y1),
        }
    }
}

struct CatmullRom {
    alpha: f64,
    joined: bool,
    count: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    l01_a: f64,
    l12_a: f64,
    l23_a: f64,
    l01_2a: f64,
    l12_2a: f64,
    l23_2a: f64,
}

impl CatmullRom {
    fn new(alpha: f64, joined: bool) -> Self {
        Self {
            alpha,
            joined,
            count: 0,
            x0: f64::NAN,
            y0: f64::NAN,
            x1: f64::NAN,
            y1: f64::NAN,
            x2: f64::NAN,
            y2: f64::NAN,
            l01_a: 0.0,
            l12_a: 0.0,
            l23_a: 0.0,
            l01_2a: 0.0,
            l12_2a: 0.0,
            l23_2a: 0.0,
        }
    }

    fn segment(&self, path: &mut PathBuilder, x: f64, y: f64) {
        let (mut x1, mut y1, mut x2, mut y2) = (self.x1, self.y1, self.x2, self.y2);
        if self.l01_a > EPSILON {
            let a = 2.0 * self.l01_2a + 3.0 * self.l01_a * self.l12_a + self.l12_2a;
            let n = 3.0 * self.l01_a * (self.l01_a + self.l12_a);
            x1 = (x1 * a - self.x0 * self.l12_2a + self.x2 * self.l01_2a) / n;
            y1 = (y1 * a - self.y0 * self.l12_2a + self.y2 * self.l01_2a) / n;
        }
        if self.l23_a > EPSILON {
            let b = 2.0 * self.l23_2a + 3.0 * self.l23_a * self.l12_a + self.l12_2a;
            let m = 3.0 * self.l23_a * (self.l23_a + self.l12_a);
            x2 = (x2 * b + self.x1 * self.l23_2a - x * self.l12_2a) / m;
            y2 = (y2 * b + self.y1 * self.l23_2a - y * self.l12_2a) / m;
        }
        path.bezier_curve_to(x1, y1, x2, y2, self.x2, self.y2);
    }
}

impl Kernel for CatmullRom {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        if self.count > 0 {
            let x23 = self.x2 - x;
            let y23 = self.y2 - y;
            self.l23_2a = (x23 * x23 + y23 * y23).powf(self.alpha);
            self.l23_a = self.l23_2a.sqrt();
        }
        match self.count {
            0 => start(path, self.joined, x, y),
            1 => {}
            _ => self.segment(path, x, y),
        }
        self.count += 1;
        self.l01_a = self.l12_a;
        self.l12_a = self.l23_a;
        self.l01_2a = self.l12_2a;
        self.l12_2a = self.l23_2a;
        self.x0 = self.x1;
        self.x1 = self.x2;
        self.x2 = x;
        self.y0 = self.y1;
        self.y1 = self.y2;
        self.y2 = y;
    }

    fn line_end(&mut self, path: &mut PathBuilder) {
        match self.count {
            0 | 1 => {}
            2 => path.line_to(self.x2, self.y2),
            _ => {
                let (x, y) = (self.x2, self.y2);
                self.point(path, x, y);
            }
        }
    }
}

/// Monotone cubic interpolation in x, or in y when `reflect` swaps the axes.
struct Monotone {
    reflect: bool,
    joined: bool,
    count: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    t0: f64,
}

impl Monotone {
    fn new(reflect: bool, joined: bool) -> Self {
        Self {
            reflect,
            joined,
            count: 0,
            x0: f64::NAN,
            y0: f64::NAN,
            x1: f64::NAN,
            y1: f64::NAN,
            t0: f64::NAN,
        }
    }

    fn out(&self, x: f64, y: f64) -> (f64, f64) {
        if self.reflect { (y, x) } else { (x, y) }
    }

    fn slope3(&self, x2: f64, y2: f64) -> f64 {
        let h0 = self.x1 - self.x0;
        let h1 = x2 - self.x1;
        let d0 = if h0 != 0.0 { h0 } else if h1 < 0.0 { -0.0 } else { 0.0 };
        let d1 = if h1 != 0.0 { h1 } else if h0 < 0.0 { -0.0 } else { 0.0 };
        let s0 = (self.y1 - self.y0) / d0;
        let s1 = (y2 - self.y1) / d1;
        let p = (s0 * h1 + s1 * h0) / (h0 + h1);
        if s0.is_nan() || s1.is_nan() || p.is_nan() {
            return 0.0;
        }
        let slope = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
        if slope.is_nan() { 0.0 } else { slope }
    }

    fn slope2(&self, t: f64) -> f64 {
        let h = self.x1 - self.x0;
        if h != 0.0 {
            (3.0 * (self.y1 - self.y0) / h - t) / 2.0
        } else {
            t
        }
    }

    fn segment(&self, path: &mut PathBuilder, t0: f64, t1: f64) {
        let dx = (self.x1 - self.x0) / 3.0;
        let (c1x, c1y) = self.out(self.x0 + dx, self.y0 + dx * t0);
        let (c2x, c2y) = self.out(self.x1 - dx, self.y1 - dx * t1);
        let (x, y) = self.out(self.x1, self.y1);
        path.bezier_curve_to(c1x, c1y, c2x, c2y, x, y);
    }
}

impl Kernel for Monotone {
    fn point(&mut self, path: &mut PathBuilder, x: f64, y: f64) {
        let (x, y) = self.out(x, y);
        if x == self.x1 && y == self.y1 {
            return;
        }
        let mut t1 = f64::NAN;
        match self.count {
            0 => {
                let (ox, oy) = self.out(x, y);
                start(path, self.joined, ox, oy);
            }
            1 => {}
            2 => {
                t1 = self.slope3(x, y);
                let t0 = self.slope2(t1);
                self.segment(path, t0, t1);
            }
            _ => {
                t1 = self.slope3(x, y);
                self.segment(path, self.t0, t1);
            }
        }
        self.count += 1;
        self.x0 = self.x1;
        self.x1 = x;
        self.y0 = self.y1;
        self.y1 = y;
        self.t0 = t1;
    }

    fn line_end(&mut self, path: &mut PathBuilder) {
        match self.count {
            2 => {
                let (x, y) = self.out(self.x1, self.y1);
                path.line_to(x, y);
            }
            count if count >= 3 => {
                let t1 = self.slope2(self.t0);
                self.segment(path, self.t0, t1);
            }
            _ => {}
        }
    }
}

fn sign(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}
