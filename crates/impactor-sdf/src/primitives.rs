use impactor_core::KernelError;

/// Cartesian point used for SDF evaluation, millimeters.
pub type Point3 = [f64; 3];

/// Trait for 3D signed distance fields. Negative inside.
pub trait Sdf3 {
    fn evaluate(&self, point: Point3) -> f64;
}

#[inline]
fn length(v: Point3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[inline]
fn length2(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

#[inline]
fn max_component(v: Point3) -> f64 {
    v[0].max(v[1]).max(v[2])
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    pub fn translated(&self, offset: Point3) -> Aabb {
        Aabb {
            min: [
                self.min[0] + offset[0],
                self.min[1] + offset[1],
                self.min[2] + offset[2],
            ],
            max: [
                self.max[0] + offset[0],
                self.max[1] + offset[1],
                self.max[2] + offset[2],
            ],
        }
    }

    /// Box enclosing this one after rotating it about Z.
    pub fn rotated_z(&self, radians: f64) -> Aabb {
        let (s, c) = radians.sin_cos();
        let corners = [
            [self.min[0], self.min[1]],
            [self.max[0], self.min[1]],
            [self.min[0], self.max[1]],
            [self.max[0], self.max[1]],
        ];
        let mut min = [f64::INFINITY, f64::INFINITY, self.min[2]];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY, self.max[2]];
        for [x, y] in corners {
            let rx = c * x - s * y;
            let ry = s * x + c * y;
            min[0] = min[0].min(rx);
            min[1] = min[1].min(ry);
            max[0] = max[0].max(rx);
            max[1] = max[1].max(ry);
        }
        Aabb { min, max }
    }

    /// Grows every side by `margin`.
    pub fn padded(&self, margin: f64) -> Aabb {
        Aabb {
            min: [
                self.min[0] - margin,
                self.min[1] - margin,
                self.min[2] - margin,
            ],
            max: [
                self.max[0] + margin,
                self.max[1] + margin,
                self.max[2] + margin,
            ],
        }
    }

    pub fn size(&self) -> Point3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn contains(&self, point: Point3) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }
}

/// Z-aligned cylinder with its base disc on Z = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    radius: f64,
    height: f64,
}

impl Cylinder {
    pub fn new(diameter: f64, height: f64) -> Result<Self, KernelError> {
        let diameter = KernelError::require_positive("cylinder diameter", diameter)?;
        let height = KernelError::require_positive("cylinder height", height)?;
        Ok(Self {
            radius: diameter * 0.5,
            height,
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            [-self.radius, -self.radius, 0.0],
            [self.radius, self.radius, self.height],
        )
    }
}

impl Sdf3 for Cylinder {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let half = self.height * 0.5;
        let d = [
            length2([point[0], point[1]]) - self.radius,
            (point[2] - half).abs() - half,
        ];
        let outside = length2([d[0].max(0.0), d[1].max(0.0)]);
        let inside = d[0].max(d[1]).min(0.0);
        outside + inside
    }
}

/// Box centred on the XY origin with its bottom face on Z = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    half_extents: Point3,
}

impl Cuboid {
    pub fn new(size_x: f64, size_y: f64, size_z: f64) -> Result<Self, KernelError> {
        let x = KernelError::require_positive("cuboid length", size_x)?;
        let y = KernelError::require_positive("cuboid width", size_y)?;
        let z = KernelError::require_positive("cuboid height", size_z)?;
        Ok(Self {
            half_extents: [x * 0.5, y * 0.5, z * 0.5],
        })
    }

    pub fn half_extents(&self) -> Point3 {
        self.half_extents
    }

    pub fn bounds(&self) -> Aabb {
        let h = self.half_extents;
        Aabb::new([-h[0], -h[1], 0.0], [h[0], h[1], 2.0 * h[2]])
    }
}

impl Sdf3 for Cuboid {
    #[inline]
    fn evaluate(&self, point: Point3) -> f64 {
        let h = self.half_extents;
        let q = [
            point[0].abs() - h[0],
            point[1].abs() - h[1],
            (point[2] - h[2]).abs() - h[2],
        ];
        let outside = length([q[0].max(0.0), q[1].max(0.0), q[2].max(0.0)]);
        let inside = max_component(q).min(0.0);
        outside + inside
    }
}
