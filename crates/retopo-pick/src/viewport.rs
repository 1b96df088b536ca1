use retopo_geometry::{
    Deg, InnerSpace, Matrix4, Plane, Point2, Point3, Ray, SquareMatrix, Vector3, Vector4,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective { fovy_deg: f64, near: f64, far: f64 },
    Orthographic { half_height: f64, near: f64, far: f64 },
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fovy_deg: 50.0,
            near: 0.01,
            far: 1000.0,
        }
    }
}

/// Camera and region state. Screen coordinates are pixels with the origin at
/// the bottom-left corner of the region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub view: Matrix4<f64>,
    pub projection: Projection,
}

impl Viewport {
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
        projection: Projection,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            width,
            height,
            view: Matrix4::look_at_rh(eye, target, up),
            projection,
        }
    }

    pub fn half_size(&self) -> (f64, f64) {
        (self.width * 0.5, self.height * 0.5)
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }

    pub fn projection_matrix(&self) -> Matrix4<f64> {
        let aspect = if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        };
        match self.projection {
            Projection::Perspective {
                fovy_deg,
                near,
                far,
            } => cgmath::perspective(Deg(fovy_deg), aspect, near, far),
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                let half_width = half_height * aspect;
                cgmath::ortho(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    /// Projection x view.
    pub fn perspective_matrix(&self) -> Matrix4<f64> {
        self.projection_matrix() * self.view
    }

    /// Maps object-space points to homogeneous pixel offsets from the region
    /// centre; see [`project_with`].
    pub fn screen_matrix(&self, matrix_world: &Matrix4<f64>) -> Matrix4<f64> {
        let (half_w, half_h) = self.half_size();
        Matrix4::from_nonuniform_scale(half_w, half_h, 1.0)
            * self.perspective_matrix()
            * matrix_world
    }

    pub fn project(&self, world: Point3<f64>) -> Option<Point2<f64>> {
        let matrix = self.screen_matrix(&Matrix4::identity());
        project_with(&matrix, self.half_size(), world)
    }

    pub fn camera_origin(&self) -> Option<Point3<f64>> {
        let inverse = self.view.invert()?;
        Some(Point3::new(inverse.w.x, inverse.w.y, inverse.w.z))
    }

    /// World-space ray from the eye through a pixel.
    pub fn ray_from_screen(&self, coord: Point2<f64>) -> Option<Ray> {
        let (half_w, half_h) = self.half_size();
        if half_w <= 0.0 || half_h <= 0.0 {
            return None;
        }
        let inverse = self.perspective_matrix().invert()?;
        let ndc_x = (coord.x - half_w) / half_w;
        let ndc_y = (coord.y - half_h) / half_h;
        let near = unproject(&inverse, ndc_x, ndc_y, -1.0)?;
        let far = unproject(&inverse, ndc_x, ndc_y, 1.0)?;
        let origin = if self.is_perspective() {
            self.camera_origin()?
        } else {
            near
        };
        let direction = far - origin;
        if direction.magnitude2() <= f64::EPSILON {
            return None;
        }
        Some(Ray::new(origin, direction))
    }

    /// Ray through the screen projection of `world`; `None` when the point
    /// is behind the eye.
    pub fn ray_from_world(&self, world: Point3<f64>) -> Option<Ray> {
        let coord = self.project(world)?;
        self.ray_from_screen(coord)
    }

    /// Plane swept by the view rays through two pixels.
    pub fn slice_plane(&self, a: Point2<f64>, b: Point2<f64>) -> Option<Plane> {
        let first = self.ray_from_screen(a)?;
        let second = self.ray_from_screen(b)?;
        Plane::from_rays(&first, &second)
    }
}

/// Applies a matrix from [`Viewport::screen_matrix`]; points with w <= 0 are
/// behind the eye and yield `None`.
pub fn project_with(
    matrix: &Matrix4<f64>,
    half_size: (f64, f64),
    point: Point3<f64>,
) -> Option<Point2<f64>> {
    let clip = matrix * point.to_homogeneous();
    if !(clip.w > f64::EPSILON) {
        return None;
    }
    Some(Point2::new(
        clip.x / clip.w + half_size.0,
        clip.y / clip.w + half_size.1,
    ))
}

fn unproject(inverse: &Matrix4<f64>, x: f64, y: f64, z: f64) -> Option<Point3<f64>> {
    let v = inverse * Vector4::new(x, y, z, 1.0);
    if v.w.abs() <= f64::EPSILON {
        return None;
    }
    Some(Point3::new(v.x / v.w, v.y / v.w, v.z / v.w))
}
