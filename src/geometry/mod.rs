//! Geometric primitives: 2-D points, axis-aligned boxes and affine matrices
//! in PDF user space (y grows upward).

/// A 2D point in page user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle `[llx, lly, urx, ury]` in page user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Lower-left x
    pub llx: f64,
    /// Lower-left y
    pub lly: f64,
    /// Upper-right x
    pub urx: f64,
    /// Upper-right y
    pub ury: f64,
}

impl Rect {
    /// Create a rectangle from its corner coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwalk::geometry::Rect;
    ///
    /// let r = Rect::new(0.0, 0.0, 612.0, 792.0);
    /// assert_eq!(r.width(), 612.0);
    /// assert_eq!(r.height(), 792.0);
    /// ```
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Smallest axis-aligned rectangle containing all of the given points.
    pub fn around(points: &[Point]) -> Rect {
        let mut llx = f64::INFINITY;
        let mut lly = f64::INFINITY;
        let mut urx = f64::NEG_INFINITY;
        let mut ury = f64::NEG_INFINITY;
        for p in points {
            llx = llx.min(p.x);
            lly = lly.min(p.y);
            urx = urx.max(p.x);
            ury = ury.max(p.y);
        }
        Rect::new(llx, lly, urx, ury)
    }

    /// Clamp this rectangle against another (per-edge intersection).
    ///
    /// Used to keep an image bbox inside the page media box. The result can
    /// be degenerate when the rectangles are disjoint; callers treat the
    /// coordinates as-is, matching the per-edge min/max clamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwalk::geometry::Rect;
    ///
    /// let bbox = Rect::new(10.0, 10.0, 20.0, 20.0);
    /// let page = Rect::new(0.0, 0.0, 15.0, 15.0);
    /// assert_eq!(bbox.clamp_to(&page), Rect::new(10.0, 10.0, 15.0, 15.0));
    /// ```
    pub fn clamp_to(&self, other: &Rect) -> Rect {
        Rect::new(
            self.llx.max(other.llx),
            self.lly.max(other.lly),
            self.urx.min(other.urx),
            self.ury.min(other.ury),
        )
    }

    /// The rectangle as a `[llx, lly, urx, ury]` array.
    pub fn to_array(&self) -> [f64; 4] {
        [self.llx, self.lly, self.urx, self.ury]
    }
}

/// A 2D affine transformation matrix `[a b c d e f]`.
///
/// PDF uses matrices of the form:
/// ```text
/// [ a  b  0 ]
/// [ c  d  0 ]
/// [ e  f  1 ]
/// ```
///
/// Where (a,b,c,d) define scaling/rotation/skewing and (e,f) define translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Horizontal scaling component
    pub a: f64,
    /// Rotation/skew component
    pub b: f64,
    /// Rotation/skew component
    pub c: f64,
    /// Vertical scaling component
    pub d: f64,
    /// Horizontal translation
    pub e: f64,
    /// Vertical translation
    pub f: f64,
}

impl Matrix {
    /// Create an identity matrix (no transformation).
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Create a matrix from its six elements in operator order.
    pub fn from_array([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The six elements in operator order.
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Transform a point using this matrix.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwalk::geometry::Matrix;
    ///
    /// let m = Matrix::from_array([1.0, 0.0, 0.0, 1.0, 10.0, 20.0]);
    /// let p = m.transform_point(5.0, 10.0);
    /// assert_eq!(p.x, 15.0);
    /// assert_eq!(p.y, 30.0);
    /// ```
    pub fn transform_point(&self, x: f64, y: f64) -> Point {
        Point {
            x: self.a * x + self.c * y + self.e,
            y: self.b * x + self.d * y + self.f,
        }
    }

    /// Axis-aligned bounding box of the rectangle `[0,0] x [width,height]`
    /// under this transform: the four corners are transformed individually
    /// and reduced by per-corner min/max.
    pub fn transformed_bbox(&self, width: f64, height: f64) -> Rect {
        Rect::around(&[
            self.transform_point(0.0, 0.0),
            self.transform_point(width, 0.0),
            self.transform_point(width, height),
            self.transform_point(0.0, height),
        ])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}
