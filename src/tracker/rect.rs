use ndarray::Array2;

/// Axis-aligned box in pixel coordinates, stored as top-left corner plus size.
///
/// Conversions:
/// - TLWH: left, top, width, height
/// - TLBR: left, top, right, bottom
/// - XYSR: center x, center y, area, width / height; the Kalman measurement space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning the corners (x1, y1) and (x2, y2).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Box from a Kalman measurement (center, area, aspect ratio).
    ///
    /// A non-positive area yields non-finite coordinates, which callers use to
    /// discard degenerate predictions.
    #[inline]
    pub fn from_xysr(cx: f64, cy: f64, scale: f64, ratio: f64) -> Self {
        let w = (scale * ratio).sqrt();
        let h = scale / w;
        Self::from_tlbr(
            (cx - w / 2.0) as f32,
            (cy - h / 2.0) as f32,
            (cx + w / 2.0) as f32,
            (cy + h / 2.0) as f32,
        )
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Kalman measurement of the box. A zero-height box gets ratio 0.
    #[inline]
    pub fn to_xysr(&self) -> [f64; 4] {
        let w = self.width as f64;
        let h = self.height as f64;
        let cx = self.x as f64 + w / 2.0;
        let cy = self.y as f64 + h / 2.0;
        let ratio = if h > 0.0 { w / h } else { 0.0 };
        [cx, cy, w * h, ratio]
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.to_tlwh().iter().all(|v| v.is_finite())
    }

    /// Finite with a positive width and height. Anything else has no usable
    /// Kalman measurement.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Intersection over union, 0 when the union is empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let overlap_w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let overlap_h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let intersection = overlap_w * overlap_h;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 { intersection / union } else { 0.0 }
    }
}

/// Pairwise IoU, rows indexed by `boxes_a` and columns by `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f32> {
    Array2::from_shape_fn((boxes_a.len(), boxes_b.len()), |(i, j)| {
        boxes_a[i].iou(&boxes_b[j])
    })
}
