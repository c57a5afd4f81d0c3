use dynmask_image::{Image, ImageSize};

/// A horizontal run of covered pixels on one image row, `x_start..=x_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Row index.
    pub y: usize,
    /// First covered column.
    pub x_start: usize,
    /// Last covered column, inclusive.
    pub x_end: usize,
}

impl Span {
    /// Number of pixels in the span.
    pub fn num_pixels(&self) -> usize {
        self.x_end - self.x_start + 1
    }
}

/// Scanline coverage of a convex polygon clipped to the image.
///
/// A pixel is covered when its center `(x + 0.5, y + 0.5)` lies inside the
/// polygon. Edges follow a half-open rule in y so shared vertices are not
/// counted twice. Polygons with fewer than three vertices cover nothing.
///
/// # Arguments
///
/// * `polygon` - Vertices of a convex polygon in pixel coordinates, any winding.
/// * `size` - The image size used for clipping.
pub fn convex_polygon_spans(polygon: &[[f64; 2]], size: ImageSize) -> Vec<Span> {
    if polygon.len() < 3 || size.width == 0 || size.height == 0 {
        return Vec::new();
    }

    let (y_min, y_max) = polygon
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        });
    let row_start = (y_min - 0.5).ceil().max(0.0);
    let row_end = (y_max - 0.5).floor().min(size.height as f64 - 1.0);
    if !(row_start <= row_end) {
        return Vec::new();
    }

    let mut spans = Vec::new();
    for y in row_start as usize..=row_end as usize {
        let yc = y as f64 + 0.5;

        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        for (i, a) in polygon.iter().enumerate() {
            let b = &polygon[(i + 1) % polygon.len()];
            let crosses = (a[1] <= yc && b[1] > yc) || (b[1] <= yc && a[1] > yc);
            if crosses {
                let x = a[0] + (yc - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
                x_min = x_min.min(x);
                x_max = x_max.max(x);
            }
        }

        let x_start = (x_min - 0.5).ceil().max(0.0);
        let x_end = (x_max - 0.5).floor().min(size.width as f64 - 1.0);
        if x_start <= x_end {
            spans.push(Span {
                y,
                x_start: x_start as usize,
                x_end: x_end as usize,
            });
        }
    }
    spans
}

/// Fill a convex polygon with a constant value inplace.
///
/// # Arguments
///
/// * `image` - The image to draw on.
/// * `polygon` - Vertices of a convex polygon in pixel coordinates.
/// * `val` - The fill value.
pub fn fill_convex_polygon<T: Copy>(image: &mut Image<T>, polygon: &[[f64; 2]], val: T) {
    for span in convex_polygon_spans(polygon, image.size()) {
        if let Some(row) = image.row_mut(span.y) {
            row[span.x_start..=span.x_end].fill(val);
        }
    }
}
