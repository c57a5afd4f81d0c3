use glam::DVec3;

use crate::{
    bbox::{BoxSize, OrientedBox, BOX_EDGES},
    camera::PinholeIntrinsic,
    error::GeometryError,
    pose::Pose,
};

/// Depth of the near clipping plane in meters.
///
/// Box geometry in front of the camera but closer than this is clipped away
/// before the perspective division.
pub const NEAR_PLANE: f64 = 0.01;

/// A point projected into the image plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Horizontal pixel coordinate.
    pub u: f64,
    /// Vertical pixel coordinate.
    pub v: f64,
    /// Depth along the optical axis in meters.
    pub depth: f64,
}

/// The image-plane footprint of a 3D box.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedBox {
    /// Convex hull of the projected (near-plane clipped) box, counter-clockwise.
    pub hull: Vec<[f64; 2]>,
    /// Depth of the nearest part of the box in front of the near plane.
    pub depth: f64,
    /// Whether part of the box was behind the near plane.
    pub clipped: bool,
    /// The box frame in the camera frame.
    pub camera_from_box: Pose,
    /// Box extent.
    pub size: BoxSize,
}

impl ProjectedBox {
    /// Axis-aligned bounds of the hull as `(min_u, min_v, max_u, max_v)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.hull.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), p| (x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1])),
        )
    }

    /// Whether the hull bounds overlap an image of the given size.
    pub fn overlaps_image(&self, width: usize, height: usize) -> bool {
        let (x0, y0, x1, y1) = self.bounds();
        x1 >= 0.0 && y1 >= 0.0 && x0 < width as f64 && y0 < height as f64
    }

    /// Depth of the box surface seen through pixel `(u, v)`.
    ///
    /// The viewing ray is intersected with the box and the entry point is
    /// kept; entries behind the near plane are moved onto it. A pixel whose ray
    /// misses the box gets [`ProjectedBox::depth`].
    pub fn surface_depth(&self, intrinsic: &PinholeIntrinsic, u: f64, v: f64) -> f64 {
        ray_box_entry(
            &self.camera_from_box,
            &self.size,
            intrinsic.ray(u, v),
        )
        .unwrap_or(self.depth)
    }
}

// entry depth of a camera ray `t * dir` (dir.z = 1) into the box, at or past the near plane
fn ray_box_entry(camera_from_box: &Pose, size: &BoxSize, dir: DVec3) -> Option<f64> {
    const EPS: f64 = 1e-9;
    let box_from_camera = camera_from_box.inverse();
    let origin = box_from_camera.translation();
    let dir = box_from_camera.transform_vector3(dir);
    let half = DVec3::new(size.length, size.width, size.height) / 2.0;

    let (mut t_enter, mut t_exit) = (NEAR_PLANE, f64::INFINITY);
    for axis in 0..3 {
        let (o, d, h) = (origin[axis], dir[axis], half[axis]);
        if d.abs() < EPS {
            if o.abs() > h + EPS {
                return None;
            }
            continue;
        }
        let (t0, t1) = ((-h - o) / d, (h - o) / d);
        t_enter = t_enter.max(t0.min(t1));
        t_exit = t_exit.min(t0.max(t1));
    }

    (t_enter <= t_exit + EPS).then_some(t_enter)
}

/// Perspective projection of a point expressed in the camera frame.
///
/// # Errors
///
/// Returns [`GeometryError::NonPositiveDepth`] if the point is on or behind the
/// camera plane (`z <= 0`). Such points must be excluded, not clamped.
///
/// # Example
///
/// ```
/// use dynmask_geometry::{project, PinholeIntrinsic};
///
/// let k = PinholeIntrinsic::new(500.0, 500.0, 320.0, 240.0).unwrap();
/// let p = project(&k, &[1.0, 0.0, 5.0]).unwrap();
/// assert_eq!((p.u, p.v, p.depth), (420.0, 240.0, 5.0));
/// assert!(project(&k, &[1.0, 0.0, -5.0]).is_err());
/// ```
pub fn project(
    intrinsic: &PinholeIntrinsic,
    point_in_camera: &[f64; 3],
) -> Result<Projection, GeometryError> {
    let [x, y, z] = *point_in_camera;
    // also rejects NaN
    if !(z > 0.0) {
        return Err(GeometryError::NonPositiveDepth(z));
    }
    let inv_z = 1.0 / z;
    Ok(Projection {
        u: intrinsic.fx * x * inv_z + intrinsic.cx,
        v: intrinsic.fy * y * inv_z + intrinsic.cy,
        depth: z,
    })
}

/// Project a world-frame box into a camera image.
///
/// The chain is fixed: world -> ego (`ego_pose^-1`) -> camera
/// (`camera_extrinsic^-1`) -> image (`intrinsic`). `ego_pose` is
/// `world_from_ego` and `camera_extrinsic` is `ego_from_camera`.
///
/// Corners behind the near plane are dropped and replaced by the intersections
/// of the box edges with that plane, so a box that straddles the camera still
/// yields its true visible footprint.
///
/// # Errors
///
/// Returns [`GeometryError::NonPositiveDepth`] when no part of the box lies in
/// front of the near plane.
pub fn project_box3d(
    world_box: &OrientedBox,
    ego_pose: &Pose,
    camera_extrinsic: &Pose,
    intrinsic: &PinholeIntrinsic,
) -> Result<ProjectedBox, GeometryError> {
    let ego_from_world = ego_pose.inverse();
    let camera_from_ego = camera_extrinsic.inverse();
    let camera_from_box = camera_from_ego
        .compose(&ego_from_world)
        .compose(&world_box.pose);

    let corners = world_box
        .size
        .local_corners()
        .map(|c| camera_from_box.transform_point(&c));

    let (vertices, clipped) = clip_to_near_plane(&corners);
    if vertices.is_empty() {
        let max_depth = corners.iter().map(|c| c[2]).fold(f64::NEG_INFINITY, f64::max);
        return Err(GeometryError::NonPositiveDepth(max_depth));
    }
    let depth = vertices.iter().map(|v| v[2]).fold(f64::INFINITY, f64::min);

    let points = vertices
        .iter()
        .map(|v| project(intrinsic, v).map(|p| [p.u, p.v]))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProjectedBox {
        hull: convex_hull_2d(&points),
        depth,
        clipped,
        camera_from_box,
        size: world_box.size,
    })
}

// corners in front of the near plane plus edge/plane intersections
fn clip_to_near_plane(corners: &[[f64; 3]; 8]) -> (Vec<[f64; 3]>, bool) {
    let in_front = |p: &[f64; 3]| p[2] > NEAR_PLANE;

    let mut vertices: Vec<[f64; 3]> = corners.iter().copied().filter(in_front).collect();
    let clipped = vertices.len() < corners.len();
    if !clipped || vertices.is_empty() {
        return (vertices, clipped);
    }

    for &(i, j) in BOX_EDGES.iter() {
        let (a, b) = (&corners[i], &corners[j]);
        if in_front(a) != in_front(b) {
            let t = (NEAR_PLANE - a[2]) / (b[2] - a[2]);
            vertices.push([
                a[0] + t * (b[0] - a[0]),
                a[1] + t * (b[1] - a[1]),
                NEAR_PLANE,
            ]);
        }
    }

    (vertices, clipped)
}

/// Convex hull of a 2D point set (Andrew's monotone chain).
///
/// Returns the hull vertices in counter-clockwise order without repeating the
/// first vertex. Collinear points are dropped. Fewer than three distinct
/// points are returned as-is (deduplicated).
pub fn convex_hull_2d(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &[f64; 2], a: &[f64; 2], b: &[f64; 2]| {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    };

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(pts.len() * 2);

    // lower hull
    for p in pts.iter() {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    // upper hull
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }

    hull.pop();
    hull
}
