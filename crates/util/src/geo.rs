//! Displacement-vector rotation and bounding-radius combination shared by
//! the scenery converter and the signal lifter. Ported from the rotation
//! block documented inline in `landschaft.py::conv_ls` and the
//! center/bounding-radius arithmetic that follows it.

/// Rotates `(x, y, z)` by Euler angles `(rx, ry, rz)` radians, applied in
/// Z, then Y, then X order (active rotation). Matches the three rotation
/// matrices worked out by hand in the original converter's comments.
pub fn rotate_zyx(v: (f64, f64, f64), angles: (f64, f64, f64)) -> (f64, f64, f64) {
    let (x, y, z) = v;
    let (rx, ry, rz) = angles;

    if rx == 0.0 && ry == 0.0 && rz == 0.0 {
        return v;
    }

    let x2 = x * rz.cos() - y * rz.sin();
    let y2 = x * rz.sin() + y * rz.cos();
    let z2 = z;

    let x3 = x2 * ry.cos() + z2 * ry.sin();
    let y3 = y2;
    let z3 = -x2 * ry.sin() + z2 * ry.cos();

    let x4 = x3;
    let y4 = y3 * rx.cos() - z3 * rx.sin();
    let z4 = y3 * rx.sin() + z3 * rx.cos();

    (x4, y4, z4)
}

/// The centroid of the smallest axis-aligned rectangle enclosing every
/// linked item's own bounding circle, in `(x, y)`.
pub fn bounding_center(items: &[(f64, f64, f64)]) -> (f64, f64) {
    let center_x = (items
        .iter()
        .map(|&(x, _, r)| x + r)
        .fold(f64::NEG_INFINITY, f64::max)
        + items
            .iter()
            .map(|&(x, _, r)| x - r)
            .fold(f64::INFINITY, f64::min))
        / 2.0;
    let center_y = (items
        .iter()
        .map(|&(_, y, r)| y + r)
        .fold(f64::NEG_INFINITY, f64::max)
        + items
            .iter()
            .map(|&(_, y, r)| y - r)
            .fold(f64::INFINITY, f64::min))
        / 2.0;
    (center_x, center_y)
}

/// The bounding radius of every linked item's own bounding circle around a
/// given `center`, kept byte-for-byte equivalent to the original's rectangle
/// approximation (marked `TODO fix bounding-Berechnung` there, and left
/// as-is here rather than replaced with a true circumscribing circle, per
/// the Design Notes). `center` need not be [`bounding_center`]'s result —
/// the scenery converter forces it to the origin when re-centering is
/// suppressed.
pub fn bounding_radius_at(items: &[(f64, f64, f64)], center: (f64, f64)) -> f64 {
    let (center_x, center_y) = center;
    let max_x = items
        .iter()
        .map(|&(x, _, r)| (x - center_x + r).abs().max((x - center_x - r).abs()))
        .fold(f64::NEG_INFINITY, f64::max);
    let max_y = items
        .iter()
        .map(|&(_, y, r)| (y - center_y + r).abs().max((y - center_y - r).abs()))
        .fold(f64::NEG_INFINITY, f64::max);
    (max_x * max_x + max_y * max_y).sqrt()
}

/// A 2D bounding circle approximated as the center and half-extent of the
/// smallest axis-aligned rectangle enclosing every linked item's own
/// bounding circle.
pub fn combine_bounding_circles(items: &[(f64, f64, f64)]) -> (f64, f64, f64) {
    if items.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let center = bounding_center(items);
    let r = bounding_radius_at(items, center);
    (center.0, center.1, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rotation_is_identity() {
        assert_eq!(rotate_zyx((1.0, 2.0, 3.0), (0.0, 0.0, 0.0)), (1.0, 2.0, 3.0));
    }

    #[test]
    fn quarter_turn_about_z_swaps_axes() {
        let (x, y, z) = rotate_zyx((1.0, 0.0, 0.0), (0.0, 0.0, std::f64::consts::FRAC_PI_2));
        assert!((x).abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
        assert!((z).abs() < 1e-9);
    }

    #[test]
    fn single_item_bounding_circle_is_its_own() {
        let (cx, cy, r) = combine_bounding_circles(&[(10.0, 5.0, 3.0)]);
        assert!((cx - 10.0).abs() < 1e-9);
        assert!((cy - 5.0).abs() < 1e-9);
        assert!((r - 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_has_zero_radius() {
        assert_eq!(combine_bounding_circles(&[]), (0.0, 0.0, 0.0));
    }
}
