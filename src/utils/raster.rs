//! # Rasterization
//!
//! Integer rasterizers for circles and straight lines.

/// Midpoint circle scan.
///
/// Calls `span(x1, x2, y)` for horizontal spans of the circle of radius `r`
/// centered on (`cx`, `cy`). Each call gives the two outline points of one
/// scanline; spans for the same row may be reported more than once. Filling
/// from `x1` to `x2` covers the disc, stamping only `x1` and `x2` draws the
/// outline.
///
/// # Examples
///
/// ```
/// use grotto::fill_circle;
///
/// let mut rows = std::collections::BTreeSet::new();
/// fill_circle(5, 5, 5, |_, _, y| {
///     rows.insert(y);
/// });
/// assert_eq!(rows.len(), 11);
/// ```
pub fn fill_circle<F>(cx: i32, cy: i32, r: i32, mut span: F)
where
    F: FnMut(i32, i32, i32),
{
    let mut x = 0;
    let mut y = r;
    let mut delta = 1 - 2 * r;
    while y >= x {
        span(cx - x, cx + x, cy + y);
        span(cx - x, cx + x, cy - y);
        span(cx - y, cx + y, cy + x);
        span(cx - y, cx + y, cy - x);
        let error = 2 * (delta + y) - 1;
        if delta < 0 && error <= 0 {
            x += 1;
            delta += 2 * x + 1;
            continue;
        }
        if delta > 0 && error > 0 {
            y -= 1;
            delta -= 2 * y + 1;
            continue;
        }
        x += 1;
        y -= 1;
        delta += 2 * (x - y);
    }
}

/// Plots an evenly stepped line from (`x0`, `y0`) towards (`x1`, `y1`).
///
/// Takes `max(|dx|, |dy|) + 1` samples; the final sample stops just short of
/// the far endpoint, so callers stamp that point themselves when it matters.
pub fn draw_line<F>(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: F)
where
    F: FnMut(i32, i32),
{
    let steps = (x1 - x0).abs().max((y1 - y0).abs()) + 1;
    let dx = (x1 - x0) as f64 / steps as f64;
    let dy = (y1 - y0) as f64 / steps as f64;
    for i in 0..steps {
        let x = (x0 as f64 + i as f64 * dx).round() as i32;
        let y = (y0 as f64 + i as f64 * dy).round() as i32;
        plot(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_circle_outline_stays_on_radius() {
        let r = 12;
        let mut outline = HashSet::new();
        fill_circle(r, r, r, |x1, x2, y| {
            outline.insert((x1, y));
            outline.insert((x2, y));
        });

        for &(x, y) in &outline {
            let d = (((x - r).pow(2) + (y - r).pow(2)) as f64).sqrt();
            assert!((d - r as f64).abs() < 1.0, "({x}, {y}) is {d} from center");
            assert!(x >= 0 && x <= 2 * r && y >= 0 && y <= 2 * r);
        }
    }

    #[test]
    fn test_circle_spans_cover_disc() {
        let r = 8;
        let mut filled = HashSet::new();
        fill_circle(0, 0, r, |x1, x2, y| {
            for x in x1..=x2 {
                filled.insert((x, y));
            }
        });

        assert!(filled.contains(&(0, 0)));
        assert!(filled.contains(&(r, 0)));
        assert!(filled.contains(&(0, -r)));
        assert!(!filled.contains(&(r, r)));
    }

    #[test]
    fn test_line_is_contiguous() {
        let mut points = Vec::new();
        draw_line(0, 0, 10, 4, |x, y| points.push((x, y)));

        assert_eq!(points.len(), 11);
        assert_eq!(points[0], (0, 0));
        for pair in points.windows(2) {
            assert!((pair[1].0 - pair[0].0).abs() <= 1);
            assert!((pair[1].1 - pair[0].1).abs() <= 1);
        }
    }

    #[test]
    fn test_degenerate_line() {
        let mut points = Vec::new();
        draw_line(3, 3, 3, 3, |x, y| points.push((x, y)));
        assert_eq!(points, vec![(3, 3)]);
    }
}
