use image::GrayImage;
use imageproc::contours::{self, BorderType};

use crate::models::Contour;

/// Trace every border in a binary edge map, outer and nested (hole) borders alike
pub fn find_contours(edges: &GrayImage) -> Vec<Contour> {
    contours::find_contours::<i32>(edges)
        .into_iter()
        .map(|c| Contour::new(c.points, c.border_type == BorderType::Hole))
        .collect()
}

/// Sort contours by enclosed area, largest first, and keep at most `limit`.
/// The sort is stable, so equal areas keep tracing order.
pub fn largest_by_area(mut contours: Vec<Contour>, limit: usize) -> Vec<Contour> {
    contours.sort_by(|a, b| b.area().total_cmp(&a.area()));
    contours.truncate(limit);
    contours
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::point::Point;
    use imageproc::rect::Rect;

    #[test]
    fn empty_edge_map_has_no_contours() {
        let edges = GrayImage::new(50, 50);
        assert!(find_contours(&edges).is_empty());
    }

    #[test]
    fn hollow_rectangle_yields_outer_and_hole_borders() {
        let mut edges = GrayImage::new(100, 80);
        draw_hollow_rect_mut(&mut edges, Rect::at(10, 10).of_size(60, 40), Luma([255u8]));
        let found = find_contours(&edges);
        assert!(found.iter().any(|c| !c.is_hole));
        assert!(found.iter().any(|c| c.is_hole));
    }

    #[test]
    fn traced_rectangle_measures_and_simplifies() {
        let mut edges = GrayImage::new(200, 120);
        draw_hollow_rect_mut(&mut edges, Rect::at(30, 40).of_size(120, 50), Luma([255u8]));
        let outer = find_contours(&edges)
            .into_iter()
            .find(|c| !c.is_hole)
            .unwrap();

        // Border pixels run from (30, 40) to (149, 89)
        assert_eq!(outer.area(), 119.0 * 49.0);
        assert!((outer.perimeter() - 2.0 * (119.0 + 49.0)).abs() < 1e-9);
        assert_eq!(outer.approximate_polygon(0.018).unwrap().len(), 4);
    }

    #[test]
    fn ranking_keeps_largest_first_and_caps_count() {
        let square = |size: i32| {
            Contour::new(
                vec![
                    Point::new(0, 0),
                    Point::new(size, 0),
                    Point::new(size, size),
                    Point::new(0, size),
                ],
                false,
            )
        };
        let contours: Vec<Contour> = (1..=15).map(square).collect();
        let ranked = largest_by_area(contours, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].area(), 225.0);
        assert_eq!(ranked[9].area(), 36.0);
    }
}
