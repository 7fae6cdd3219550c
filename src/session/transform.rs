//! Orientation transform: re-projects elements from one canvas size onto another.
//!
//! Positions scale per axis. Sizes and font sizes scale by the average of the two
//! axis factors so elements keep their aspect ratio. Everything else, including
//! the element id, passes through unchanged.

use crate::canvas::model::{CanvasSize, Element, ElementKind};
use crate::error::{EditorError, EditorResult};

/// Scale factors between two canvas sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    scale_x: f64,
    scale_y: f64,
    avg_scale: f64,
}

impl Projection {
    /// Builds the projection from `from` onto `to`. Both sizes must be non-zero.
    pub fn new(from: CanvasSize, to: CanvasSize) -> EditorResult<Self> {
        from.validate()?;
        to.validate()?;
        let scale_x = to.width as f64 / from.width as f64;
        let scale_y = to.height as f64 / from.height as f64;
        Ok(Self {
            scale_x,
            scale_y,
            avg_scale: (scale_x + scale_y) / 2.0,
        })
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn avg_scale(&self) -> f64 {
        self.avg_scale
    }

    /// True when source and target sizes are equal.
    pub fn is_identity(&self) -> bool {
        self.scale_x == 1.0 && self.scale_y == 1.0
    }

    /// Returns a re-projected copy of `element`. The input is not touched.
    pub fn project(&self, element: &Element) -> Element {
        let mut out = element.clone();
        if self.is_identity() {
            return out;
        }
        out.x = element.x * self.scale_x;
        out.y = element.y * self.scale_y;
        out.width = element.width.map(|w| w * self.avg_scale);
        out.height = element.height.map(|h| h * self.avg_scale);
        if let ElementKind::Text(ref mut text) = out.kind {
            text.font_size = (text.font_size * self.avg_scale).round();
        }
        out
    }

    /// Re-projects every element, preserving order.
    pub fn project_all(&self, elements: &[Element]) -> Vec<Element> {
        elements.iter().map(|el| self.project(el)).collect()
    }
}

/// Derives portrait elements from landscape user elements.
///
/// Locked frame elements belong to one orientation only; callers filter them out
/// first and passing one is an error.
pub fn calculate_portrait_from_landscape(
    elements: &[Element],
    landscape_size: CanvasSize,
    portrait_size: CanvasSize,
) -> EditorResult<Vec<Element>> {
    if let Some(locked) = elements.iter().find(|el| el.locked) {
        return Err(EditorError::LockedElementInTransform(locked.id.clone()));
    }
    let projection = Projection::new(landscape_size, portrait_size)?;
    Ok(projection.project_all(elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::model::{partition_locked, ShapeType};

    fn sample() -> Vec<Element> {
        vec![
            Element::text("Mazal Tov")
                .with_id("t1")
                .at(1250.0, 937.5)
                .with_size(400.0, 100.0)
                .with_rotation(15.0),
            Element::shape(ShapeType::Circle)
                .with_id("s1")
                .at(100.0, 200.0)
                .with_size(300.0, 300.0),
            Element::image("photo.png").with_id("i1").at(10.0, 20.0),
        ]
    }

    #[test]
    fn test_identity_transform_is_noop() {
        let input = sample();
        let out = calculate_portrait_from_landscape(
            &input,
            CanvasSize::LANDSCAPE,
            CanvasSize::LANDSCAPE,
        )
        .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_transform_is_pure() {
        let input = sample();
        let before = input.clone();
        let a = calculate_portrait_from_landscape(&input, CanvasSize::LANDSCAPE, CanvasSize::PORTRAIT)
            .unwrap();
        let b = calculate_portrait_from_landscape(&input, CanvasSize::LANDSCAPE, CanvasSize::PORTRAIT)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(input, before);
    }

    #[test]
    fn test_centre_maps_to_centre() {
        let out = calculate_portrait_from_landscape(
            &sample(),
            CanvasSize::LANDSCAPE,
            CanvasSize::PORTRAIT,
        )
        .unwrap();
        let text = &out[0];
        assert_eq!(text.id, "t1");
        assert!((text.x - 937.5).abs() < 1e-9);
        assert!((text.y - 1250.0).abs() < 1e-9);
        assert_eq!(text.rotation, 15.0);
    }

    #[test]
    fn test_sizes_scale_by_average() {
        let projection = Projection::new(CanvasSize::LANDSCAPE, CanvasSize::PORTRAIT).unwrap();
        let avg = (0.75 + 2500.0 / 1875.0) / 2.0;
        assert!((projection.avg_scale() - avg).abs() < 1e-12);

        let out = projection.project_all(&sample());
        assert!((out[1].width.unwrap() - 300.0 * avg).abs() < 1e-9);
        // absent sizes stay absent
        assert_eq!(out[2].width, None);
        // 72 * 1.0416.. = 75
        assert_eq!(out[0].font_size(), Some(75.0));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = calculate_portrait_from_landscape(
            &sample(),
            CanvasSize::new(0, 1875),
            CanvasSize::PORTRAIT,
        )
        .unwrap_err();
        assert!(matches!(err, EditorError::InvalidCanvasSize { width: 0, .. }));
        assert!(Projection::new(CanvasSize::LANDSCAPE, CanvasSize::new(1875, 0)).is_err());
    }

    #[test]
    fn test_locked_input_rejected() {
        let mut input = sample();
        input.push(Element::image("frame.png").with_id("frame").locked());

        let err = calculate_portrait_from_landscape(
            &input,
            CanvasSize::LANDSCAPE,
            CanvasSize::PORTRAIT,
        )
        .unwrap_err();
        assert!(matches!(err, EditorError::LockedElementInTransform(ref id) if id == "frame"));

        let (_, unlocked) = partition_locked(&input);
        let out =
            calculate_portrait_from_landscape(&unlocked, CanvasSize::LANDSCAPE, CanvasSize::PORTRAIT)
                .unwrap();
        assert_eq!(out.len(), 3);
    }
}
