use vtsp_core::depend::{SplitPredicate, TriangleContext};

/// Leaves the triangulation unrefined.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverSplit;

impl SplitPredicate for NeverSplit {
    fn split(&self, _triangle: &TriangleContext) -> bool {
        false
    }
}

/// Splits triangles whose area exceeds the limit.
#[derive(Clone, Copy, Debug)]
pub struct MaxAreaSplit(pub f64);

impl SplitPredicate for MaxAreaSplit {
    fn split(&self, triangle: &TriangleContext) -> bool {
        triangle.area() > self.0
    }
}
