use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Amount of dimensions kept inline for a [Shape].
/// Tensors with more dimensions spill into the heap.
pub(super) const SHAPE_TINYVEC_SIZE: usize = 4;

/// Dimensions of a tensor, outermost first. An empty shape is a scalar.
pub type Shape = SmallVec<[usize; SHAPE_TINYVEC_SIZE]>;

/// Statically known tensor flowing through a data node.
///
/// The elements are shared, cloning a [ConstValue] never copies them.
/// Values are opaque to the pass, they are only checked for presence.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstValue {
    shape: Shape,
    elements: Arc<[f64]>,
}

impl ConstValue {
    /// Returns a new [ConstValue] with `shape` and row major `elements`.
    ///
    /// Returns [None] if the number of elements doesn't match the shape.
    pub fn new<S: Into<Shape>, E: Into<Arc<[f64]>>>(shape: S, elements: E) -> Option<Self> {
        let shape = shape.into();
        let elements = elements.into();
        let len = shape.iter().try_fold(1usize, |len, dim| len.checked_mul(*dim))?;
        if len != elements.len() {
            return None;
        }
        Some(Self { shape, elements })
    }

    /// Returns a new rank 0 [ConstValue].
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Shape::new(),
            elements: Arc::from(vec![value]),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn elements(&self) -> &[f64] {
        &self.elements
    }
}

impl Display for ConstValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.shape.is_empty() {
            return write!(f, "{}", self.elements[0]);
        }
        write!(f, "tensor{:?}", self.shape.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_new_checks_element_count() {
        let shape: Shape = smallvec![2, 3];
        assert!(ConstValue::new(shape.clone(), vec![0.; 6]).is_some());
        assert!(ConstValue::new(shape, vec![0.; 5]).is_none());
    }

    #[test]
    fn test_new_rejects_overflowing_shape() {
        let shape: Shape = smallvec![usize::MAX, 2];
        assert!(ConstValue::new(shape, vec![0.; 2]).is_none());
        let empty: Shape = smallvec![usize::MAX, 0];
        assert!(ConstValue::new(empty, Vec::<f64>::new()).is_some());
    }

    #[test]
    fn test_scalar() {
        let v = ConstValue::scalar(1.);
        assert!(v.shape().is_empty());
        assert_eq!(v.elements(), &[1.]);
        assert_eq!(v.to_string(), "1");
    }

    #[test]
    fn test_clone_shares_elements() {
        let v = ConstValue::new(Shape::from_slice(&[2]), vec![1., 2.]).unwrap();
        let w = v.clone();
        assert!(std::ptr::eq(v.elements(), w.elements()));
        assert_eq!(w.to_string(), "tensor[2]");
    }
}
