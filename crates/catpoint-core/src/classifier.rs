//! Cat classifier port.

use std::sync::Arc;

use crate::error::ClassifierError;

/// Minimum confidence, in percent, for a cat label to count.
pub const CAT_CONFIDENCE_THRESHOLD: f32 = 50.0;

/// Labels an image as containing a cat or not.
///
/// Implementations may be slow (a remote vision API, an external process).
/// They must fail rather than answer `false` when the image is malformed or
/// the backend cannot be reached.
pub trait CatClassifier {
    /// Returns whether a cat is present with at least `confidence_threshold`
    /// percent confidence (`0.0..=100.0`).
    fn contains_cat(&self, image: &[u8], confidence_threshold: f32)
        -> Result<bool, ClassifierError>;
}

impl<T: CatClassifier + ?Sized> CatClassifier for Arc<T> {
    fn contains_cat(
        &self,
        image: &[u8],
        confidence_threshold: f32,
    ) -> Result<bool, ClassifierError> {
        (**self).contains_cat(image, confidence_threshold)
    }
}

impl<T: CatClassifier + ?Sized> CatClassifier for Box<T> {
    fn contains_cat(
        &self,
        image: &[u8],
        confidence_threshold: f32,
    ) -> Result<bool, ClassifierError> {
        (**self).contains_cat(image, confidence_threshold)
    }
}
