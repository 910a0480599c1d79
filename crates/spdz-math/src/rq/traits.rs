//! Traits associated with polynomial operations.

use super::{Context, Representation};
use crate::Result;
use std::sync::Arc;

/// Conversions to create polynomials.
pub trait TryConvertFrom<T>
where
    Self: Sized,
{
    /// Attempt to convert the `value` into a polynomial with a specific
    /// context and under a specific representation.
    fn try_convert_from(
        value: T,
        ctx: &Arc<Context>,
        representation: Representation,
    ) -> Result<Self>;
}
