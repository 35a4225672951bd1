//! Target precision of loaded embeddings.

use std::fmt::{Debug, Display};
use std::num::ParseFloatError;
use std::str::FromStr;

mod sealed {
    pub trait Sealed {}
}

/// Floating point type that embedding matrices can be loaded into.
///
/// This trait is implemented for `f32` and `f64`. Text components are
/// parsed directly into the target type, binary elements are converted
/// from their declared type.
pub trait Float:
    Copy
    + Debug
    + Default
    + Display
    + PartialEq
    + FromStr<Err = ParseFloatError>
    + Send
    + Sync
    + 'static
    + sealed::Sealed
{
    /// Name of the type, as used in diagnostics.
    const NAME: &'static str;

    /// Convert a single-precision value.
    fn from_f32(v: f32) -> Self;

    /// Convert a double-precision value.
    fn from_f64(v: f64) -> Self;
}

macro_rules! float_impl {
    ($type:ty, $name:expr) => {
        impl sealed::Sealed for $type {}

        impl Float for $type {
            const NAME: &'static str = $name;

            #[allow(clippy::unnecessary_cast)]
            fn from_f32(v: f32) -> Self {
                v as $type
            }

            #[allow(clippy::unnecessary_cast)]
            fn from_f64(v: f64) -> Self {
                v as $type
            }
        }
    };
}

float_impl!(f32, "float32");
float_impl!(f64, "float64");
