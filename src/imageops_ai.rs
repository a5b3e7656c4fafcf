mod alpha_mask_applicable;

pub use alpha_mask_applicable::AlphaMaskApplicable;

use num_traits::{Bounded, NumCast};
use std::any::TypeId;

pub fn is_floating_point<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<f32>()
}

/// Value of a fully opaque / fully set channel: 1.0 for floats, `MAX` for integers.
pub fn get_max_value<T: Bounded + NumCast + 'static>() -> T {
    if is_floating_point::<T>() {
        <T as NumCast>::from(1.0).unwrap_or_else(T::max_value)
    } else {
        T::max_value()
    }
}
