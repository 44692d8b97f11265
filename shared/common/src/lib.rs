pub use arrayvec::{self, ArrayVec};
pub use cgmath;
pub use derive_more;
pub use thiserror::Error;

pub use logging;
pub use logging::prelude::*;

pub use std::fmt::{Debug, Display, Formatter};
pub use std::marker::PhantomData;

pub type F = f32;
pub type Vector2 = cgmath::Vector2<F>;
pub type Vector3 = cgmath::Vector3<F>;
pub type Vector4 = cgmath::Vector4<F>;
pub type Matrix2 = cgmath::Matrix2<F>;
pub type Matrix3 = cgmath::Matrix3<F>;
pub type Matrix4 = cgmath::Matrix4<F>;

pub type BoxedResult<T> = Result<T, Box<dyn std::error::Error>>;
