pub mod bytes;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
