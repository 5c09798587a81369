pub mod dense;
pub mod initialization;
pub mod mode;

pub use dense::Layer;
pub use mode::{ppow, LayerMode};
