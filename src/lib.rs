mod composer;
mod generator;
mod model;
mod render;

pub use composer::*;
pub use generator::*;
pub use model::config::*;
pub use model::score::*;
pub use render::channels::*;
pub use render::smf::*;
