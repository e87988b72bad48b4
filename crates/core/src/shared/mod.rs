pub mod bounding_box;
pub mod constants;
pub mod dimensions;
pub mod errors;
pub mod frame;
pub mod model_location;
pub mod model_resolver;
