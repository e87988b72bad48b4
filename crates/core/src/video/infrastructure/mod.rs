pub mod camera_source;
pub mod image_file_writer;
pub mod still_image_source;
