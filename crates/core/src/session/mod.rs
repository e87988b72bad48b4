pub mod camera_session;
pub mod display_list;
