pub mod encoded_form;
pub mod multipart;
pub mod upload_handler;
