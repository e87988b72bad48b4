//! Webcam face detection core: a periodic detect-and-draw loop, on-demand
//! face extraction and the upload acknowledgement endpoint.

pub mod detection;
pub mod pipeline;
pub mod rendering;
pub mod session;
pub mod shared;
pub mod upload;
pub mod video;
