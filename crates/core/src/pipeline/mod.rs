pub mod artifact_namer;
pub mod detection_loop;
pub mod extract_faces_use_case;
pub mod pipeline_logger;
