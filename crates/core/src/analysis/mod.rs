pub mod analyze_image_use_case;
pub mod capture_session;
pub mod face_analyzer;
pub mod session_logger;
