pub mod ffmpeg_source;
pub mod frame_annotator;
pub mod image_file_loader;
pub mod image_file_writer;
