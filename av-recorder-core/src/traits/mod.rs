pub mod audio_provider;
pub mod clock;
pub mod container_writer;
pub mod pixel_converter;
pub mod recorder_delegate;
pub mod storage_sink;
