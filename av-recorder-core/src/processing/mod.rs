pub mod audio_retiming;
pub mod container_format;
pub mod frame_throttle;
pub mod pcm;
pub mod pixel_conversion;
