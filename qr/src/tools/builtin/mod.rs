//! Built-in tools for solving quiz items

mod command;
mod dependencies;
mod download;
mod encode_image;
mod ocr;
mod post_request;
mod render;
mod run_code;
mod transcribe;

pub use dependencies::AddDependenciesTool;
pub use download::DownloadFileTool;
pub use encode_image::EncodeImageTool;
pub use ocr::OcrImageTool;
pub use post_request::PostRequestTool;
pub use render::RenderPageTool;
pub use run_code::RunCodeTool;
pub use transcribe::TranscribeAudioTool;
