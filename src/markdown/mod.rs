pub mod compile;
pub mod render;
pub mod rich_text;

pub use compile::compile;
pub use render::assemble_report;
