pub mod render;

pub use render::PageGenerator;
