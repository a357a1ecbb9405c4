mod html;
mod patterns;

pub use html::extract;
