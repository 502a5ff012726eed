//! Watermark text and compositing

mod bitmap_font;
mod compose;
mod font;
#[cfg(unix)]
mod font_discovery;
mod geometry;
mod text;

pub use compose::compose;
pub use font::FontRenderer;
#[cfg(unix)]
pub use font_discovery::list_fonts;
pub use text::{WatermarkOptions, assemble_text};
