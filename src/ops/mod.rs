pub mod bucket;
pub mod color_match;
pub mod expand;
pub mod flood_fill;
pub mod grid;
