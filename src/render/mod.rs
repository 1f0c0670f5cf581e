pub mod raster;
pub mod scene;
pub mod text;
