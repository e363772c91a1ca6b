pub mod app;
pub mod clock;
pub mod config;
pub mod context;
pub mod driver;
pub mod geometry;
pub mod gui;
pub mod mesh;
pub mod profiling;
pub mod render;
pub mod texture;
pub mod uniform;

pub use self::{
    app::*, clock::*, config::*, context::*, driver::*, geometry::*, gui::*, mesh::*, profiling::*,
    render::*, texture::*, uniform::*,
};
