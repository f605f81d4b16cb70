//! Terminal front end: stdin controls, engine wiring and page rendering.
mod app;
mod effects;
mod input;
mod render;
mod selection_store;

pub use app::{run_app, Launch};
