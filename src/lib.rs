#![allow(
    dead_code,
    // sometimes we want to model the postscript names better
    clippy::enum_variant_names,
    clippy::large_enum_variant,
    clippy::manual_range_contains,
)]

//! An interpreter for the PostScript page-description language, targeted at
//! rendering EPS onto a raster canvas
//!
//! The embedder hands [`Interpreter::load`] the program bytes and drives it
//! against a [`GraphicsContext`] — either the built-in software
//! [`CanvasContext`], or anything else implementing the trait (the
//! [`RecordingContext`] records calls for inspection). Virtual-memory
//! snapshots, packed-array semantics, and the file-system namespace are
//! intentionally stubbed

mod builtin;
mod data_structures;
mod error;
mod filter;
mod font;
mod geometry;
mod graphics;
mod graphics_op;
mod interpreter;
mod lex;
mod object;
mod operator;
mod render;
mod scanner;

pub use crate::{
    data_structures::Matrix,
    error::{PostScriptError, PostScriptResult},
    filter::FilterKind,
    font::{FontDescription, FontHost, FontInfo},
    geometry::{BoundingBox, Point},
    graphics::{
        default_ctm, Color, DashPattern, FillRule, GraphicsContext, GraphicsState, LineCap,
        LineJoin,
    },
    interpreter::{Interpreter, Limits, Step},
    object::{Access, Object, ObjectKind, PostScriptString, TypeSet, Vm},
    render::{Canvas, CanvasContext, RecordedCall, RecordingContext},
    scanner::DocumentMetadata,
};
