//! The library code for the `postlist` static site generator. A build is a
//! single pass over an input directory:
//!
//! 1. Each Markdown document is converted to HTML ([`crate::markdown`]), its
//!    title and date are extracted ([`crate::extract`]), and it is written as
//!    a page through the page template ([`crate::template::render_page`]).
//! 2. Every other file is copied to the same relative path in the output.
//! 3. The posts collected along the way ([`crate::post`]) are listed newest
//!    first through the listing template ([`crate::template::expand`]).
//!
//! [`crate::build`] ties the steps together and decides which failures stop
//! the build and which only skip a file.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod extract;
pub mod htmlrenderer;
pub mod link;
pub mod markdown;
pub mod post;
pub mod template;
