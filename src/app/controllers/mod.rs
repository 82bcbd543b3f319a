//! # Controllers
//!
//! Phase-5 modules that bind the router and content to the views.

pub mod navigation_controller;
pub mod section_controller;

pub use navigation_controller::{NavigationController, NavigationLayout};
pub use section_controller::{section_container, SectionController, SECTION_CONTAINER_PREFIX};
