mod chain;
mod core;
mod extension;
pub mod html;
mod ops;
mod plugin;
mod ui;

pub use crate::chain::*;
pub use crate::core::*;
pub use crate::extension::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::ui::*;
