//! 核心类型
//!
//! 提供各模块共用的基础定义：
//! - geom: 几何类型
//! - error: 错误分类

pub mod error;
pub mod geom;

pub use error::{
    BuildError, IndexError, LayoutError, PathError, SettingsError, ShapeError, ViewError,
};
pub use geom::{Point, Rect, Size};
