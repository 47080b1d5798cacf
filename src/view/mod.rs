//! 视图构建和增量重建
//!
//! `RootBox` 持有由 `ViewConstructor` 构建的盒子树，以及记录哪个属性出现
//! 生成了哪些盒子的通知索引。变更通知经由索引解析成需要重建的最小盒子范围。

pub mod constructor;
pub mod declarative;
pub mod env;
pub mod rebuild;
pub mod root;

pub use constructor::{Frag, ViewConstructor};
pub use declarative::{DeclarativeConstructor, ViewOp, ViewSpec};
pub use env::ViewEnv;
pub use rebuild::{BuildPath, BuildRecord, RebuildEvent, RebuildRequest};
pub use root::RootBox;
