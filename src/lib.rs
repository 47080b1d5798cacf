//! boxview - 结构化富文本文档的显示核心
//!
//! 模块结构：
//! - core: 几何类型和错误定义
//! - data: 对象存储接口和内存实现
//! - text: 文本格式、字体注册表、分段引擎及其调度
//! - boxes: 盒子树、布局、断行、懒加载盒子、命中测试
//! - notify: 通知索引（属性出现 → 盒子范围）
//! - view: 视图构建、重建调度和根盒子
//! - paint: 显示列表和渲染后端

pub mod boxes;
pub mod core;
pub mod data;
pub mod logging;
pub mod notify;
pub mod paint;
pub mod settings;
pub mod text;
pub mod view;
