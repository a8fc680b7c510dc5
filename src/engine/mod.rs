/// ### English
/// Engine modules: the surface pool, the execution-domain contract, and the bundled domains.
///
/// ### 中文
/// 引擎模块：surface 池、执行域契约以及内置的执行域实现。
pub mod domain;
pub mod error;
pub mod gl;
pub mod mapper;
pub mod pool;
pub mod soft;
