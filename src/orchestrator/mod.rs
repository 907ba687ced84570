//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整个刷课流程的调度，是系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `run_controller` - 运行控制器
//! - 对外暴露 start / stop / status / screenshot
//! - 用 RunState 做单运行准入（同一时刻最多一个运行）
//! - 把实际运行丢进独立任务，停止时做有界等待
//!
//! ### `lesson_orchestrator` - 课程编排器
//! - 一次运行的完整状态机：连接 → 登录 → 关引导 → 选科目 →
//!   找课程 → 重置列表 → 展开课程 → 逐节看视频
//! - 每次运行新建实例，运行结束即丢弃，不留全局状态
//!
//! ### `completion_poll` - 完成轮询
//! - 盯着单节课的进度条直到 100%
//! - 停滞检测与节流的进度推送
//!
//! ## 层次关系
//!
//! ```text
//! run_controller (管理运行生命周期)
//!     ↓
//! lesson_orchestrator (处理一次运行)
//!     ↓
//! completion_poll (处理单节课)
//!     ↓
//! ports (能力接口: 页面 / 通知 / 输入)
//!     ↓
//! infrastructure (基础设施: PageDriver)
//! ```

pub mod completion_poll;
pub mod lesson_orchestrator;
pub mod run_controller;

pub use lesson_orchestrator::LessonOrchestrator;
pub use run_controller::RunController;
