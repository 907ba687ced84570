//! # Auto Lesson Bot
//!
//! 自动看完大学学习平台视频课的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 唯一持有浏览器会话（Browser + Page），只暴露能力
//! - `browser/` - 浏览器的启动与连接
//!
//! ### ② 能力层（Ports + Services）
//! - `ports/` - 三个能力接口：页面自动化 / 通知 / 输入
//! - `services/progress` - 从 style 文本解析进度百分比
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/lesson_orchestrator` - 一次运行的完整状态机
//! - `orchestrator/completion_poll` - 单节课的完成轮询
//! - `orchestrator/run_controller` - start / stop / status / screenshot
//!
//! ### ④ 前端层（Adapters）
//! - `telegram/` - Telegram 机器人：命令循环 + 通知 + 预置输入
//! - `console/` - 控制台：标准输入 + 日志通知
//!
//! 编排器只有一份，前端只是往里塞不同的能力实现

pub mod browser;
pub mod config;
pub mod console;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod ports;
pub mod services;
pub mod telegram;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AutomationError, Result};
pub use infrastructure::PageDriver;
pub use models::{RunState, UserCredentials};
pub use orchestrator::{LessonOrchestrator, RunController};
