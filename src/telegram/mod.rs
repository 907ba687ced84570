//! Telegram 前端
//!
//! 机器人只是编排器的一个适配器：命令循环解析操作者的指令转发给
//! RunController，`TelegramNotifier` 和 `TelegramInput` 分别实现
//! 通知和输入两个能力接口

pub mod bot;
pub mod input;
pub mod notifier;

pub use input::TelegramInput;
pub use notifier::TelegramNotifier;
