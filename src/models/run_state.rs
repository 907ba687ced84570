//! 运行状态
//!
//! 同一时刻最多只有一个自动化在跑。`running` 既是状态也是准入门闸：
//! `try_begin` 用 compare-exchange 抢占，抢不到的启动请求直接被拒绝而不是排队。
//! 外部对运行中任务的唯一写入手段是 `request_cancel`，一个单向标志，
//! 在本次运行内一旦置位就不会再清除。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// 单次运行的共享状态
///
/// 由编排器在运行过程中更新，命令层只读（状态查询）或置取消标志
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    cancel_requested: AtomicBool,
    subject: Mutex<String>,
    current_lesson: Mutex<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试开始一次新的运行
    ///
    /// 成功时重置取消标志和展示字段并返回 true；
    /// 已有运行在进行时返回 false，调用方应当拒绝本次启动
    pub fn try_begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.cancel_requested.store(false, Ordering::SeqCst);
        self.subject.lock().unwrap().clear();
        self.current_lesson.lock().unwrap().clear();
        true
    }

    /// 运行结束（正常、出错或被取消都走这里）
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 请求停止当前运行
    ///
    /// 没有运行时是空操作，返回 false
    pub fn request_cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn set_subject(&self, subject: &str) {
        *self.subject.lock().unwrap() = subject.to_string();
    }

    pub fn set_current_lesson(&self, label: &str) {
        *self.current_lesson.lock().unwrap() = label.to_string();
    }

    /// 渲染给操作者看的状态文本
    pub fn status_text(&self) -> String {
        if !self.is_running() {
            return "自动化未运行".to_string();
        }

        format!(
            "自动化运行中\n科目: {}\n当前课程: {}",
            self.subject.lock().unwrap(),
            self.current_lesson.lock().unwrap()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_run_gate() {
        let state = RunState::new();
        assert!(state.try_begin());
        // 第二次启动被拒绝
        assert!(!state.try_begin());

        state.finish();
        assert!(state.try_begin());
    }

    #[test]
    fn test_cancel_is_noop_when_idle() {
        let state = RunState::new();
        assert!(!state.request_cancel());
        assert!(!state.cancel_requested());
    }

    #[test]
    fn test_begin_resets_cancel_flag() {
        let state = RunState::new();
        assert!(state.try_begin());
        assert!(state.request_cancel());
        assert!(state.cancel_requested());

        state.finish();
        assert!(state.try_begin());
        assert!(!state.cancel_requested());
    }

    #[test]
    fn test_status_text() {
        let state = RunState::new();
        assert_eq!(state.status_text(), "自动化未运行");

        state.try_begin();
        state.set_subject("Algebra");
        state.set_current_lesson("视频课 3/12");
        let text = state.status_text();
        assert!(text.contains("Algebra"));
        assert!(text.contains("视频课 3/12"));
    }
}
