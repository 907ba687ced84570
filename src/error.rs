//! 应用程序错误类型
//!
//! 取消（Cancelled）和视频停滞（ProgressStalled）是独立的变体，
//! 运行边界依赖它们区分"用户主动停止"、"超时"和普通失败

use thiserror::Error;

/// 自动化流程中可能出现的错误
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 浏览器会话错误（启动、连接、CDP 通信）
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// 导航失败
    #[error("导航到 {url} 失败: {message}")]
    Navigation { url: String, message: String },

    /// 页面元素未找到
    #[error("页面元素未找到: {0}")]
    ElementNotFound(String),

    /// 登录失败
    #[error("登录失败: {0}")]
    LoginFailed(String),

    /// 在两个筛选器下都没有找到课程
    #[error("未找到课程: {0}")]
    CourseNotFound(String),

    /// 视频进度长时间没有变化
    #[error("超时: 视频进度在 {percentage}% 停滞超过 {minutes} 分钟")]
    ProgressStalled { percentage: f64, minutes: u64 },

    /// 用户请求停止，运行协作式退出
    #[error("自动化已被手动停止")]
    Cancelled,

    /// 已有一个自动化在运行，新的启动请求被拒绝
    #[error("已有自动化在运行中")]
    AlreadyRunning,

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 获取用户输入失败
    #[error("获取输入失败: {0}")]
    Input(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// 是否为用户主动取消
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AutomationError::Cancelled)
    }

    /// 是否为视频停滞超时
    pub fn is_stalled(&self) -> bool {
        matches!(self, AutomationError::ProgressStalled { .. })
    }
}

impl From<chromiumoxide::error::CdpError> for AutomationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AutomationError::Browser(err.to_string())
    }
}

/// 应用程序结果类型
pub type Result<T, E = AutomationError> = std::result::Result<T, E>;
