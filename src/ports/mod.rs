//! 外部能力接口
//!
//! 编排器只依赖这三个 trait，不直接接触浏览器、Telegram 或控制台：
//!
//! - `PageAutomation` - 页面自动化能力（生产实现见 `infrastructure/page_driver`）
//! - `Notifier` - 向操作者推送消息和图片
//! - `CredentialSource` - 获取账号、密码、科目等输入
//!
//! 控制台前端和 Telegram 前端各自提供一套实现，编排器本身只有一份

use async_trait::async_trait;

use crate::error::Result;
use crate::models::UserCredentials;

/// 页面加载的等待模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// DOM 解析完成即可
    DomReady,
    /// 等到页面网络请求安静下来
    NetworkIdle,
}

/// 页面自动化能力
///
/// 选择器字符串以 `//` 开头的按 XPath 解释，其余按 CSS 解释。
/// 所有按下标操作的方法都以当时页面上的文档顺序为准
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// 获取浏览器会话并打开页面
    async fn connect(&self) -> Result<()>;

    /// 关闭浏览器会话，可重复调用
    async fn close(&self) -> Result<()>;

    /// 导航到指定地址并等待加载
    async fn navigate(&self, url: &str, wait: WaitMode) -> Result<()>;

    /// 等待当前页面加载完成
    async fn wait_ready(&self, wait: WaitMode) -> Result<()>;

    /// 匹配选择器的元素个数
    async fn count(&self, selector: &str) -> Result<usize>;

    /// 点击第 index 个匹配元素
    async fn click(&self, selector: &str, index: usize) -> Result<()>;

    /// 清空并填写第一个匹配的输入框
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// 第 index 个匹配元素的可见文本
    async fn inner_text(&self, selector: &str, index: usize) -> Result<String>;

    /// 第 index 个匹配元素的属性值
    async fn attribute(&self, selector: &str, index: usize, name: &str)
        -> Result<Option<String>>;

    /// 截取当前页面
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// 消息通知能力
///
/// 发送失败只记日志不向上传播，通知问题不应该盖过主流程的错误
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送一条文本消息
    async fn send_text(&self, message: &str);

    /// 发送一张图片
    async fn send_image(&self, image: &[u8], caption: &str);

    /// 发送课程进度（渲染为进度条）
    async fn send_progress(&self, label: &str, percentage: f64);
}

/// 用户输入能力
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// 按提示语获取一个值
    async fn get_value(&self, prompt: &str) -> Result<String>;

    /// 交互式地收集完整凭据
    async fn get_credentials(&self) -> Result<UserCredentials> {
        let username = self.get_value("请输入账号:").await?;
        let password = self.get_value("请输入密码:").await?;
        Ok(UserCredentials::new(username, password, ""))
    }
}
