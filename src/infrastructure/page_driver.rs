//! 页面驱动 - 基础设施层
//!
//! 唯一持有浏览器会话（Browser + Page）的地方，向上只暴露页面操作能力。
//! 编排器、前端都拿不到 Page 本体，只能通过 `PageAutomation` 接口操作

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Element, Page};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{connect_to_browser_and_page, launch_browser_and_page};
use crate::config::{BrowserSettings, TimingSettings};
use crate::error::{AutomationError, Result};
use crate::ports::{PageAutomation, WaitMode};

/// 一次运行期间的浏览器会话
struct Session {
    browser: Browser,
    page: Page,
    /// 是本程序启动的浏览器才在 close 时真正关掉；
    /// 通过调试端口连上的浏览器只断开连接
    launched: bool,
}

/// 基于 CDP 的页面驱动
pub struct PageDriver {
    settings: BrowserSettings,
    ready_timeout: Duration,
    session: Mutex<Option<Session>>,
}

impl PageDriver {
    pub fn new(settings: BrowserSettings, timing: &TimingSettings) -> Self {
        Self {
            settings,
            ready_timeout: timing.ready_timeout(),
            session: Mutex::new(None),
        }
    }

    /// 当前会话的页面句柄
    async fn page(&self) -> Result<Page> {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .map(|s| s.page.clone())
            .ok_or_else(|| AutomationError::Browser("浏览器会话未初始化".to_string()))
    }

    /// 按选择器查找元素，`//` 开头按 XPath，其余按 CSS
    async fn elements(&self, page: &Page, selector: &str) -> Result<Vec<Element>> {
        let found = if selector.starts_with('/') || selector.starts_with("(/") {
            page.find_xpaths(selector).await
        } else {
            page.find_elements(selector).await
        };

        // 零匹配在部分 CDP 查询下表现为错误，这里统一归一成空列表
        match found {
            Ok(elements) => Ok(elements),
            Err(e) => {
                debug!("选择器 {} 查找失败: {}", selector, e);
                Ok(Vec::new())
            }
        }
    }

    /// 取第 index 个匹配元素，不存在时报元素未找到
    async fn element_at(&self, page: &Page, selector: &str, index: usize) -> Result<Element> {
        let mut elements = self.elements(page, selector).await?;
        if index >= elements.len() {
            return Err(AutomationError::ElementNotFound(format!(
                "{} (第 {} 个, 共 {} 个)",
                selector,
                index + 1,
                elements.len()
            )));
        }
        Ok(elements.swap_remove(index))
    }
}

#[async_trait]
impl PageAutomation for PageDriver {
    async fn connect(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let (browser, page, launched) = match self.settings.debug_port {
            Some(port) => {
                let (browser, page) = connect_to_browser_and_page(port)
                    .await
                    .map_err(|e| AutomationError::Browser(e.to_string()))?;
                (browser, page, false)
            }
            None => {
                let (browser, page) = launch_browser_and_page(&self.settings)
                    .await
                    .map_err(|e| AutomationError::Browser(e.to_string()))?;
                (browser, page, true)
            }
        };

        *guard = Some(Session {
            browser,
            page,
            launched,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return Ok(());
        };

        if session.launched {
            info!("关闭浏览器...");
            if let Err(e) = session.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            let _ = session.browser.wait().await;
        }

        info!("✅ 浏览器会话已释放");
        Ok(())
    }

    async fn navigate(&self, url: &str, wait: WaitMode) -> Result<()> {
        let page = self.page().await?;
        info!("导航到: {}", url);

        page.goto(url)
            .await
            .map_err(|e| AutomationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.wait_ready(wait).await
    }

    async fn wait_ready(&self, wait: WaitMode) -> Result<()> {
        let page = self.page().await?;
        let step = Duration::from_millis(200);
        let attempts = (self.ready_timeout.as_millis() / step.as_millis()).max(1);

        for _ in 0..attempts {
            let state = page
                .evaluate("document.readyState")
                .await?
                .into_value::<serde_json::Value>()
                .unwrap_or(serde_json::Value::Null);

            let ready = match (wait, state.as_str()) {
                (_, Some("complete")) => true,
                (WaitMode::DomReady, Some("interactive")) => true,
                _ => false,
            };
            if ready {
                return Ok(());
            }
            sleep(step).await;
        }

        // 页面迟迟不 ready 不算硬错误，后续的元素查找会暴露真实问题
        warn!("等待页面加载超时，继续执行");
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let page = self.page().await?;
        Ok(self.elements(&page, selector).await?.len())
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        let page = self.page().await?;
        let element = self.element_at(&page, selector, index).await?;
        let _ = element.scroll_into_view().await;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let page = self.page().await?;
        let element = self.element_at(&page, selector, 0).await?;

        element.click().await?;
        // 先清空旧值，type_str 只会追加
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn inner_text(&self, selector: &str, index: usize) -> Result<String> {
        let page = self.page().await?;
        let element = self.element_at(&page, selector, index).await?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(
        &self,
        selector: &str,
        index: usize,
        name: &str,
    ) -> Result<Option<String>> {
        let page = self.page().await?;
        let element = self.element_at(&page, selector, index).await?;
        Ok(element.attribute(name).await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.page().await?;
        let bytes = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;
        Ok(bytes)
    }
}
