use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到已开启调试端口的浏览器并获取页面
///
/// 调试场景用：浏览器手动开着，程序反复连接，省去每次启动的开销
pub async fn connect_to_browser_and_page(port: u16) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        anyhow::anyhow!("连接浏览器失败 (端口 {}): {}", port, e)
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    // 复用已打开的第一个标签页，没有就新建
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    let page = match pages.into_iter().next() {
        Some(p) => p,
        None => browser.new_page("about:blank").await.map_err(|e| {
            error!("创建空白页面失败: {}", e);
            anyhow::anyhow!("创建空白页面失败: {}", e)
        })?,
    };

    Ok((browser, page))
}
