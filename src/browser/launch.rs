use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::BrowserSettings;

/// 启动浏览器并创建一个空白页面
///
/// 看视频默认用有头模式，站点的播放器在无头环境下行为不稳定。
/// 音频始终静音，挂机刷课不需要声音
pub async fn launch_browser_and_page(settings: &BrowserSettings) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器...");

    let mut builder = BrowserConfig::builder();

    if settings.headless {
        builder = builder.new_headless_mode().args(vec![
            "--mute-audio",
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
        ]);
    } else {
        builder = builder
            .with_head()
            .args(vec!["--mute-audio", "--start-maximized"]);
    }

    if let Some(executable) = &settings.executable {
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

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

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 浏览器就绪");

    Ok((browser, page))
}
