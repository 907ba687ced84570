//! 测试用的假能力实现
//!
//! FakePage 按选择器脚本化返回值并记录所有操作，
//! FakeNotifier / FakeInput 对应另外两个能力接口

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use auto_lesson_bot::config::Config;
use auto_lesson_bot::error::{AutomationError, Result};
use auto_lesson_bot::ports::{CredentialSource, Notifier, PageAutomation, WaitMode};

/// 适合测试的配置：所有延迟压到毫秒级
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.timing.settle_ms = 0;
    config.timing.filter_settle_ms = 0;
    config.timing.lesson_settle_ms = 0;
    config.timing.poll_interval_ms = 5;
    config.timing.stall_timeout_ms = 80;
    config.timing.stop_wait_ms = 5_000;
    config.timing.ready_timeout_ms = 100;
    config
}

/// 脚本化的页面假件
///
/// count 和 attribute 都按队列消费：每次调用弹出一个值，
/// 队列只剩最后一个时开始重复它，方便模拟"先没有后有"的页面状态
#[derive(Default)]
pub struct FakePage {
    counts: Mutex<HashMap<String, VecDeque<usize>>>,
    texts: Mutex<HashMap<(String, usize), String>>,
    attributes: Mutex<HashMap<String, VecDeque<Option<String>>>>,
    failing_clicks: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<(String, usize)>>,
    pub fills: Mutex<Vec<(String, String)>>,
    pub navigations: Mutex<Vec<String>>,
    pub close_calls: AtomicUsize,
}

impl FakePage {
    pub fn set_count(&self, selector: &str, values: &[usize]) {
        self.counts
            .lock()
            .unwrap()
            .insert(selector.to_string(), values.iter().copied().collect());
    }

    pub fn set_text(&self, selector: &str, index: usize, text: &str) {
        self.texts
            .lock()
            .unwrap()
            .insert((selector.to_string(), index), text.to_string());
    }

    pub fn set_attribute_sequence(&self, selector: &str, values: Vec<Option<String>>) {
        self.attributes
            .lock()
            .unwrap()
            .insert(selector.to_string(), values.into());
    }

    pub fn fail_clicks_on(&self, selector: &str) {
        self.failing_clicks
            .lock()
            .unwrap()
            .push(selector.to_string());
    }

    pub fn clicks_on(&self, selector: &str) -> Vec<usize> {
        self.clicks
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == selector)
            .map(|(_, i)| *i)
            .collect()
    }

    fn pop_scripted<T: Clone>(map: &mut HashMap<String, VecDeque<T>>, selector: &str) -> Option<T> {
        let queue = map.get_mut(selector)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl PageAutomation for FakePage {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn navigate(&self, url: &str, _wait: WaitMode) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_ready(&self, _wait: WaitMode) -> Result<()> {
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let mut counts = self.counts.lock().unwrap();
        Ok(Self::pop_scripted(&mut counts, selector).unwrap_or(0))
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        if self
            .failing_clicks
            .lock()
            .unwrap()
            .iter()
            .any(|s| s == selector)
        {
            return Err(AutomationError::ElementNotFound(selector.to_string()));
        }

        self.clicks
            .lock()
            .unwrap()
            .push((selector.to_string(), index));
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        self.fills
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn inner_text(&self, selector: &str, index: usize) -> Result<String> {
        Ok(self
            .texts
            .lock()
            .unwrap()
            .get(&(selector.to_string(), index))
            .cloned()
            .unwrap_or_default())
    }

    async fn attribute(
        &self,
        selector: &str,
        _index: usize,
        _name: &str,
    ) -> Result<Option<String>> {
        let mut attributes = self.attributes.lock().unwrap();
        Ok(Self::pop_scripted(&mut attributes, selector).flatten())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(vec![0xAA; 8])
    }
}

/// 记录所有通知的假通知器
#[derive(Default)]
pub struct FakeNotifier {
    pub texts: Mutex<Vec<String>>,
    pub image_captions: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<(String, f64)>>,
}

impl FakeNotifier {
    /// 包含指定片段的文本消息条数
    pub fn texts_containing(&self, fragment: &str) -> usize {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.contains(fragment))
            .count()
    }

    pub fn progress_values(&self) -> Vec<f64> {
        self.progress.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_text(&self, message: &str) {
        self.texts.lock().unwrap().push(message.to_string());
    }

    async fn send_image(&self, _image: &[u8], caption: &str) {
        self.image_captions.lock().unwrap().push(caption.to_string());
    }

    async fn send_progress(&self, label: &str, percentage: f64) {
        self.progress
            .lock()
            .unwrap()
            .push((label.to_string(), percentage));
    }
}

/// 预置回答的假输入源
#[derive(Default)]
pub struct FakeInput {
    values: Mutex<HashMap<String, String>>,
}

impl FakeInput {
    pub fn with_value(self, prompt: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap()
            .insert(prompt.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl CredentialSource for FakeInput {
    async fn get_value(&self, prompt: &str) -> Result<String> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(prompt)
            .cloned()
            .unwrap_or_default())
    }
}
