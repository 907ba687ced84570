//! 程序配置
//!
//! 配置来源优先级：环境变量 > config.toml > 默认值。
//! 页面选择器也是配置的一部分：目标站点的 DOM 结构随时可能改动，
//! 选择器必须能在不改代码的情况下更新。

use serde::Deserialize;
use std::time::Duration;

use crate::error::{AutomationError, Result};

/// Bot Token 占位符，检测到它说明用户还没有改 config.toml
pub const TOKEN_PLACEHOLDER: &str = "在这里填入BOT_TOKEN";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram 机器人配置
    pub telegram: TelegramSettings,
    /// 大学站点与账号配置
    pub university: UniversitySettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 各类等待时长
    pub timing: TimingSettings,
    /// 页面选择器
    pub selectors: Selectors,
    /// 单节课播放失败时是否中止整个运行
    ///
    /// 播放失败通常意味着站点层面的问题，继续跑下去大概率还会失败，
    /// 所以默认中止
    pub abort_on_lesson_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramSettings::default(),
            university: UniversitySettings::default(),
            browser: BrowserSettings::default(),
            timing: TimingSettings::default(),
            selectors: Selectors::default(),
            abort_on_lesson_error: true,
        }
    }
}

/// Telegram 机器人配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// BotFather 发放的 Token
    pub bot_token: String,
    /// 唯一被授权的会话 ID
    pub chat_id: i64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: TOKEN_PLACEHOLDER.to_string(),
            chat_id: 0,
        }
    }
}

/// 大学站点与账号配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UniversitySettings {
    /// 学习平台入口地址
    pub url: String,
    /// 保存的账号
    pub username: String,
    /// 保存的密码
    pub password: String,
    /// 默认科目
    pub default_subject: String,
    /// 是否信任并使用上面保存的账号密码
    pub save_credentials: bool,
}

impl Default for UniversitySettings {
    fn default() -> Self {
        Self {
            url: "https://lms.mercatorum.multiversity.click/".to_string(),
            username: String::new(),
            password: String::new(),
            default_subject: String::new(),
            save_credentials: false,
        }
    }
}

/// 浏览器配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 是否无头模式（看视频时通常需要有头，站点会检测播放窗口）
    pub headless: bool,
    /// 浏览器可执行文件路径，留空则使用系统默认 Chromium
    pub executable: Option<String>,
    /// 调试端口，设置后连接已有浏览器而不是新启动一个
    pub debug_port: Option<u16>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            debug_port: None,
        }
    }
}

/// 各类等待时长（毫秒）
///
/// 站点的界面在页面加载完成后仍会异步渲染，且没有可靠的"渲染完成"信号，
/// 所以大部分操作后都跟一个固定的安定延迟
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// 登录、打开课程等大动作后的安定延迟
    pub settle_ms: u64,
    /// 点击筛选按钮后的安定延迟
    pub filter_settle_ms: u64,
    /// 点击单节课后的安定延迟
    pub lesson_settle_ms: u64,
    /// 进度轮询间隔
    pub poll_interval_ms: u64,
    /// 视频进度停滞多久判定为超时
    pub stall_timeout_ms: u64,
    /// 停止运行时最多等待多久再强制清理
    pub stop_wait_ms: u64,
    /// 等待页面 readyState 的上限
    pub ready_timeout_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            settle_ms: 6_000,
            filter_settle_ms: 3_000,
            lesson_settle_ms: 2_000,
            poll_interval_ms: 10_000,
            stall_timeout_ms: 300_000,
            stop_wait_ms: 30_000,
            ready_timeout_ms: 30_000,
        }
    }
}

impl TimingSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn filter_settle(&self) -> Duration {
        Duration::from_millis(self.filter_settle_ms)
    }

    pub fn lesson_settle(&self) -> Duration {
        Duration::from_millis(self.lesson_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    pub fn stop_wait(&self) -> Duration {
        Duration::from_millis(self.stop_wait_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// 停滞超时换算为分钟，用于提示文案
    pub fn stall_timeout_minutes(&self) -> u64 {
        self.stall_timeout_ms / 60_000
    }
}

/// 页面选择器
///
/// 以 `//` 开头的按 XPath 解释，其余按 CSS 解释。
/// 课程卡片选择器中的 `{subject}` 会被替换为实际科目名
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// 登录页用户名输入框
    pub username_input: String,
    /// 登录页密码输入框
    pub password_input: String,
    /// 登录按钮
    pub login_button: String,
    /// walkme 新手引导遮罩的探测选择器
    pub walkme_probe: String,
    /// walkme 遮罩的关闭控件
    pub walkme_close: String,
    /// "Da Completare"（待完成）筛选按钮
    pub filter_to_complete: String,
    /// "Da Iniziare"（待开始）筛选按钮
    pub filter_to_start: String,
    /// 课程卡片里的视频课链接，带 {subject} 占位符
    pub course_link: String,
    /// 课程组折叠开关（汇总行，文本含 "lezioni"）
    pub lessons_toggle: String,
    /// 普通课程行（排除汇总行）
    pub lesson_rows: String,
    /// 视频课行
    pub video_rows: String,
    /// 视频进度条
    pub progress_bar: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username_input: "#username".to_string(),
            password_input: "#password".to_string(),
            login_button: "//button/span[text()='Accedi']".to_string(),
            walkme_probe: "div[id*='walkme-visual-design']".to_string(),
            walkme_close: "//*[@id='border-49e0cc4f-5895-5af9-52ab-b19efc02d195']"
                .to_string(),
            filter_to_complete: "//button[text()='Da Completare ']".to_string(),
            filter_to_start: "//button[text()='Da Iniziare ']".to_string(),
            course_link: concat!(
                "//span[contains(normalize-space(.), \"{subject}\")]",
                "/ancestor::div[.//a[contains(@href, \"/videolezioni/\")]][1]",
                "//a[contains(@href, \"/videolezioni/\")]"
            )
            .to_string(),
            lessons_toggle: concat!(
                "//div[contains(@class, \"align-left flex items-center h-full ",
                "leading-normal font-medium\") and (contains(.,\"lezioni\"))]"
            )
            .to_string(),
            lesson_rows: concat!(
                "//div[contains(@class, \"align-left flex items-center h-full ",
                "leading-normal font-medium\") and not(contains(.,\"lezioni\"))]"
            )
            .to_string(),
            video_rows: "//div[contains(@class, \"w-1/12 text-xs md:text-xs\")]"
                .to_string(),
            progress_bar: concat!(
                "//div[contains(@class,",
                "\"bg-platform-primary h-1 rounded-full absolute\")]"
            )
            .to_string(),
        }
    }
}

impl Selectors {
    /// 把科目名填进课程卡片选择器
    pub fn course_link_for(&self, subject: &str) -> String {
        self.course_link.replace("{subject}", subject)
    }
}

impl Config {
    /// 从 config.toml（可选）和环境变量加载配置
    pub fn load(path: &str) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| AutomationError::Config(format!("解析 {} 失败: {}", path, e)))?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// 环境变量覆盖（与 config.toml 中的键一一对应）
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Ok(v) = std::env::var("CHAT_ID") {
            if let Ok(id) = v.parse() {
                self.telegram.chat_id = id;
            }
        }
        if let Ok(v) = std::env::var("UNIVERSITY_URL") {
            self.university.url = v;
        }
        if let Ok(v) = std::env::var("UNIVERSITY_USERNAME") {
            self.university.username = v;
        }
        if let Ok(v) = std::env::var("UNIVERSITY_PASSWORD") {
            self.university.password = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_SUBJECT") {
            self.university.default_subject = v;
        }
        if let Ok(v) = std::env::var("SAVE_CREDENTIALS") {
            if let Ok(b) = v.parse() {
                self.university.save_credentials = b;
            }
        }
        if let Ok(v) = std::env::var("BROWSER_HEADLESS") {
            if let Ok(b) = v.parse() {
                self.browser.headless = b;
            }
        }
        if let Ok(v) = std::env::var("BROWSER_EXECUTABLE") {
            self.browser.executable = Some(v);
        }
        if let Ok(v) = std::env::var("BROWSER_DEBUG_PORT") {
            if let Ok(port) = v.parse() {
                self.browser.debug_port = Some(port);
            }
        }
    }

    /// 启动前校验
    ///
    /// 控制台模式不需要 Telegram 配置；机器人模式下 Token 和 Chat ID
    /// 缺失或者还是占位符时直接拒绝启动
    pub fn validate(&self, console_mode: bool) -> Result<()> {
        if console_mode {
            return Ok(());
        }

        if self.telegram.bot_token.is_empty() || self.telegram.bot_token == TOKEN_PLACEHOLDER {
            return Err(AutomationError::Config(
                "Bot Token 未配置".to_string(),
            ));
        }

        if self.telegram.chat_id == 0 {
            return Err(AutomationError::Config(
                "Chat ID 未配置".to_string(),
            ));
        }

        Ok(())
    }
}
