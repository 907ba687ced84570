//! 编排器场景测试
//!
//! 全部跑在假能力实现上，不需要浏览器。
//! 时间参数压到毫秒级，停滞和轮询行为用真实时钟验证

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{test_config, FakeInput, FakeNotifier, FakePage};

use auto_lesson_bot::config::Config;
use auto_lesson_bot::error::AutomationError;
use auto_lesson_bot::models::{RunState, UserCredentials};
use auto_lesson_bot::orchestrator::{completion_poll, LessonOrchestrator, RunController};
use auto_lesson_bot::ports::{CredentialSource, Notifier, PageAutomation};

/// 一个能顺利跑完空课程列表的页面假件，测试按需覆盖
fn scripted_page(config: &Config, subject: &str) -> Arc<FakePage> {
    let sel = &config.selectors;
    let page = Arc::new(FakePage::default());
    page.set_count(&sel.walkme_probe, &[0]);
    page.set_count(&sel.course_link_for(subject), &[1]);
    page.set_count(&sel.lesson_rows, &[0]);
    page.set_count(&sel.video_rows, &[0]);
    page
}

fn orchestrator_with(
    config: &Config,
    page: &Arc<FakePage>,
    notifier: &Arc<FakeNotifier>,
    input: Arc<FakeInput>,
    state: &Arc<RunState>,
) -> LessonOrchestrator {
    let page_port: Arc<dyn PageAutomation> = page.clone();
    let notifier_port: Arc<dyn Notifier> = notifier.clone();
    let input_port: Arc<dyn CredentialSource> = input;
    LessonOrchestrator::new(config, page_port, notifier_port, input_port, state.clone())
}

fn credentials(subject: &str) -> UserCredentials {
    UserCredentials::new("mario", "segreta", subject)
}

// ========== 完成轮询 ==========

#[tokio::test]
async fn test_poll_raises_timeout_on_frozen_progress() {
    let config = test_config();
    let sel = config.selectors.progress_bar.clone();

    let page = FakePage::default();
    page.set_attribute_sequence(&sel, vec![Some("width: 40%;".to_string())]);
    let notifier = FakeNotifier::default();
    let state = RunState::new();

    let result = completion_poll::wait_for_lesson_complete(
        &page,
        &notifier,
        &state,
        &config.timing,
        &sel,
        "视频课 1/1",
    )
    .await;

    assert!(matches!(
        result,
        Err(AutomationError::ProgressStalled { .. })
    ));
    // 超时必须通知并附带现场截图
    assert_eq!(notifier.texts_containing("超时"), 1);
    assert_eq!(notifier.image_captions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_poll_never_times_out_while_advancing() {
    let mut config = test_config();
    // 每个周期推进 0.02，远超停滞阈值，停滞计时应当不断被重置
    config.timing.stall_timeout_ms = 300;
    let sel = config.selectors.progress_bar.clone();

    let styles: Vec<Option<String>> = (0..=200)
        .map(|i| Some(format!("width: {:.2}%;", 96.0 + 0.02 * i as f64)))
        .collect();

    let page = FakePage::default();
    page.set_attribute_sequence(&sel, styles);
    let notifier = FakeNotifier::default();
    let state = RunState::new();

    let result = completion_poll::wait_for_lesson_complete(
        &page,
        &notifier,
        &state,
        &config.timing,
        &sel,
        "视频课 1/1",
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(notifier.texts_containing("超时"), 0);
}

#[tokio::test]
async fn test_poll_notifies_once_per_quartile() {
    let mut config = test_config();
    config.timing.stall_timeout_ms = 10_000;
    let sel = config.selectors.progress_bar.clone();

    // 0 → 100 每 5% 采样一次
    let styles: Vec<Option<String>> = (0..=20)
        .map(|i| Some(format!("width: {}%;", i * 5)))
        .collect();

    let page = FakePage::default();
    page.set_attribute_sequence(&sel, styles);
    let notifier = FakeNotifier::default();
    let state = RunState::new();

    completion_poll::wait_for_lesson_complete(
        &page,
        &notifier,
        &state,
        &config.timing,
        &sel,
        "视频课 1/1",
    )
    .await
    .unwrap();

    // 正好四条：跨过 25 / 50 / 75 / 100 各一条
    assert_eq!(notifier.progress_values(), vec![25.0, 50.0, 75.0, 100.0]);
}

#[tokio::test]
async fn test_poll_gives_up_quietly_when_style_unparseable() {
    let config = test_config();
    let sel = config.selectors.progress_bar.clone();

    let page = FakePage::default();
    page.set_attribute_sequence(&sel, vec![Some("margin: 3px;".to_string())]);
    let notifier = FakeNotifier::default();
    let state = RunState::new();

    // 第一次就解析不出来：放弃监控但不算错误
    let result = completion_poll::wait_for_lesson_complete(
        &page,
        &notifier,
        &state,
        &config.timing,
        &sel,
        "视频课 1/1",
    )
    .await;

    assert!(result.is_ok());
    assert!(notifier.progress_values().is_empty());
}

// ========== 完整运行 ==========

#[tokio::test]
async fn test_run_skips_completed_rows_and_plays_rest() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.video_rows, &[3]);
    page.set_text(&sel.video_rows, 0, "Lesson 1 100%");
    page.set_text(&sel.video_rows, 1, "Lesson 2 0%");
    page.set_text(&sel.video_rows, 2, "Lesson 3 0%");
    page.set_attribute_sequence(&sel.progress_bar, vec![Some("width: 100%;".to_string())]);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    orchestrator
        .run(Some(credentials("Algebra")))
        .await
        .unwrap();

    // 打开平台首页一次，第一行已完成被跳过，其余两行按文档顺序播放
    assert_eq!(page.navigations.lock().unwrap().len(), 1);
    assert_eq!(page.clicks_on(&sel.video_rows), vec![1, 2]);
    assert_eq!(notifier.texts_containing("✅ 完成"), 2);
    assert_eq!(notifier.texts_containing("自动化全部完成"), 1);
    // 清理只发生一次，运行标志已清
    assert_eq!(page.close_calls.load(Ordering::SeqCst), 1);
    assert!(!state.is_running());
}

#[tokio::test]
async fn test_run_prompts_for_missing_credentials_and_subject() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let input = Arc::new(
        FakeInput::default()
            .with_value("请输入账号:", "prompted_user")
            .with_value("请输入密码:", "prompted_pass")
            .with_value("请输入要学习的科目:", "Algebra"),
    );

    let orchestrator = orchestrator_with(&config, &page, &notifier, input, &state);
    orchestrator.run(None).await.unwrap();

    let fills = page.fills.lock().unwrap().clone();
    assert!(fills.contains(&(sel.username_input.clone(), "prompted_user".to_string())));
    assert!(fills.contains(&(sel.password_input.clone(), "prompted_pass".to_string())));
    assert_eq!(notifier.texts_containing("已选择科目: Algebra"), 1);
}

#[tokio::test]
async fn test_course_lookup_falls_back_to_second_filter() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    // 第一次查（Da Completare）没有，切筛选后第二次查有
    page.set_count(&sel.course_link_for("Algebra"), &[0, 1]);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    orchestrator
        .run(Some(credentials("Algebra")))
        .await
        .unwrap();

    assert_eq!(page.clicks_on(&sel.filter_to_start), vec![0]);
    assert!(notifier.texts_containing("Da Iniziare") >= 1);
}

#[tokio::test]
async fn test_course_not_found_in_either_filter_is_fatal() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.course_link_for("Algebra"), &[0, 0]);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    let result = orchestrator.run(Some(credentials("Algebra"))).await;

    assert!(matches!(result, Err(AutomationError::CourseNotFound(_))));
    // 失败也要有明确的结束消息和一次性的清理
    assert_eq!(notifier.texts_containing("❌ 错误"), 1);
    assert_eq!(page.close_calls.load(Ordering::SeqCst), 1);
    assert!(!state.is_running());
}

#[tokio::test]
async fn test_walkme_close_failure_is_not_fatal() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.walkme_probe, &[1]);
    page.fail_clicks_on(&sel.walkme_close);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    orchestrator
        .run(Some(credentials("Algebra")))
        .await
        .unwrap();

    assert_eq!(notifier.texts_containing("自动化全部完成"), 1);
}

#[tokio::test]
async fn test_lesson_row_click_failures_do_not_abort_open_pass() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.lesson_rows, &[2]);
    page.fail_clicks_on(&sel.lesson_rows);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    orchestrator
        .run(Some(credentials("Algebra")))
        .await
        .unwrap();

    assert_eq!(notifier.texts_containing("自动化全部完成"), 1);
}

#[tokio::test]
async fn test_video_lesson_error_aborts_run_by_default() {
    let config = test_config();
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.video_rows, &[2]);
    page.set_text(&sel.video_rows, 0, "Lezione 1 0%");
    page.set_text(&sel.video_rows, 1, "Lezione 2 0%");
    page.fail_clicks_on(&sel.video_rows);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    let result = orchestrator.run(Some(credentials("Algebra"))).await;

    assert!(result.is_err());
    // 第一节失败就中止，第二节不再尝试
    assert_eq!(notifier.texts_containing("⚠️ 视频课 1 出错"), 1);
    assert_eq!(notifier.texts_containing("⚠️ 视频课 2 出错"), 0);
    assert_eq!(page.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_video_lesson_error_skips_when_policy_disabled() {
    let mut config = test_config();
    config.abort_on_lesson_error = false;
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.video_rows, &[2]);
    page.set_text(&sel.video_rows, 0, "Lezione 1 0%");
    page.set_text(&sel.video_rows, 1, "Lezione 2 0%");
    page.fail_clicks_on(&sel.video_rows);

    let notifier = Arc::new(FakeNotifier::default());
    let state = Arc::new(RunState::new());
    assert!(state.try_begin());

    let orchestrator = orchestrator_with(
        &config,
        &page,
        &notifier,
        Arc::new(FakeInput::default()),
        &state,
    );
    orchestrator
        .run(Some(credentials("Algebra")))
        .await
        .unwrap();

    assert_eq!(notifier.texts_containing("⚠️ 视频课 1 出错"), 1);
    assert_eq!(notifier.texts_containing("⚠️ 视频课 2 出错"), 1);
    assert_eq!(notifier.texts_containing("自动化全部完成"), 1);
}

// ========== 运行控制器 ==========

#[tokio::test]
async fn test_controller_rejects_second_start_and_stops_cleanly() {
    let mut config = test_config();
    config.timing.poll_interval_ms = 20;
    config.timing.stall_timeout_ms = 60_000;
    let sel = config.selectors.clone();

    let page = scripted_page(&config, "Algebra");
    page.set_count(&sel.video_rows, &[1]);
    page.set_text(&sel.video_rows, 0, "Lezione 1 0%");
    // 进度冻在 10%，运行会一直停在轮询里直到被取消
    page.set_attribute_sequence(&sel.progress_bar, vec![Some("width: 10%;".to_string())]);

    let notifier = Arc::new(FakeNotifier::default());
    let page_port: Arc<dyn PageAutomation> = page.clone();
    let notifier_port: Arc<dyn Notifier> = notifier.clone();
    let input_port: Arc<dyn CredentialSource> = Arc::new(FakeInput::default());
    let controller = RunController::new(config, page_port, notifier_port, input_port);

    controller.start(Some(credentials("Algebra"))).unwrap();

    // 运行中的第二次启动被拒绝，且不影响进行中的运行
    assert!(matches!(
        controller.start(None),
        Err(AutomationError::AlreadyRunning)
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(controller.is_running());
    assert!(controller.status().contains("Algebra"));

    assert!(controller.stop_and_wait().await);
    assert!(!controller.is_running());

    assert_eq!(notifier.texts_containing("自动化已被手动停止"), 1);
    assert_eq!(page.close_calls.load(Ordering::SeqCst), 1);

    // 空闲之后 stop 是空操作，截图返回 None
    assert!(!controller.request_stop());
    assert!(controller.screenshot().await.is_none());
}
