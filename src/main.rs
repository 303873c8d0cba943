use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mirror_status::bridge::engine::{EngineListener, EngineNode};
use mirror_status::bridge::executor::AsyncExecutor;
use mirror_status::bridge::listener::AppListener;
use mirror_status::bridge::session::{engine_login, engine_logout};
use mirror_status::bridge::status::EngineTransferStatus;
use mirror_status::cli::Cli;
use mirror_status::common::logger::PrettyLogger;
use mirror_status::report::view::StatusView;
use mirror_status::report::{ReportRequest, StatusReporter};
use mirror_status::task::TaskListener;
use mirror_status::task::registry::TaskRegistry;
use mirror_status::{log_error, log_info, log_success, log_warning};

mod demo;

use demo::{RegistryObserver, SimulatedEngine};

/// 通过模拟引擎启动一个下载，任务在完成前一直留在注册表中
async fn start_engine_download(registry: &TaskRegistry) -> anyhow::Result<()> {
    let gid = uuid::Uuid::new_v4().to_string();
    let root = EngineNode {
        handle: 1,
        name: "shared-folder".to_string(),
        size: 256 * 1024 * 1024,
        is_folder: true,
    };

    let executor = Arc::new(AsyncExecutor::new());
    let observer = Arc::new(RegistryObserver {
        registry: registry.clone(),
        gid: gid.clone(),
    });
    let listener = Arc::new(AppListener::new(executor.continue_event(), observer));
    let engine = SimulatedEngine::new(root.clone());
    engine.attach(listener.clone() as Arc<dyn EngineListener>);

    engine_login(
        &executor,
        engine.clone(),
        &listener,
        Some("demo@example.com"),
        Some("secret"),
    )
    .await?;
    info!("登录完成，节点: {}", listener.name());

    let status = EngineTransferStatus::new(
        gid,
        listener.name(),
        root.size,
        listener.clone(),
        TaskListener::new(1000).with_link("https://t.me/c/100/1"),
    );
    registry.insert(Arc::new(status)).await?;

    tokio::spawn(async move {
        let download = engine.clone();
        if let Err(e) = executor.perform_async(move || download.start_download()).await {
            error!("引擎下载异常: {}", e);
            return;
        }
        if let Some(err) = listener.error() {
            warn!("引擎下载出错: {}", err);
        }
        if let Err(e) = engine_logout(&executor, engine, None).await {
            warn!("注销失败: {}", e);
        }
    });
    Ok(())
}

async fn render(reporter: &StatusReporter, request: &ReportRequest, json: bool) -> anyhow::Result<()> {
    PrettyLogger::title(format!("状态 (过滤: {})", request.status));
    match reporter.build_report(request).await {
        None => log_info!("当前没有任务"),
        Some(report) => {
            PrettyLogger::status_text(&report.text);
            if let Some(navigation) = &report.navigation {
                if json {
                    println!("{}", serde_json::to_string_pretty(navigation)?);
                } else {
                    PrettyLogger::buttons(&navigation.labels());
                }
            }
        }
    }
    PrettyLogger::separator();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = args.status_config();
    info!("每页任务数: {}, 下载目录: {:?}", config.status_limit, config.download_dir);

    let registry = TaskRegistry::new();
    demo::spawn_tracked_tasks(&registry, args.tasks).await?;
    if let Err(e) = start_engine_download(&registry).await {
        log_warning!("引擎下载未启动: {}", e);
    }

    let reporter = StatusReporter::new(registry.clone(), config);
    let view = StatusView {
        page_no: args.page,
        status: args.status.clone(),
        is_user: args.user.is_some(),
        ..StatusView::default()
    };
    let request = view.request(args.user.unwrap_or(0));

    if !args.watch {
        render(&reporter, &request, args.json).await?;
        return Ok(());
    }

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = render(&reporter, &request, args.json).await {
                    log_error!("渲染状态消息失败: {}", e);
                    break;
                }
            }
        }
        if registry.is_empty().await {
            break;
        }
    }

    log_success!("退出，剩余任务 {} 个", registry.len().await);
    Ok(())
}
