//! # 服务生命周期
//!
//! 初始化配置与数据库，启动后台任务和 HTTP 服务器，并在收到信号后优雅关闭

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, AppTasks};
use crate::config::{AppConfig, ConfigManager};
use crate::database::{init_database, run_migrations};
use crate::error::{Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::management::ManagementServer;
use crate::{lerror, linfo, lwarn};

/// 加载配置
pub async fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = ConfigManager::new(config_path).context("配置管理器初始化失败")?;
    linfo!(
        "system",
        LogStage::Configuration,
        LogComponent::Config,
        "config_loaded",
        "配置加载完成",
        path = %manager.config_path().display()
    );
    Ok(manager.get_config().await)
}

/// 连接数据库并执行迁移，随后构建应用上下文
pub async fn initialize_context(config: AppConfig) -> Result<Arc<AppContext>> {
    let db = init_database(&config.database)
        .await
        .context("数据库连接失败")?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "run_migrations",
        "执行数据库迁移"
    );
    run_migrations(&db).await.context("数据库迁移失败")?;

    Ok(Arc::new(AppContext::build(config, db)?))
}

/// 等待 Ctrl+C
async fn handle_ctrl_c_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "ctrl_c_error",
            "监听 Ctrl+C 失败",
            error = %e
        );
    }
}

/// 运行服务直至收到关闭信号
pub async fn run_server(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path).await?;
    let context = initialize_context(config).await?;

    let tasks = AppTasks::initialize(&context).await?;
    let scheduler = tasks.scheduler();
    let server = ManagementServer::new(&context.config.server, Arc::clone(&context))
        .context("HTTP 服务器创建失败")?;

    scheduler.start_all().await?;

    let shutdown = CancellationToken::new();
    let server_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            server
                .serve_with_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "all_components_started",
        "所有组件已启动",
        probes = ?context.health.registry().names()
    );

    handle_ctrl_c_signal().await;
    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "shutdown_initiated",
        "开始优雅关闭"
    );

    shutdown.cancel();
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "server_error",
            "HTTP 服务器退出异常",
            error = %e
        ),
        Err(e) => lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "server_panic",
            "HTTP 服务器任务异常终止",
            error = %e
        ),
    }

    if let Err(e) = scheduler.shutdown().await {
        lwarn!(
            "system",
            LogStage::Shutdown,
            LogComponent::ServerSetup,
            "scheduler_shutdown_warning",
            "后台任务关闭时出现警告",
            error = %e
        );
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "servers_stopped",
        "服务已停止"
    );
    Ok(())
}
