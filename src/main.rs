//! # Wonderful Books 健康检查服务主程序

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use wonderful_books::{
    auth::JwtManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    server_setup,
};

#[derive(Parser)]
#[command(name = "wonderful-books-health")]
#[command(about = "Health check aggregator for the Wonderful Books platform")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 HTTP 服务与调度器（默认）
    Serve,
    /// 立即执行一次健康检查并输出结果
    Check,
    /// 签发管理员令牌
    Token {
        /// 令牌主体
        #[arg(long, default_value = "admin")]
        subject: String,
        /// 角色
        #[arg(long, default_value = "admin")]
        role: String,
        /// 有效期（小时）
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_optimized_logging(cli.log_level.as_ref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server_setup::run_server(cli.config).await,
        Commands::Check => run_once(cli.config).await,
        Commands::Token {
            subject,
            role,
            ttl_hours,
        } => issue_token(cli.config, &subject, &role, ttl_hours).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "command_failed",
                "命令执行失败",
                error = %e
            );
            ExitCode::FAILURE
        }
    }
}

/// 执行一次健康检查，FAIL 时以非零状态退出
async fn run_once(config: Option<PathBuf>) -> wonderful_books::Result<()> {
    let config = server_setup::load_config(config).await?;
    let context = server_setup::initialize_context(config).await?;
    let run = context
        .health
        .run_health_checks(wonderful_books::health::RunSource::MANUAL)
        .await?;

    println!("{}", serde_json::to_string_pretty(&run)?);
    linfo!(
        "system",
        LogStage::HealthCheck,
        LogComponent::Main,
        "check_once",
        "单次健康检查完成",
        run_id = run.run_id,
        overall_status = %run.overall_status
    );

    wonderful_books::ensure!(
        run.overall_status != wonderful_books::health::HealthStatus::Fail,
        HealthCheck,
        format!("健康检查失败: {}", run.failed_items().join(", "))
    );
    Ok(())
}

/// 使用配置中的密钥签发管理员令牌
async fn issue_token(
    config: Option<PathBuf>,
    subject: &str,
    role: &str,
    ttl_hours: i64,
) -> wonderful_books::Result<()> {
    let config = server_setup::load_config(config).await?;
    let jwt = JwtManager::new(&config.auth);
    let token = jwt.generate_token(subject, role, chrono::Duration::hours(ttl_hours))?;
    println!("{token}");
    Ok(())
}
