use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use page_translate::api_constants::api_config;
use page_translate::config::Cli;
use page_translate::pipeline::run;
use page_translate::utils::init_logging;

/// 致命错误（处理任何文件之前）的退出码
const FATAL_EXIT_CODE: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 加载 .env 中的 DEEPL_API_KEY
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 初始化日志系统
    init_logging(cli.verbose, cli.quiet);

    match run(&cli, std::env::var(api_config::API_KEY_ENV).ok()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) if e.is_fatal() => {
            error!("❌ {}", e);
            ExitCode::from(FATAL_EXIT_CODE)
        }
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
