use log::info;

use xmarket::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 로드 후 로거 초기화 (RUST_LOG 기본값 info)
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    info!("⚙️  설정 로드: 포트 {}, DB {}", config.rest_port, config.database_url);

    start_server(config).await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
