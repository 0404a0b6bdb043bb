use anyhow::Result;
use question_moderation::utils::logging;
use question_moderation::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行维护任务
    let app = App::initialize(config).await?;
    app.run().await?;
    app.shutdown().await;

    Ok(())
}
