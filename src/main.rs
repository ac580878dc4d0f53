use anyhow::Result;
use raku_commute_submit::utils::logging;
use raku_commute_submit::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // ログ初期化
    logging::init();

    // 設定読み込み
    let config = Config::load()?;

    // 初期化してサーバを起動
    App::initialize(config).await?.run().await?;

    Ok(())
}
