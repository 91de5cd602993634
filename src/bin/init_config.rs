//! 生成默认配置文件
//!
//! 用法: cargo run --bin init_config [路径]，默认写入 ./config/config.toml

use sforum::config::Config;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./config/config.toml".to_string());

    if std::path::Path::new(&path).exists() {
        anyhow::bail!("{} 已存在，拒绝覆盖", path);
    }

    let config = Config::default();
    config.validate()?;
    config.save_to_file(&path)?;

    println!("✅ 默认配置已写入 {}", path);
    Ok(())
}
