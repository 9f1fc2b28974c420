//! 日誌初始化

use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日誌輸出
///
/// `RUST_LOG` 優先於 `default_filter`；重複呼叫不會出錯（第二次起不生效）。
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
