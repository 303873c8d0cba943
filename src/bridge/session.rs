use std::sync::Arc;

use tracing::info;

use super::BridgeError;
use super::engine::TransferEngine;
use super::executor::AsyncExecutor;
use super::listener::AppListener;

// 等待结束后检查监听器记录的错误
fn check_error(listener: &AppListener) -> Result<(), BridgeError> {
    match listener.error() {
        Some(err) => Err(BridgeError::Engine(err)),
        None => Ok(()),
    }
}

/// 登录并拉取节点，缺少账号或密码时跳过
pub async fn engine_login(
    executor: &Arc<AsyncExecutor>,
    api: Arc<dyn TransferEngine>,
    listener: &AppListener,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(), BridgeError> {
    let (Some(email), Some(password)) = (email, password) else {
        info!("未提供账号信息，跳过登录");
        return Ok(());
    };
    let (email, password) = (email.to_string(), password.to_string());
    executor
        .perform_async(move || api.login(&email, &password))
        .await?;
    check_error(listener)
}

/// 注销主会话，若有文件夹会话一并注销
pub async fn engine_logout(
    executor: &Arc<AsyncExecutor>,
    api: Arc<dyn TransferEngine>,
    folder_api: Option<Arc<dyn TransferEngine>>,
) -> Result<(), BridgeError> {
    executor.perform_async(move || api.logout()).await?;
    if let Some(folder_api) = folder_api {
        executor.perform_async(move || folder_api.logout()).await?;
    }
    Ok(())
}
