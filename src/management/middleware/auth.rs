//! # 认证中间件
//!
//! 从请求头中提取JWT，验证管理员角色并将解析结果注入到请求扩展中。

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::extract_bearer_token;
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use crate::management::{response, server::AppState};

/// 已认证管理员的上下文
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub subject: String,
    pub role: String,
}

/// 管理员认证中间件：缺失或无效的令牌返回 401，非管理员角色返回 403
pub async fn admin_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(extract_bearer_token)
        .map(ToString::to_string);

    let Some(token) = token else {
        return Err(response::error(
            StatusCode::UNAUTHORIZED,
            "AUTH_ERROR",
            "缺少 Bearer 认证令牌",
        ));
    };

    match state.jwt.authorize_admin(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(Arc::new(AdminContext {
                subject: claims.sub,
                role: claims.role,
            }));
            Ok(next.run(request).await)
        }
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Authentication,
                LogComponent::Auth,
                "admin_auth_rejected",
                "管理接口认证失败",
                path = %request.uri().path(),
                error = %e
            );
            Err(response::app_error(e))
        }
    }
}
