//! # 错误处理宏

/// 按错误类别快速构造 `AppError`
///
/// ```ignore
/// crate::error!(Config, "invalid cron pattern");
/// crate::error!(Database, "insert failed", db_err);
/// ```
#[macro_export]
macro_rules! error {
    ($kind:ident, $msg:expr) => {
        $crate::error::AppError::$kind {
            message: ::std::string::ToString::to_string(&$msg),
            source: None,
        }
    };
    ($kind:ident, $msg:expr, $source:expr) => {
        $crate::error::AppError::$kind {
            message: ::std::string::ToString::to_string(&$msg),
            source: Some(::anyhow::Error::from($source)),
        }
    };
}

/// 立即返回指定类别的错误
#[macro_export]
macro_rules! bail {
    ($kind:ident, $msg:expr) => {
        return Err($crate::error!($kind, $msg))
    };
    ($kind:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::error!($kind, format!($fmt, $($arg)*)))
    };
}

/// 确保条件成立，否则返回指定类别的错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:ident, $msg:expr) => {
        if !($cond) {
            $crate::bail!($kind, $msg);
        }
    };
    ($cond:expr, $kind:ident, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($kind, $fmt, $($arg)*);
        }
    };
}
