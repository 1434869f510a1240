//! 本地存储读写探针

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::{HealthProbe, ProbeContext, classify, elapsed_ms};
use crate::health::types::{HealthStatus, ProbeError, ProbeErrorKind, ProbeReport};

const OK_BELOW_MS: u64 = 100;
const WARN_BELOW_MS: u64 = 1000;

/// 探针使用的临时文件存储
#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()>;
    async fn read(&self, name: &str) -> io::Result<Vec<u8>>;
    async fn remove(&self, name: &str) -> io::Result<()>;
}

/// 本地目录存储，写入前创建目录
pub struct LocalDirStore {
    dir: PathBuf,
}

impl LocalDirStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ScratchStore for LocalDirStore {
    async fn write(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(name), bytes).await
    }

    async fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.dir.join(name)).await
    }

    async fn remove(&self, name: &str) -> io::Result<()> {
        tokio::fs::remove_file(self.dir.join(name)).await
    }
}

/// 写入唯一命名的临时文件，读回比对后删除
pub struct StorageProbe {
    store: Arc<dyn ScratchStore>,
}

impl StorageProbe {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_store(Arc::new(LocalDirStore::new(dir)))
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn ScratchStore>) -> Self {
        Self { store }
    }
}

/// 比对写入与读回的字节
pub fn verify_round_trip(written: &[u8], read_back: &[u8]) -> Result<(), ProbeError> {
    if written == read_back {
        Ok(())
    } else {
        Err(ProbeError::new(
            ProbeErrorKind::Mismatch,
            format!(
                "read back {} bytes, expected {} identical bytes",
                read_back.len(),
                written.len()
            ),
        ))
    }
}

#[async_trait]
impl HealthProbe for StorageProbe {
    fn name(&self) -> &str {
        "storage"
    }

    async fn check(&self, _ctx: &ProbeContext) -> Result<ProbeReport, ProbeError> {
        let start = Instant::now();

        let token = uuid::Uuid::new_v4();
        let file_name = format!(".health-check-{token}.tmp");
        let payload = format!("wonderful-books storage check {token}").into_bytes();

        self.store.write(&file_name, &payload).await?;
        let read_result = self.store.read(&file_name).await;
        // 无论读取结果如何都要删除临时文件
        let remove_result = self.store.remove(&file_name).await;

        let read_back = read_result?;
        verify_round_trip(&payload, &read_back)?;
        remove_result?;

        let elapsed = elapsed_ms(start);
        let status = classify(elapsed, OK_BELOW_MS, WARN_BELOW_MS);
        let message = match status {
            HealthStatus::Ok => "storage read/write ok".to_string(),
            _ => format!("storage slow: {elapsed}ms"),
        };

        Ok(ProbeReport::new(status, elapsed, message).with_meta("bytes", payload.len()))
    }
}
