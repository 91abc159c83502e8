// ==========================================
// 取件账户分配系统 - 产物存储
// ==========================================
// 职责: 保存报表产物并返回不透明文件名
// 实现者: LocalArtifactStore (本地目录)
// ==========================================

use crate::report::error::{ReportError, ReportResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// 保存产物, 返回生成的文件名
    async fn put(&self, bytes: Vec<u8>) -> ReportResult<String>;

    /// 读取产物
    async fn get(&self, name: &str) -> ReportResult<Vec<u8>>;
}

// ==========================================
// LocalArtifactStore - 本地目录存储
// ==========================================
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, bytes: Vec<u8>) -> ReportResult<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let name = format!("{}.csv", Uuid::new_v4().simple());
        tokio::fs::write(self.root.join(&name), &bytes).await?;
        debug!(artifact = %name, bytes = bytes.len(), "产物已保存");
        Ok(name)
    }

    async fn get(&self, name: &str) -> ReportResult<Vec<u8>> {
        // 仅接受本目录下的文件名
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ReportError::ArtifactNotFound(name.to_string()));
        }
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReportError::ArtifactNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
