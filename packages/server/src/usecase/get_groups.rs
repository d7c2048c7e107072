//! UseCase: グループ一覧取得

use std::sync::Arc;

use crate::domain::{Group, PresenceRepository};

/// グループ一覧取得のユースケース
pub struct GetGroupsUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl GetGroupsUseCase {
    /// 新しい GetGroupsUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 全グループを ID 順に返す
    pub async fn execute(&self) -> Vec<Group> {
        self.repository.list_groups().await
    }
}
