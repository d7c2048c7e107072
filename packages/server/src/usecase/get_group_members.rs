//! UseCase: グループのメンバー取得

use std::sync::Arc;

use crate::domain::{Group, GroupId, PresenceRepository};

use super::error::GetGroupError;

/// グループのメンバー取得のユースケース
pub struct GetGroupMembersUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl GetGroupMembersUseCase {
    /// 新しい GetGroupMembersUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// グループを取得する（メンバーは `Group::members` から導出）
    pub async fn execute(&self, group_id: &GroupId) -> Result<Group, GetGroupError> {
        self.repository
            .find_group(group_id)
            .await
            .ok_or_else(|| GetGroupError::GroupNotFound(group_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::repository::MockPresenceRepository, usecase::test_support::Fixture};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_get_group_members() {
        // テスト項目: 参加中のユーザーがメンバーとして返される
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = GetGroupMembersUseCase::new(fixture.repository.clone());
        fixture.connect_in("alice", "g1").await;
        fixture.connect_in("bob", "g1").await;

        // when (操作):
        let group = usecase.execute(&GroupId::new("g1").unwrap()).await.unwrap();

        // then (期待する結果):
        let members: Vec<_> = group.members().into_iter().map(|u| u.into_string()).collect();
        assert_eq!(members, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_get_unknown_group() {
        // テスト項目: 存在しないグループは GroupNotFound になる
        // given (前提条件):
        let group_id = GroupId::new("ghost").unwrap();
        let mut repository = MockPresenceRepository::new();
        repository
            .expect_find_group()
            .with(eq(group_id.clone()))
            .times(1)
            .returning(|_| None);
        let usecase = GetGroupMembersUseCase::new(Arc::new(repository));

        // when (操作):
        let result = usecase.execute(&group_id).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(GetGroupError::GroupNotFound("ghost".to_string()))
        );
    }
}
