//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{Group, GroupId, RepositoryError, Session, SessionId, StatusEntry};

/// Presence Repository trait
///
/// セッション、グループ（ルーム）、ステータスを保持するデータストアへのインターフェース。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
///
/// ## 依存性の逆転（DIP）
///
/// - ドメイン層が必要とするインターフェースをドメイン層自身が定義
/// - Infrastructure 層がドメイン層のインターフェースに依存
/// - ドメイン層は Infrastructure 層に依存しない
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// セッションを追加
    async fn add_session(&self, session: Session) -> Result<(), RepositoryError>;

    /// セッションを削除し、参加中だった全ルームから退出させる
    ///
    /// 削除されたセッション（退出前の `rooms` を含む）を返す。
    async fn remove_session(&self, session_id: &SessionId) -> Result<Session, RepositoryError>;

    /// セッションを取得
    async fn find_session(&self, session_id: &SessionId) -> Option<Session>;

    /// セッションをルームに参加させる（グループがなければ作成）
    ///
    /// 参加後のグループを返す。
    async fn join_room(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RepositoryError>;

    /// セッションをルームから退出させる
    ///
    /// 退出後のグループを返す。
    async fn leave_room(
        &self,
        session_id: &SessionId,
        group_id: &GroupId,
    ) -> Result<Group, RepositoryError>;

    /// グループを取得
    async fn find_group(&self, group_id: &GroupId) -> Option<Group>;

    /// 全グループを ID 順に取得
    async fn list_groups(&self) -> Vec<Group>;

    /// ステータスを保存し、保存後のグループを返す
    async fn save_status(&self, entry: StatusEntry) -> Result<Group, RepositoryError>;

    /// グループ名を変更し、変更後のグループを返す
    async fn rename_group(&self, group_id: &GroupId, name: String)
    -> Result<Group, RepositoryError>;
}
