//! UseCase: セッション接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - セッションの採番、Repository への追加、MessagePusher への登録
//!
//! ### なぜこのテストが必要か
//! - 接続直後からルーム参加やフレーム配信ができる状態になっていることを保証
//! - 同じユーザーが複数セッションを持てることを確認（端末ごとの接続）
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規セッションの接続
//! - 正常系：同じユーザーの 2 つ目のセッション
//! - 異常系：Repository がセッションの追加を拒否した場合

use std::sync::Arc;

use kibun_shared::time::Clock;

use crate::domain::{
    MessagePusher, PresenceRepository, PusherChannel, Session, SessionId, Timestamp, UserId,
};

use super::error::ConnectError;

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    /// Clock（接続時刻の取得）
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    /// 新しい ConnectSessionUseCase を作成
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// セッション接続を実行
    ///
    /// # Arguments
    ///
    /// * `user_id` - 認証済みのユーザー ID
    /// * `sender` - セッションへのフレーム送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - 採番されたセッション
    /// * `Err(ConnectError)` - 接続失敗
    pub async fn execute(
        &self,
        user_id: UserId,
        sender: PusherChannel,
    ) -> Result<Session, ConnectError> {
        // 1. セッションを採番
        let session = Session::new(
            SessionId::generate(),
            user_id,
            Timestamp::new(self.clock.now_millis()),
        );

        // 2. Repository にセッションを追加
        self.repository
            .add_session(session.clone())
            .await
            .map_err(|_| ConnectError::DuplicateSession(session.id.to_string()))?;

        // 3. MessagePusher にセッションを登録
        self.message_pusher
            .register_session(session.id.clone(), sender)
            .await;

        tracing::info!(
            "Session '{}' connected for user '{}'",
            session.id,
            session.user_id
        );
        Ok(session)
    }
}
