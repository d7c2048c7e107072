//! UseCase layer
//!
//! サーバーの操作ごとに 1 つのユースケースを定義します。
//! 各ユースケースは Domain 層の trait（Repository / MessagePusher）にのみ依存します。

use std::sync::Arc;

use kibun_shared::time::Clock;

use crate::domain::{MessagePusher, PresenceRepository};

pub mod connect_session;
pub mod disconnect_session;
pub mod error;
pub mod get_group_members;
pub mod get_groups;
pub mod join_room;
pub mod kick_session;
pub mod leave_room;
pub mod publish_status;
pub mod rename_group;

#[cfg(test)]
mod test_support;

pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{
    ConnectError, GetGroupError, PublishStatusError, RenameGroupError, RoomError, SessionError,
};
pub use get_group_members::GetGroupMembersUseCase;
pub use get_groups::GetGroupsUseCase;
pub use join_room::JoinRoomUseCase;
pub use kick_session::KickSessionUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use publish_status::{PublishStatusUseCase, StatusInput};
pub use rename_group::RenameGroupUseCase;

/// サーバーが使う全ユースケース
///
/// 同じ Repository / MessagePusher を共有するユースケースをまとめて組み立てます。
pub struct UseCases {
    pub connect_session: ConnectSessionUseCase,
    pub disconnect_session: DisconnectSessionUseCase,
    pub join_room: JoinRoomUseCase,
    pub leave_room: LeaveRoomUseCase,
    pub publish_status: PublishStatusUseCase,
    pub rename_group: RenameGroupUseCase,
    pub kick_session: KickSessionUseCase,
    pub get_groups: GetGroupsUseCase,
    pub get_group_members: GetGroupMembersUseCase,
}

impl UseCases {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connect_session: ConnectSessionUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            disconnect_session: DisconnectSessionUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            ),
            join_room: JoinRoomUseCase::new(repository.clone(), message_pusher.clone()),
            leave_room: LeaveRoomUseCase::new(repository.clone(), message_pusher.clone()),
            publish_status: PublishStatusUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock,
            ),
            rename_group: RenameGroupUseCase::new(repository.clone(), message_pusher.clone()),
            kick_session: KickSessionUseCase::new(message_pusher),
            get_groups: GetGroupsUseCase::new(repository.clone()),
            get_group_members: GetGroupMembersUseCase::new(repository),
        }
    }
}
