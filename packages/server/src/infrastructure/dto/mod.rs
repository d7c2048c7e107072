//! Data Transfer Objects
//!
//! ワイヤーフォーマットの型は `kibun_shared::protocol` がクライアントと共有しています。
//! このモジュールはドメインモデルからそれらへの変換のみを持ちます。

pub mod conversion;

pub use conversion::member_payloads;
