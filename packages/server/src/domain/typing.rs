//! タイピング状態機械
//!
//! `(ユーザー, 宛先)` ごとの `idle ↔ typing` 状態をエポック番号付きで
//! 管理する純粋な遷移テーブル。タイマー処理自体は UseCase 層が持ち、
//! ここは「どの遷移でブロードキャストすべきか」だけを決定する。
//!
//! ## エポックによるデバウンス
//!
//! `typing_start` を受けるたびにエポックを進める。期限切れタイマーは
//! 自分が観測したエポックを添えて `expire` を呼び、現在のエポックと
//! 一致した場合に限り stop が成立する。古いタイマーの発火は no-op に
//! なるため、タイマーのキャンセル管理が不要になる。

use std::collections::HashMap;

use super::value_object::{Destination, UserId};

/// typing_start の遷移結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingStart {
    /// idle → typing のエッジ（ブロードキャストとタイマー起動が必要）
    Started { epoch: u64 },
    /// 既に typing（ブロードキャストせず、タイマーのみ張り直す）
    Refreshed { epoch: u64 },
}

impl TypingStart {
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Started { epoch } | Self::Refreshed { epoch } => *epoch,
        }
    }
}

/// typing_stop / expire の遷移結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingStop {
    /// typing → idle のエッジ（stop をブロードキャストする）
    Stopped,
    /// 既に idle、または古いエポックの発火（no-op）
    Noop,
}

/// `(ユーザー, 宛先)` ごとのタイピング状態テーブル
#[derive(Default)]
pub struct TypingTable {
    states: HashMap<(UserId, Destination), u64>,
    next_epoch: u64,
}

impl TypingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// typing_start を適用し、新しいエポックを発行する
    pub fn start(&mut self, user: UserId, destination: Destination) -> TypingStart {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        match self.states.insert((user, destination), epoch) {
            None => TypingStart::Started { epoch },
            Some(_) => TypingStart::Refreshed { epoch },
        }
    }

    /// 明示的な typing_stop を適用する
    pub fn stop(&mut self, user: &UserId, destination: &Destination) -> TypingStop {
        match self.states.remove(&(*user, destination.clone())) {
            Some(_) => TypingStop::Stopped,
            None => TypingStop::Noop,
        }
    }

    /// 期限切れタイマーの発火を適用する
    ///
    /// タイマーが観測したエポックが現在のエポックと一致する場合のみ
    /// stop が成立する。デバウンスで張り直された後の古い発火は no-op。
    pub fn expire(&mut self, user: &UserId, destination: &Destination, epoch: u64) -> TypingStop {
        let key = (*user, destination.clone());
        match self.states.get(&key) {
            Some(current) if *current == epoch => {
                self.states.remove(&key);
                TypingStop::Stopped
            }
            _ => TypingStop::Noop,
        }
    }

    /// ユーザーの全タイピング状態を破棄し、stop が必要な宛先を返す
    ///
    /// 最後の接続が切断されたときの強制停止に使う。
    pub fn drain_user(&mut self, user: &UserId) -> Vec<Destination> {
        let destinations: Vec<Destination> = self
            .states
            .keys()
            .filter(|(u, _)| u == user)
            .map(|(_, d)| d.clone())
            .collect();
        for destination in &destinations {
            self.states.remove(&(*user, destination.clone()));
        }
        destinations
    }

    /// 現在 typing 状態にあるか
    pub fn is_typing(&self, user: &UserId, destination: &Destination) -> bool {
        self.states.contains_key(&(*user, destination.clone()))
    }
}
