//! セッションレジストリ
//!
//! ユーザーとライブ接続の双方向マッピングを一元管理するドメインサービス。
//! 1 ユーザーは 0 個以上の接続を同時に持てる（マルチデバイス）。
//!
//! ## 不変条件
//!
//! ユーザー ID のエントリは接続セットが空でないときに限り存在する。
//! 最後の接続が閉じたらエントリごと削除する（空のまま残さない）。
//! この不変条件がオンライン・オフライン判定の正しさを支える。
//!
//! ## 並行性
//!
//! この構造体自体はロックを持たない純粋な状態機械。呼び出し側は
//! `SharedSessionRegistry`（単一の `tokio::sync::Mutex`）越しに操作する
//! ことで register / deregister / query を線形化する。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::entity::UserIdentity;
use super::value_object::{ConnectionId, UserId};

/// レジストリ操作を線形化するための共有ハンドル
pub type SharedSessionRegistry = Arc<Mutex<SessionRegistry>>;

/// register の結果として観測されたプレゼンス遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterTransition {
    /// このユーザーの最初の接続（offline → online のエッジ）
    CameOnline,
    /// 既に他の接続が存在する（プレゼンスイベントは発火しない）
    AlreadyOnline,
}

/// deregister の結果として観測されたプレゼンス遷移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeregisterTransition {
    /// 最後の接続が閉じた（online → offline のエッジ）
    WentOffline,
    /// 他の接続が残っている（プレゼンスイベントは発火しない）
    StillOnline,
}

/// deregister の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deregistration {
    /// 接続を所有していたユーザー
    pub identity: UserIdentity,
    pub transition: DeregisterTransition,
}

struct UserSessions {
    identity: UserIdentity,
    connections: HashSet<ConnectionId>,
}

/// ユーザー ⇔ ライブ接続の双方向レジストリ
#[derive(Default)]
pub struct SessionRegistry {
    users: HashMap<UserId, UserSessions>,
    owners: HashMap<ConnectionId, UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// 接続をユーザーの接続セットに追加する
    ///
    /// このユーザーの最初の接続であれば `CameOnline` を返す。
    /// 表示名は最新の認証結果で上書きする。
    pub fn register(
        &mut self,
        identity: UserIdentity,
        connection_id: ConnectionId,
    ) -> RegisterTransition {
        let user_id = identity.id;
        self.owners.insert(connection_id, user_id);

        match self.users.get_mut(&user_id) {
            Some(sessions) => {
                sessions.identity = identity;
                sessions.connections.insert(connection_id);
                RegisterTransition::AlreadyOnline
            }
            None => {
                let mut connections = HashSet::new();
                connections.insert(connection_id);
                self.users.insert(
                    user_id,
                    UserSessions {
                        identity,
                        connections,
                    },
                );
                RegisterTransition::CameOnline
            }
        }
    }

    /// 接続を所有ユーザーのセットから取り除く
    ///
    /// セットが空になったらエントリごと削除し `WentOffline` を返す。
    /// 未登録の接続に対しては `None`（冪等）。
    pub fn deregister(&mut self, connection_id: &ConnectionId) -> Option<Deregistration> {
        let user_id = self.owners.remove(connection_id)?;
        let sessions = self.users.get_mut(&user_id)?;
        sessions.connections.remove(connection_id);

        if sessions.connections.is_empty() {
            let sessions = self.users.remove(&user_id)?;
            Some(Deregistration {
                identity: sessions.identity,
                transition: DeregisterTransition::WentOffline,
            })
        } else {
            Some(Deregistration {
                identity: sessions.identity.clone(),
                transition: DeregisterTransition::StillOnline,
            })
        }
    }

    /// ユーザーのライブ接続一覧（オフラインなら空）
    pub fn connections_of(&self, user: &UserId) -> Vec<ConnectionId> {
        self.users
            .get(user)
            .map(|s| s.connections.iter().copied().collect())
            .unwrap_or_default()
    }

    /// レジストリのキー存在チェック
    pub fn is_online(&self, user: &UserId) -> bool {
        self.users.contains_key(user)
    }

    /// 現在オンラインの全ユーザー
    pub fn online_users(&self) -> Vec<UserIdentity> {
        self.users.values().map(|s| s.identity.clone()).collect()
    }

    /// 全ライブ接続
    pub fn all_connections(&self) -> Vec<ConnectionId> {
        self.owners.keys().copied().collect()
    }

    /// 指定ユーザーの接続を除いた全ライブ接続（プレゼンス配信用）
    pub fn connections_except_user(&self, exclude: &UserId) -> Vec<ConnectionId> {
        self.owners
            .iter()
            .filter(|(_, owner)| *owner != exclude)
            .map(|(conn, _)| *conn)
            .collect()
    }

    /// メンバー集合をライブ接続に解決する（ファンアウト用）
    ///
    /// `exclude` を指定した場合、そのユーザーの接続は全て除外される。
    pub fn connections_for_users<'a>(
        &self,
        users: impl IntoIterator<Item = &'a UserId>,
        exclude: Option<&UserId>,
    ) -> Vec<ConnectionId> {
        let mut connections = Vec::new();
        for user in users {
            if exclude.is_some_and(|ex| ex == user) {
                continue;
            }
            if let Some(sessions) = self.users.get(user) {
                connections.extend(sessions.connections.iter().copied());
            }
        }
        connections
    }

    /// オンラインユーザー数（テスト・デバッグ用）
    pub fn online_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, name: &str) -> UserIdentity {
        UserIdentity::new(UserId::new(id), name.to_string())
    }

    #[test]
    fn test_first_connection_comes_online() {
        // テスト項目: 最初の接続で offline → online のエッジが観測される
        // given (前提条件):
        let mut registry = SessionRegistry::new();

        // when (操作):
        let transition = registry.register(identity(1, "alice"), ConnectionId::generate());

        // then (期待する結果):
        assert_eq!(transition, RegisterTransition::CameOnline);
        assert!(registry.is_online(&UserId::new(1)));
    }

    #[test]
    fn test_second_connection_does_not_signal_online() {
        // テスト項目: 2 本目の接続ではプレゼンス遷移が発生しない
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(identity(1, "alice"), ConnectionId::generate());

        // when (操作):
        let transition = registry.register(identity(1, "alice"), ConnectionId::generate());

        // then (期待する結果):
        assert_eq!(transition, RegisterTransition::AlreadyOnline);
        assert_eq!(registry.connections_of(&UserId::new(1)).len(), 2);
    }

    #[test]
    fn test_last_deregister_goes_offline_and_removes_entry() {
        // テスト項目: 最後の接続の切断でエントリが削除され offline になる
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        let conn = ConnectionId::generate();
        registry.register(identity(1, "alice"), conn);

        // when (操作):
        let result = registry.deregister(&conn).unwrap();

        // then (期待する結果):
        assert_eq!(result.transition, DeregisterTransition::WentOffline);
        assert_eq!(result.identity, identity(1, "alice"));
        assert!(!registry.is_online(&UserId::new(1)));
        assert!(registry.connections_of(&UserId::new(1)).is_empty());
    }

    #[test]
    fn test_deregister_with_remaining_connection_stays_online() {
        // テスト項目: 他の接続が残っている切断ではプレゼンス遷移が発生しない
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        let conn1 = ConnectionId::generate();
        let conn2 = ConnectionId::generate();
        registry.register(identity(1, "alice"), conn1);
        registry.register(identity(1, "alice"), conn2);

        // when (操作):
        let result = registry.deregister(&conn1).unwrap();

        // then (期待する結果):
        assert_eq!(result.transition, DeregisterTransition::StillOnline);
        assert!(registry.is_online(&UserId::new(1)));
        assert_eq!(registry.connections_of(&UserId::new(1)), vec![conn2]);
    }

    #[test]
    fn test_deregister_unknown_connection_is_noop() {
        // テスト項目: 未登録の接続の切断が no-op になる（冪等性）
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(identity(1, "alice"), ConnectionId::generate());

        // when (操作):
        let result = registry.deregister(&ConnectionId::generate());

        // then (期待する結果):
        assert!(result.is_none());
        assert!(registry.is_online(&UserId::new(1)));
    }

    #[test]
    fn test_registry_invariant_over_register_deregister_sequence() {
        // テスト項目: 任意の register / deregister 列でキー存在 ⇔ 接続セット非空
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        let conns: Vec<ConnectionId> = (0..4).map(|_| ConnectionId::generate()).collect();

        // when (操作): 2 ユーザーに 2 接続ずつ登録し、交互に切断する
        registry.register(identity(1, "alice"), conns[0]);
        registry.register(identity(2, "bob"), conns[1]);
        registry.register(identity(1, "alice"), conns[2]);
        registry.register(identity(2, "bob"), conns[3]);

        registry.deregister(&conns[0]);
        // then (期待する結果): 各ステップで不変条件が保たれている
        assert!(registry.is_online(&UserId::new(1)));
        registry.deregister(&conns[2]);
        assert!(!registry.is_online(&UserId::new(1)));
        assert!(registry.is_online(&UserId::new(2)));
        registry.deregister(&conns[1]);
        registry.deregister(&conns[3]);
        assert!(!registry.is_online(&UserId::new(2)));
        assert_eq!(registry.online_count(), 0);
        assert!(registry.all_connections().is_empty());
    }

    #[test]
    fn test_connections_for_users_resolves_and_excludes() {
        // テスト項目: メンバー集合の接続解決と除外ユーザーの扱い
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        let alice1 = ConnectionId::generate();
        let alice2 = ConnectionId::generate();
        let bob1 = ConnectionId::generate();
        registry.register(identity(1, "alice"), alice1);
        registry.register(identity(1, "alice"), alice2);
        registry.register(identity(2, "bob"), bob1);
        registry.register(identity(3, "charlie"), ConnectionId::generate());

        let members = [UserId::new(1), UserId::new(2), UserId::new(99)];

        // when (操作):
        let all = registry.connections_for_users(members.iter(), None);
        let without_alice =
            registry.connections_for_users(members.iter(), Some(&UserId::new(1)));

        // then (期待する結果): オフラインの 99 は無視され、除外指定が効く
        assert_eq!(all.len(), 3);
        assert!(all.contains(&alice1) && all.contains(&alice2) && all.contains(&bob1));
        assert_eq!(without_alice, vec![bob1]);
    }

    #[test]
    fn test_connections_except_user() {
        // テスト項目: 指定ユーザーの全接続を除いたライブ接続が返される
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        let alice1 = ConnectionId::generate();
        let alice2 = ConnectionId::generate();
        let bob1 = ConnectionId::generate();
        registry.register(identity(1, "alice"), alice1);
        registry.register(identity(1, "alice"), alice2);
        registry.register(identity(2, "bob"), bob1);

        // when (操作):
        let result = registry.connections_except_user(&UserId::new(1));

        // then (期待する結果):
        assert_eq!(result, vec![bob1]);
    }

    #[test]
    fn test_register_refreshes_display_name() {
        // テスト項目: 再認証時に表示名が最新の値で上書きされる
        // given (前提条件):
        let mut registry = SessionRegistry::new();
        registry.register(identity(1, "alice"), ConnectionId::generate());

        // when (操作):
        registry.register(identity(1, "alice-renamed"), ConnectionId::generate());

        // then (期待する結果):
        let online = registry.online_users();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].display_name, "alice-renamed");
    }
}
