//! 会话 ID
//!
//! 会话 ID 是调用方提供的不透明字符串，服务端据此复用同一个 Agent 执行器。
//! 这里只负责在未指定时生成一个随机值。

use uuid::Uuid;

/// 会话 ID 长度
pub const SESSION_ID_LEN: usize = 13;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 生成随机会话 ID（13 位小写 base36）
pub fn generate_session_id() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut id = String::with_capacity(SESSION_ID_LEN);
    for _ in 0..SESSION_ID_LEN {
        id.push(ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }
    id
}
