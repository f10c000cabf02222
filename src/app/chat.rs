//! 会话初始化
//!
//! 本地没有任何会话时生成一个默认会话。

use crate::app::types::{ChatConfig, ChatInterface, MessageInterface, Role, StoreState};
use tracing::info;
use uuid::Uuid;

/// 新会话的默认标题
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// 默认系统提示词
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are ChatGPT, a large language model trained by OpenAI.
Carefully heed the user's instructions.
Respond using Markdown.";

/// 生成一个默认会话（含系统提示词和默认模型参数）
pub fn generate_default_chat() -> ChatInterface {
    ChatInterface {
        id: Uuid::new_v4().to_string(),
        title: DEFAULT_CHAT_TITLE.to_string(),
        messages: vec![MessageInterface {
            role: Role::System,
            content: DEFAULT_SYSTEM_MESSAGE.to_string(),
            extra: serde_json::Map::new(),
        }],
        config: ChatConfig::default(),
        title_set: false,
        extra: serde_json::Map::new(),
    }
}

/// 用一个新会话替换会话列表并把当前下标指向它
pub fn initialise_new_chat(state: &mut StoreState) {
    let chat = generate_default_chat();
    info!("[Chat] 🆕 初始化新会话: id={}", chat.id);
    state.chats = Some(vec![chat]);
    state.current_chat_index = 0;
}
